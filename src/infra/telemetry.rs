use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vitrina_store_read_total",
            Unit::Count,
            "Total number of JSON document reads from disk."
        );
        describe_counter!(
            "vitrina_store_write_total",
            Unit::Count,
            "Total number of JSON document writes to disk."
        );
        describe_counter!(
            "vitrina_cache_hit_total",
            Unit::Count,
            "Total number of collection reads served from memory."
        );
        describe_counter!(
            "vitrina_cache_load_total",
            Unit::Count,
            "Total number of collection reads that had to load from disk."
        );
        describe_histogram!(
            "vitrina_cache_warm_ms",
            Unit::Milliseconds,
            "Content cache warmup latency in milliseconds."
        );
        describe_counter!(
            "vitrina_uploads_swept_total",
            Unit::Count,
            "Total number of stale hero uploads removed by the sweeper."
        );
    });
}
