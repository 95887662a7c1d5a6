use std::{future::IntoFuture, process};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vitrina::{
    application::error::AppError,
    config,
    infra::{bootstrap, error::InfraError, sweeper::UploadSweeper, telemetry},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Sweep(_) => run_sweep(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = bootstrap::assemble(&settings)?;

    let report = app.cache.warmup().await;
    if !report.is_clean() {
        warn!(
            target = "vitrina::serve",
            failed = report.failed.len(),
            "some collections failed to warm up"
        );
    }

    let sweeper_handle = app.sweeper.clone().spawn(settings.sweeper.interval);

    let result = serve_http(&settings, app.router()).await;

    sweeper_handle.abort();
    let _ = sweeper_handle.await;

    result
}

async fn run_sweep(settings: config::Settings) -> Result<(), AppError> {
    let sweeper = UploadSweeper::new(settings.uploads.hero_dir.clone());
    let report = sweeper
        .sweep()
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "vitrina::sweep",
        dir = %sweeper.dir().display(),
        removed = ?report.removed,
        kept = report.kept.as_deref().unwrap_or(""),
        "sweep completed"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vitrina::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown_signal().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target = "vitrina::serve",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
        }
    }

    info!(target = "vitrina::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "vitrina::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
