//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU64, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vitrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SITE_CONFIG_FILE: &str = "config.json";
const GALLERY_FILE: &str = "gallery.json";
const MATERIALS_FILE: &str = "materials.json";
const DEFAULT_PUBLIC_DIR: &str = "public";
const DEFAULT_GALLERY_DIR: &str = "public/uploads";
const DEFAULT_HERO_DIR: &str = "uploads2";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_LOGIN_FAILURE_DELAY_MS: u64 = 1500;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_COOKIE_NAME: &str = "vitrina_session";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_NOTIFY_API_BASE: &str = "https://api.telegram.org";

/// Command-line arguments for the Vitrina binary.
#[derive(Debug, Parser)]
#[command(name = "vitrina", version, about = "Vitrina site content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VITRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Prune the hero upload directory once and exit.
    Sweep(SweepArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SweepArgs {
    /// Override the hero upload directory.
    #[arg(long = "uploads-hero-dir", value_name = "PATH")]
    pub hero_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the directory holding gallery.json and materials.json.
    #[arg(long = "storage-data-dir", value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Override the site config JSON file.
    #[arg(long = "storage-config-file", value_name = "PATH")]
    pub site_config_file: Option<PathBuf>,

    /// Override the static public directory.
    #[arg(long = "uploads-public-dir", value_name = "PATH")]
    pub public_dir: Option<PathBuf>,

    /// Override the gallery and material image directory.
    #[arg(long = "uploads-gallery-dir", value_name = "PATH")]
    pub gallery_dir: Option<PathBuf>,

    /// Override the hero image directory.
    #[arg(long = "uploads-hero-dir", value_name = "PATH")]
    pub hero_dir: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the hero directory sweep interval.
    #[arg(long = "sweeper-interval-seconds", value_name = "SECONDS")]
    pub sweeper_interval_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub uploads: UploadSettings,
    pub auth: AuthSettings,
    pub sweeper: SweeperSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
}

impl StorageSettings {
    pub fn gallery_file(&self) -> PathBuf {
        self.data_dir.join(GALLERY_FILE)
    }

    pub fn materials_file(&self) -> PathBuf {
        self.data_dir.join(MATERIALS_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub public_dir: PathBuf,
    pub gallery_dir: PathBuf,
    pub hero_dir: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub default_password: String,
    pub confirmation_key: Option<String>,
    pub login_failure_delay: Duration,
    pub session_ttl: Duration,
    pub cookie_name: String,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("default_password", &"<redacted>")
            .field(
                "confirmation_key",
                &self.confirmation_key.as_ref().map(|_| "<redacted>"),
            )
            .field("login_failure_delay", &self.login_failure_delay)
            .field("session_ttl", &self.session_ttl)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SweeperSettings {
    pub interval: Duration,
}

#[derive(Clone)]
pub struct NotifySettings {
    pub api_base: Url,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl std::fmt::Debug for NotifySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySettings")
            .field("api_base", &self.api_base.as_str())
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VITRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Sweep(args)) => raw.apply_sweep_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    storage: RawStorageSettings,
    uploads: RawUploadSettings,
    auth: RawAuthSettings,
    sweeper: RawSweeperSettings,
    notify: RawNotifySettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(dir) = overrides.data_dir.as_ref() {
            self.storage.data_dir = Some(dir.clone());
        }
        if let Some(file) = overrides.site_config_file.as_ref() {
            self.storage.config_file = Some(file.clone());
        }
        if let Some(dir) = overrides.public_dir.as_ref() {
            self.uploads.public_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.gallery_dir.as_ref() {
            self.uploads.gallery_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.hero_dir.as_ref() {
            self.uploads.hero_dir = Some(dir.clone());
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
        if let Some(interval) = overrides.sweeper_interval_seconds {
            self.sweeper.interval_seconds = Some(interval);
        }
    }

    fn apply_sweep_overrides(&mut self, overrides: &SweepArgs) {
        if let Some(dir) = overrides.hero_dir.as_ref() {
            self.uploads.hero_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            storage,
            uploads,
            auth,
            sweeper,
            notify,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            storage: build_storage_settings(storage)?,
            uploads: build_upload_settings(uploads)?,
            auth: build_auth_settings(auth)?,
            sweeper: build_sweeper_settings(sweeper)?,
            notify: build_notify_settings(notify)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let data_dir = non_empty_path(storage.data_dir, DEFAULT_DATA_DIR, "storage.data_dir")?;
    let config_file = non_empty_path(
        storage.config_file,
        DEFAULT_SITE_CONFIG_FILE,
        "storage.config_file",
    )?;
    Ok(StorageSettings {
        data_dir,
        config_file,
    })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let public_dir = non_empty_path(uploads.public_dir, DEFAULT_PUBLIC_DIR, "uploads.public_dir")?;
    let gallery_dir = non_empty_path(
        uploads.gallery_dir,
        DEFAULT_GALLERY_DIR,
        "uploads.gallery_dir",
    )?;
    let hero_dir = non_empty_path(uploads.hero_dir, DEFAULT_HERO_DIR, "uploads.hero_dir")?;

    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings {
        public_dir,
        gallery_dir,
        hero_dir,
        max_request_bytes,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let default_password = auth
        .default_password
        .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
    if default_password.is_empty() {
        return Err(LoadError::invalid(
            "auth.default_password",
            "must not be empty",
        ));
    }

    let confirmation_key = auth.confirmation_key.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let session_ttl_secs = auth.session_ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS);
    if session_ttl_secs == 0 {
        return Err(LoadError::invalid(
            "auth.session_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let cookie_name = auth
        .cookie_name
        .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
    if cookie_name.is_empty()
        || !cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LoadError::invalid(
            "auth.cookie_name",
            "must be a non-empty token of letters, digits, `_` or `-`",
        ));
    }

    Ok(AuthSettings {
        default_password,
        confirmation_key,
        login_failure_delay: Duration::from_millis(
            auth.login_failure_delay_ms
                .unwrap_or(DEFAULT_LOGIN_FAILURE_DELAY_MS),
        ),
        session_ttl: Duration::from_secs(session_ttl_secs),
        cookie_name,
    })
}

fn build_sweeper_settings(sweeper: RawSweeperSettings) -> Result<SweeperSettings, LoadError> {
    let interval_seconds = sweeper
        .interval_seconds
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
    if interval_seconds == 0 {
        return Err(LoadError::invalid(
            "sweeper.interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SweeperSettings {
        interval: Duration::from_secs(interval_seconds),
    })
}

fn build_notify_settings(notify: RawNotifySettings) -> Result<NotifySettings, LoadError> {
    let raw_base = notify
        .api_base
        .unwrap_or_else(|| DEFAULT_NOTIFY_API_BASE.to_string());
    let api_base = Url::parse(raw_base.trim())
        .map_err(|err| LoadError::invalid("notify.api_base", format!("invalid url: {err}")))?;
    if !matches!(api_base.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "notify.api_base",
            "scheme must be http or https",
        ));
    }

    Ok(NotifySettings {
        api_base,
        bot_token: non_empty(notify.bot_token),
        chat_id: non_empty(notify.chat_id),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    data_dir: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    public_dir: Option<PathBuf>,
    gallery_dir: Option<PathBuf>,
    hero_dir: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    default_password: Option<String>,
    confirmation_key: Option<String>,
    login_failure_delay_ms: Option<u64>,
    session_ttl_seconds: Option<u64>,
    cookie_name: Option<String>,
}

impl std::fmt::Debug for RawAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAuthSettings")
            .field("login_failure_delay_ms", &self.login_failure_delay_ms)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSweeperSettings {
    interval_seconds: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotifySettings {
    api_base: Option<String>,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl std::fmt::Debug for RawNotifySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawNotifySettings")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
