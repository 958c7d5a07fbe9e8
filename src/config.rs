use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration, layered from `config/default.toml`,
/// `config/{RUN_MODE}.toml`, then `APP__`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub auto_migrate: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Simulated payment gateway knobs. Probability 1.0 or 0.0 makes the
    /// outcome deterministic, which the test suite relies on.
    #[serde(default = "default_payment_delay_ms")]
    pub payment_delay_ms: u64,
    #[serde(default = "default_payment_success_rate")]
    pub payment_success_rate: f64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://storefront.db?mode=rwc".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_jwt_secret() -> String {
    "development-secret-change-me".to_string()
}

fn default_jwt_issuer() -> String {
    "storefront-api".to_string()
}

fn default_jwt_audience() -> String {
    "storefront-clients".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_payment_delay_ms() -> u64 {
    2000
}

fn default_payment_success_rate() -> f64 {
    0.9
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_db_min_connections() -> u32 {
    2
}

fn default_db_connect_timeout_secs() -> u64 {
    10
}

fn default_db_idle_timeout_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            environment: default_environment(),
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_jwt_issuer(),
            jwt_audience: default_jwt_audience(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            request_timeout_secs: default_request_timeout_secs(),
            cors_allowed_origins: Vec::new(),
            payment_delay_ms: default_payment_delay_ms(),
            payment_success_rate: default_payment_success_rate(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(AppConfigError::ValidationError(
                "database_url must not be empty".into(),
            ));
        }
        if self.jwt_secret.trim().is_empty() {
            return Err(AppConfigError::ValidationError(
                "jwt_secret must not be empty".into(),
            ));
        }
        if self.is_production() && self.jwt_secret == default_jwt_secret() {
            return Err(AppConfigError::ValidationError(
                "jwt_secret must be overridden in production".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.payment_success_rate) {
            return Err(AppConfigError::ValidationError(format!(
                "payment_success_rate must be within 0.0..=1.0, got {}",
                self.payment_success_rate
            )));
        }
        if self.db_min_connections > self.db_max_connections {
            return Err(AppConfigError::ValidationError(
                "db_min_connections must not exceed db_max_connections".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppConfigError::ValidationError(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Install the global tracing subscriber. Safe to call once per process;
/// tests that build their own harness skip this.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
