use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8000;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_NAME: &str = "Storefront";
const DEFAULT_STOREFRONT_URL: &str = "http://localhost:3000";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 120;
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Outgoing mail (Gmail SMTP by default)
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Gmail account used to authenticate and as the envelope sender
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// Gmail app password
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Display name in the From header
    #[serde(default = "default_store_name")]
    pub from_name: String,
    /// Recipient of "New Order Received" notifications
    #[serde(default)]
    pub admin_address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_name: default_store_name(),
            admin_address: None,
        }
    }
}

impl MailConfig {
    /// SMTP delivery is only attempted when credentials are present
    pub fn smtp_enabled(&self) -> bool {
        matches!(
            (&self.smtp_username, &self.smtp_password),
            (Some(user), Some(pass)) if !user.trim().is_empty() && !pass.trim().is_empty()
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudinaryConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_cloudinary_base_url")]
    pub base_url: String,
    #[serde(default = "default_cloudinary_folder")]
    pub folder: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_cloudinary_base_url(),
            folder: default_cloudinary_folder(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SslCommerzConfig {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub store_password: String,
    #[serde(default)]
    pub is_live: bool,
    /// Overrides the sandbox/live host, mostly for tests
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub fail_url: String,
    #[serde(default)]
    pub cancel_url: String,
    #[serde(default)]
    pub ipn_url: String,
}

impl SslCommerzConfig {
    pub fn gateway_base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ if self.is_live => "https://securepay.sslcommerz.com".to_string(),
            _ => "https://sandbox.sslcommerz.com".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayStationConfig {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default = "default_paystation_base_url")]
    pub base_url: String,
    #[serde(default = "default_paystation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PayStationConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            base_url: default_paystation_base_url(),
            timeout_secs: default_paystation_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FraudCheckConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_fraud_check_base_url")]
    pub base_url: String,
}

impl Default for FraudCheckConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_fraud_check_base_url(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// HS256 secret shared with the user service that issues tokens
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Per-request timeout applied by the HTTP stack
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Interval of the background `SELECT 1` ping, 0 = disabled
    #[serde(default = "default_db_keep_alive_secs")]
    pub db_keep_alive_secs: u64,

    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub default_page: u64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub default_limit: u64,

    /// Shown in mail subjects and PDF headers
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Public shop URL used for product links and checkout redirects
    #[serde(default = "default_storefront_url")]
    #[validate(url)]
    pub storefront_url: String,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub cloudinary: CloudinaryConfig,

    #[serde(default)]
    pub sslcommerz: SslCommerzConfig,

    #[serde(default)]
    pub paystation: PayStationConfig,

    #[serde(default)]
    pub fraud_check: FraudCheckConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every optional section
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            request_timeout_secs: default_request_timeout_secs(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_keep_alive_secs: default_db_keep_alive_secs(),
            default_page: default_page(),
            default_limit: default_limit(),
            store_name: default_store_name(),
            storefront_url: default_storefront_url(),
            mail: MailConfig::default(),
            cloudinary: CloudinaryConfig::default(),
            sslcommerz: SslCommerzConfig::default(),
            paystation: PayStationConfig::default(),
            fraud_check: FraudCheckConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn keep_alive_interval(&self) -> Option<Duration> {
        (self.db_keep_alive_secs > 0).then(|| Duration::from_secs(self.db_keep_alive_secs))
    }

    /// Storefront URL without a trailing slash
    pub fn storefront_base(&self) -> &str {
        self.storefront_url.trim_end_matches('/')
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to the secret of the user service."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_pool_bounds");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_db_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}
fn default_storefront_url() -> String {
    DEFAULT_STOREFRONT_URL.to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    465
}

fn default_cloudinary_base_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}
fn default_cloudinary_folder() -> String {
    "product".to_string()
}

fn default_paystation_base_url() -> String {
    "https://api.paystation.com.bd".to_string()
}
fn default_paystation_timeout_secs() -> u64 {
    15
}

fn default_fraud_check_base_url() -> String {
    "https://fraudchecker.link/api/v1/qc".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    const DISALLOWED: [&str; 3] = ["your-secret-key", "default-secret-key", "changeme"];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] but reading TOML files from `dir`
pub fn load_config_from(dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.clone())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?;

    // Only development gets a bundled secret; elsewhere it must come from the environment
    if run_env.eq_ignore_ascii_case(DEFAULT_ENV) {
        builder = builder.set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;
    }

    let config = builder
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to the secret used by the user service.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_requires_both_credentials() {
        let mut mail = MailConfig::default();
        assert!(!mail.smtp_enabled());
        mail.smtp_username = Some("shop@gmail.com".into());
        assert!(!mail.smtp_enabled());
        mail.smtp_password = Some("app-password".into());
        assert!(mail.smtp_enabled());
    }

    #[test]
    fn sslcommerz_base_url_follows_mode() {
        let mut cfg = SslCommerzConfig::default();
        assert_eq!(cfg.gateway_base_url(), "https://sandbox.sslcommerz.com");
        cfg.is_live = true;
        assert_eq!(cfg.gateway_base_url(), "https://securepay.sslcommerz.com");
        cfg.base_url = Some("http://127.0.0.1:9999/".into());
        assert_eq!(cfg.gateway_base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn keep_alive_can_be_disabled() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            DEV_DEFAULT_JWT_SECRET.into(),
            "127.0.0.1".into(),
            8000,
            "development".into(),
        );
        assert_eq!(cfg.keep_alive_interval(), Some(Duration::from_secs(120)));
        cfg.db_keep_alive_secs = 0;
        assert_eq!(cfg.keep_alive_interval(), None);
    }

    #[test]
    fn config_files_are_layered() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
                database_url = "sqlite::memory:"
                store_name = "Tea House"
                storefront_url = "https://tea.example.com/"

                [mail]
                admin_address = "owner@tea.example.com"

                [paystation]
                merchant_id = "M-1"
            "#,
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.store_name, "Tea House");
        assert_eq!(cfg.storefront_base(), "https://tea.example.com");
        assert_eq!(cfg.mail.admin_address.as_deref(), Some("owner@tea.example.com"));
        assert_eq!(cfg.paystation.merchant_id, "M-1");
        assert_eq!(cfg.paystation.timeout_secs, 15);
        assert_eq!(cfg.port, 8000);
    }
}
