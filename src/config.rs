//! Runtime configuration read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_HOST: &str = "avocarbon-com.mail.protection.outlook.com";
const DEFAULT_SMTP_PORT: u16 = 25;
const DEFAULT_FROM_NAME: &str = "Administration STS";
const DEFAULT_FROM_ADDRESS: &str = "administration.STS@avocarbon.com";
const DEFAULT_SUPPORT_EMAIL: &str = "chaima.benyahia@avocarbon.com";
const DEFAULT_LOGO_FILE: &str = "logo_avocarbon.jpg";
const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;
const DEFAULT_IMAGE_MAX_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Service configuration. Every field has a default so the binary starts
/// with an empty environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_name: String,
    pub from_address: String,
    pub support_email: String,
    pub assets_dir: PathBuf,
    pub offer_logo_file: String,
    pub staging_dir: PathBuf,
    pub staging_ttl: Duration,
    pub staging_sweep_interval: Duration,
    pub body_limit: usize,
    pub image_fetch_timeout: Duration,
    pub image_max_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_name: DEFAULT_FROM_NAME.to_string(),
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            assets_dir: PathBuf::from("assets"),
            offer_logo_file: DEFAULT_LOGO_FILE.to_string(),
            staging_dir: env::temp_dir().join("report-mail-server"),
            staging_ttl: Duration::from_secs(60 * 60),
            staging_sweep_interval: Duration::from_secs(10 * 60),
            body_limit: DEFAULT_BODY_LIMIT,
            image_fetch_timeout: Duration::from_secs(15),
            image_max_bytes: DEFAULT_IMAGE_MAX_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            host: env_string("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            smtp_host: env_string("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: env_parse("SMTP_PORT")?.unwrap_or(defaults.smtp_port),
            from_name: env_string("EMAIL_FROM_NAME").unwrap_or(defaults.from_name),
            from_address: env_string("EMAIL_FROM").unwrap_or(defaults.from_address),
            support_email: env_string("SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            assets_dir: env_string("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            offer_logo_file: env_string("OFFER_LOGO_FILE").unwrap_or(defaults.offer_logo_file),
            staging_dir: env_string("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            staging_ttl: env_parse("STAGING_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.staging_ttl),
            staging_sweep_interval: env_parse("STAGING_SWEEP_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.staging_sweep_interval),
            body_limit: env_parse("BODY_LIMIT_BYTES")?.unwrap_or(defaults.body_limit),
            image_fetch_timeout: env_parse("IMAGE_FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.image_fetch_timeout),
            image_max_bytes: env_parse("IMAGE_MAX_BYTES")?.unwrap_or(defaults.image_max_bytes),
        })
    }

    /// Full path of the letterhead logo.
    pub fn offer_logo_path(&self) -> PathBuf {
        self.assets_dir.join(&self.offer_logo_file)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}
