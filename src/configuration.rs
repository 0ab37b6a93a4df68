use chrono::Months;

use crate::error::ConfigError;

/// Minimum length of the HMAC signing secret, in characters.
pub const MIN_SECRET_LENGTH: usize = 40;

/// Absolute lifetime of a refresh token record.
pub const REFRESH_TOKEN_LIFETIME: Months = Months::new(6);

const MAX_DATABASE_TIMEOUT_SECONDS: u64 = 30;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub storage: StorageBackend,
}

/// Where users and refresh token records live
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Pool acquire timeout, 1..=30 seconds
    #[serde(default)]
    pub timeout_seconds: u64,
    /// Log every SQL statement sqlx executes
    #[serde(default)]
    pub sensitive_data_logging: bool,
}

impl DatabaseSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 || self.timeout_seconds > MAX_DATABASE_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "database.timeout_seconds must be between 1 and {}",
                MAX_DATABASE_TIMEOUT_SECONDS
            )));
        }
        Ok(())
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64, // seconds (e.g., 3600 for 1 hour)
    /// Issuer claim; validated only when set
    #[serde(default)]
    pub issuer: Option<String>,
    /// Audience claim; validated only when set
    #[serde(default)]
    pub audience: Option<String>,
}

impl JwtSettings {
    /// Reject settings that must never reach a running server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        if self.application.storage == StorageBackend::Postgres {
            self.database.validate()?;
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Load settings from `configuration.*` and `APP__*` environment variables.
///
/// Fails if the result does not pass [`Settings::validate`].
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}
