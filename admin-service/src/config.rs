use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
    /// Origin allowed by CORS; `None` allows any origin.
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Price per unit of consumption used when a bill request names no rate.
    pub default_rate: Decimal,
    /// Days between the end of a billing period and the due date.
    pub due_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 3,
            retry_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    #[serde(default)]
    pub import: ImportConfig,
    pub metrics: Option<MetricsConfig>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub const MAX_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

impl AppConfig {
    /// Load from `$WATER_ADMIN_CONFIG` (default `water-admin.toml`).
    ///
    /// `WATER_ADMIN_JWT_SECRET`, when set, replaces `auth.jwt_secret`.
    pub fn load() -> Result<Self, ConfigError> {
        use std::env;

        let path = env::var("WATER_ADMIN_CONFIG").unwrap_or_else(|_| "water-admin.toml".to_string());
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut cfg = Self::from_toml(&contents)?;

        if let Ok(secret) = env::var("WATER_ADMIN_JWT_SECRET") {
            cfg.auth.jwt_secret = secret;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret is empty; set it or WATER_ADMIN_JWT_SECRET".to_string(),
            ));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_minutes must be positive".to_string()));
        }
        if self.auth.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_minutes must be at most {MAX_TOKEN_TTL_MINUTES} (one week)"
            )));
        }
        if self.billing.default_rate < Decimal::ZERO {
            return Err(ConfigError::Invalid("billing.default_rate must not be negative".to_string()));
        }
        if self.billing.due_days < 0 {
            return Err(ConfigError::Invalid("billing.due_days must not be negative".to_string()));
        }
        if self.import.batch_size == 0 {
            return Err(ConfigError::Invalid("import.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
