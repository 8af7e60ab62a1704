//! Configuration types, loaded from the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// How classification results are offered to the user.
///
/// The two designs are mutually exclusive and chosen once at startup,
/// never by inspecting state at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyPolicy {
    /// Take the top-1 candidate and ask for a yes/no confirmation.
    AutoAccept,
    /// Offer the top-3 ranked candidates for a manual pick.
    Manual,
}

impl std::str::FromStr for ClassifyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "auto_accept" => Ok(Self::AutoAccept),
            "manual" | "topk" => Ok(Self::Manual),
            other => Err(ConfigError::InvalidValue {
                key: "PICKUP_CLASSIFY_POLICY".to_string(),
                message: format!("unknown policy {other:?} (expected auto or manual)"),
            }),
        }
    }
}

/// Bot configuration.
#[derive(Debug)]
pub struct BotConfig {
    /// Webhook listen port.
    pub port: u16,
    /// Classification endpoint URL.
    pub classify_url: String,
    /// Optional API key sent as `x-api-key`.
    pub classify_api_key: Option<SecretString>,
    /// Top-1 confirm vs top-3 manual pick.
    pub classify_policy: ClassifyPolicy,
    /// Base URL the transport serves uploaded media from.
    pub media_base_url: String,
    /// Postal lookup provider base URL.
    pub lookup_url: String,
    /// Remote session backend base URL; absent means in-process only.
    pub store_url: Option<String>,
    /// Bearer token for the session backend.
    pub store_token: Option<SecretString>,
    /// Draft expiry window.
    pub session_ttl: Duration,
    /// Size of the selectable day window.
    pub days_ahead: usize,
    /// Upper bound for the item quantity.
    pub max_qty: u32,
    /// Timeout applied to every external HTTP call.
    pub http_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from `PICKUP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parsed_var("PICKUP_PORT", 8080)?,
            classify_url: required_var("PICKUP_CLASSIFY_URL")?,
            classify_api_key: std::env::var("PICKUP_CLASSIFY_API_KEY")
                .ok()
                .map(SecretString::from),
            classify_policy: std::env::var("PICKUP_CLASSIFY_POLICY")
                .unwrap_or_else(|_| "auto".to_string())
                .parse()?,
            media_base_url: required_var("PICKUP_MEDIA_BASE_URL")?,
            lookup_url: std::env::var("PICKUP_LOOKUP_URL")
                .unwrap_or_else(|_| "https://viacep.com.br/ws".to_string()),
            store_url: std::env::var("PICKUP_STORE_URL").ok(),
            store_token: std::env::var("PICKUP_STORE_TOKEN")
                .ok()
                .map(SecretString::from),
            session_ttl: Duration::from_secs(parsed_var("PICKUP_SESSION_TTL_SECS", 1800)?),
            days_ahead: parsed_var("PICKUP_DAYS_AHEAD", 7)?,
            max_qty: parsed_var("PICKUP_MAX_QTY", 999)?,
            http_timeout: Duration::from_secs(parsed_var("PICKUP_HTTP_TIMEOUT_SECS", 8)?),
        })
    }
}

fn required_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
    }
}
