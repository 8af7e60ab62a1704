//! Error types for Pickup Assist.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Address lookup error: {0}")]
    Lookup(#[from] LookupError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store backend errors.
///
/// These never reach the end user: the fallback store absorbs them and
/// degrades to in-process storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session backend unreachable: {0}")]
    Unreachable(String),

    #[error("Session backend returned status {status}")]
    Backend { status: u16 },

    #[error("Failed to decode stored draft: {0}")]
    Decode(String),
}

/// Media classification errors.
///
/// `Timeout` stays separate from `Upstream` because the remedial user message
/// differs: a timeout usually means the upload was a heavy lossy preview and
/// the user should resend the original file.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Classification request timed out")]
    Timeout,

    #[error("Failed to fetch media {reference}: {reason}")]
    Fetch { reference: String, reason: String },

    #[error("Classification failed: {reason}")]
    Upstream { reason: String },
}

/// Postal lookup errors. `NotFound` is a user-correctable condition,
/// distinct from transport failures.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Postal code not found")]
    NotFound,

    #[error("Postal lookup timed out")]
    Timeout,

    #[error("Postal lookup failed: {reason}")]
    Upstream { reason: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
