use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Preference store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Timeline mutation error.
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Chat session error surfaced to the user.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Internal protocol type error.
    #[error("Proto error: {0}")]
    Proto(#[from] ProtoError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Preference store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLx operation error.
    #[error("SQLx error: {0}")]
    Sqlx(String),

    /// Store could not be prepared (directories, schema).
    #[error("Setup error: {0}")]
    Setup(String),

    /// Background writer has already shut down.
    #[error("Store closed")]
    Closed,
}

/// Timeline mutation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// No message at the given index.
    #[error("No message at index {index} (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// Only assistant messages have mutable content.
    #[error("Message at index {0} is not an assistant message")]
    NotAssistant(usize),
}

/// User-facing session errors.
///
/// Every variant ends the current exchange; none is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Daily request cap for the active model is used up.
    #[error("Daily limit of {limit} requests reached for {model_id}")]
    QuotaExceeded { model_id: String, limit: u32 },

    /// Connectivity collaborator reported no network before sending.
    #[error("No network connection")]
    NetworkUnavailable,

    /// Transport-level failure while talking to the inference endpoint.
    #[error("Network error: {0}")]
    Transport(String),

    /// Response arrived but did not match the expected schema.
    #[error("Status code: {status}\nResponse body: {raw_body}\n{cause}")]
    ServerDecode {
        status: u16,
        raw_body: String,
        cause: String,
    },

    /// Endpoint answered without any reply content.
    #[error("The model returned an empty reply")]
    EmptyReply,
}

/// Internal proto errors
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Invalid role string value.
    #[error("Invalid role: {0}")]
    InvalidRole(String),
}
