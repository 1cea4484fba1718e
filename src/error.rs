use thiserror::Error;

/// Input rejected locally, before anything reaches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Please enter a valid amount")]
    InvalidAmount(String),
    #[error("Driver code must not be empty")]
    EmptyDriverCode,
    #[error("Please scan a QR code or enter driver ID")]
    MissingDriverCode,
}

/// Failures reported by the transaction API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Any 401-class response.
    #[error("Session expired. Please login again.")]
    AuthExpired,
    /// Explicit business-level refusal from the backend.
    #[error("Request rejected ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },
    /// Network failure, timeout, or an unreadable response body.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Transport(value.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StoreError {
    fn from(value: rocksdb::Error) -> Self {
        StoreError::Backend(value.to_string())
    }
}

/// Everything the `qtap` binary can fail with.
#[derive(Error, Debug)]
pub enum QtapError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QtapError>;
