use thiserror::Error;

/// Top-level error type for Lumen.
///
/// Subsystem crates define their own error types for their own failure
/// modes; this one covers the concerns shared by every crate (configuration,
/// I/O and serialization).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LumenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        LumenError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LumenError {
    fn from(err: toml::ser::Error) -> Self {
        LumenError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Lumen operations.
pub type Result<T> = std::result::Result<T, LumenError>;
