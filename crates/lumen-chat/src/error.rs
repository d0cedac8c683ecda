//! Error types for the conversation layer.

use crate::state::RequestState;

/// Errors from the chat session and the ingestion adapter.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("conversation is empty")]
    EmptyConversation,
    #[error("a request is already in progress ({state})")]
    Busy { state: RequestState },
    #[error("unsupported file type: {0}. Only plain text files are supported.")]
    UnsupportedMediaType(String),
    #[error("{0} is not valid UTF-8 text")]
    InvalidEncoding(String),
    #[error("document is {size} bytes, the limit is {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: RequestState, to: RequestState },
    #[error("session state poisoned: {0}")]
    StatePoisoned(String),
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
    #[error("request task failed: {0}")]
    TaskFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
