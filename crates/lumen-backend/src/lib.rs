//! Reasoning backend contract for Lumen.
//!
//! The backend answers questions about a conversation and summarizes
//! documents. This crate defines the async trait the chat session talks to,
//! the failure classification every implementation reports, an HTTP client,
//! and a scriptable mock.

pub mod error;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use lumen_core::Message;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;
pub use mock::MockBackend;

/// Remote service that answers questions and produces summaries.
///
/// Both operations are single request/response calls. Implementations own
/// any timeout; callers never cancel a call once it has been issued.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Answer the latest user message given the ordered history.
    async fn ask(&self, history: &[Message]) -> Result<String, BackendError>;

    /// Summarize a plain-text document.
    async fn summarize(&self, document: &str) -> Result<String, BackendError>;
}
