//! Conversation state and request orchestration for Lumen.
//!
//! Keeps the ordered message history, runs the single in-flight request
//! against the reasoning backend (placeholders, retraction, outcome
//! classification) and turns decoded documents into summarize requests.

pub mod error;
pub mod events;
pub mod ingest;
pub mod notice;
pub mod session;
pub mod state;
pub mod store;

pub use error::ChatError;
pub use events::ChatEvent;
pub use ingest::{DocumentFile, IngestionAdapter};
pub use notice::{Notice, NoticeLevel};
pub use session::{ChatSession, PendingRequest, RequestKind, RequestOutcome};
pub use state::RequestState;
pub use store::Conversation;
