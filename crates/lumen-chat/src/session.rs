//! Chat session: the request orchestrator.
//!
//! A `ChatSession` owns one conversation, its request state and the composer
//! draft. Submitting a question or a document applies every visible change
//! (user entry, placeholder, state) before the backend call is spawned, then
//! returns a [`PendingRequest`] for the call. When the call settles the
//! placeholder is replaced or retracted and the session returns to idle,
//! whatever the outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use lumen_backend::{BackendError, ReasoningBackend};
use lumen_core::config::ChatConfig;
use lumen_core::Message;

use crate::error::ChatError;
use crate::events::{ChatEvent, EVENT_CHANNEL_CAPACITY};
use crate::notice::Notice;
use crate::state::RequestState;
use crate::store::Conversation;

/// Placeholder shown while a question is being answered.
pub const THINKING_PLACEHOLDER: &str = "Thinking ...";
/// Placeholder shown while a document is being summarized.
pub const SUMMARIZING_PLACEHOLDER: &str = "Summarizing document...";
/// Prefix of the user entry recorded for an upload.
pub const UPLOAD_PREFIX: &str = "Uploaded file: ";
/// Prefix of the entry that replaces a failed summary.
pub const SUMMARY_FAILED_PREFIX: &str = "Summarization failed: ";

/// Which backend operation a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Ask,
    Summarize,
}

impl RequestKind {
    fn awaiting_state(self) -> RequestState {
        match self {
            RequestKind::Ask => RequestState::AwaitingAsk,
            RequestKind::Summarize => RequestState::AwaitingSummarize,
        }
    }
}

/// How a request settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The answer replaced the "Thinking" placeholder.
    Answered(String),
    /// The summary replaced the "Summarizing" placeholder.
    Summarized(String),
    /// The call failed; the notice was also broadcast.
    Failed(Notice),
}

/// Handle to a backend call in flight.
///
/// Dropping it does not cancel the call; the session still settles.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: Uuid,
    pub kind: RequestKind,
    handle: JoinHandle<RequestOutcome>,
}

impl PendingRequest {
    /// Wait for the call to settle.
    pub async fn wait(self) -> Result<RequestOutcome, ChatError> {
        self.handle
            .await
            .map_err(|e| ChatError::TaskFailed(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

enum Work {
    Ask { history: Vec<Message> },
    Summarize { document: String },
}

#[derive(Debug)]
struct SessionState {
    conversation: Conversation,
    request: RequestState,
    draft: String,
    in_flight: Option<Uuid>,
}

/// State shared between the session handle and its request tasks.
struct Shared {
    state: Mutex<SessionState>,
    events: broadcast::Sender<ChatEvent>,
}

/// One conversation with the reasoning backend.
///
/// Cheap to clone; clones share the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    shared: Arc<Shared>,
    backend: Arc<dyn ReasoningBackend>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &self.state())
            .field("len", &self.len())
            .finish()
    }
}

impl ChatSession {
    /// Start a session whose conversation holds only `greeting`.
    pub fn new(greeting: impl Into<String>, backend: Arc<dyn ReasoningBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    conversation: Conversation::new(greeting),
                    request: RequestState::Idle,
                    draft: String::new(),
                    in_flight: None,
                }),
                events,
            }),
            backend,
        }
    }

    pub fn from_config(config: &ChatConfig, backend: Arc<dyn ReasoningBackend>) -> Self {
        Self::new(config.greeting.clone(), backend)
    }

    /// Receive every change made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events.subscribe()
    }

    // -- Readers --

    pub fn messages(&self) -> Vec<Message> {
        self.shared.guard().conversation.messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.shared.guard().conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.guard().conversation.is_empty()
    }

    pub fn state(&self) -> RequestState {
        self.shared.guard().request
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// History a question would be sent with, minus the question itself.
    pub fn snapshot_for_backend(&self) -> Vec<Message> {
        self.shared.guard().conversation.snapshot_for_backend(None)
    }

    // -- Composer draft --

    pub fn draft(&self) -> String {
        self.shared.guard().draft.clone()
    }

    /// Edit the composer text. Allowed while a request is in flight.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.shared.guard().draft = text.into();
    }

    /// Submit the current draft as a question.
    pub fn submit_draft(&self) -> Result<Option<PendingRequest>, ChatError> {
        let draft = self.draft();
        self.submit_question(&draft)
    }

    // -- Requests --

    /// Ask the backend a question about the conversation.
    ///
    /// Blank text is ignored (`Ok(None)`). While another request is in flight
    /// the call is refused with [`ChatError::Busy`] and nothing changes.
    /// Otherwise the question and a "Thinking" placeholder are appended, the
    /// draft is cleared and the call is spawned. Must be called from within a
    /// Tokio runtime.
    pub fn submit_question(&self, text: &str) -> Result<Option<PendingRequest>, ChatError> {
        if text.trim().is_empty() {
            debug!("Ignoring empty question");
            return Ok(None);
        }
        let runtime = current_runtime()?;

        let mut state = self.shared.lock()?;
        if state.request.is_busy() {
            debug!(state = %state.request, "Question refused while a request is in flight");
            return Err(ChatError::Busy {
                state: state.request,
            });
        }

        let question = Message::user(text);
        let history = state.conversation.snapshot_for_backend(Some(&question));
        let id = self
            .shared
            .begin(&mut state, RequestKind::Ask, question, THINKING_PLACEHOLDER)?;
        state.draft.clear();
        drop(state);

        info!(request_id = %id, history_len = history.len(), "Question submitted");
        Ok(Some(self.dispatch(&runtime, id, RequestKind::Ask, Work::Ask { history })))
    }

    /// Summarize a decoded document.
    ///
    /// Only the document text is sent; the conversation history is not.
    /// While another request is in flight the upload is refused with
    /// [`ChatError::Busy`] and a warning notice is broadcast. Must be called
    /// from within a Tokio runtime.
    pub fn submit_document(
        &self,
        decoded_text: impl Into<String>,
        display_name: &str,
    ) -> Result<PendingRequest, ChatError> {
        let runtime = current_runtime()?;

        let mut state = self.shared.lock()?;
        if state.request.is_busy() {
            let err = ChatError::Busy {
                state: state.request,
            };
            warn!(file = %display_name, state = %state.request, "Upload refused while a request is in flight");
            self.shared.emit(ChatEvent::Notice {
                notice: Notice::warning(format!(
                    "Please wait for the current request to finish before uploading {}.",
                    display_name
                )),
            });
            return Err(err);
        }

        let entry = Message::user(format!("{}{}", UPLOAD_PREFIX, display_name));
        let id = self.shared.begin(
            &mut state,
            RequestKind::Summarize,
            entry,
            SUMMARIZING_PLACEHOLDER,
        )?;
        drop(state);

        let document = decoded_text.into();
        info!(request_id = %id, file = %display_name, bytes = document.len(), "Document submitted");
        Ok(self.dispatch(
            &runtime,
            id,
            RequestKind::Summarize,
            Work::Summarize { document },
        ))
    }

    /// Broadcast a notice to observers.
    pub fn notify(&self, notice: Notice) {
        debug!(level = ?notice.level, message = %notice.message, "Notice");
        self.shared.emit(ChatEvent::Notice { notice });
    }

    fn dispatch(&self, runtime: &Handle, id: Uuid, kind: RequestKind, work: Work) -> PendingRequest {
        let shared = Arc::clone(&self.shared);
        let backend = Arc::clone(&self.backend);

        let handle = runtime.spawn(async move {
            let guard = SettleGuard::new(Arc::clone(&shared), id, kind);
            let outcome = match work {
                Work::Ask { history } => {
                    let result = backend.ask(&history).await;
                    shared.settle(id, RequestKind::Ask, result)
                }
                Work::Summarize { document } => {
                    let result = backend.summarize(&document).await;
                    shared.settle(id, RequestKind::Summarize, result)
                }
            };
            guard.disarm();
            outcome
        });

        PendingRequest { id, kind, handle }
    }
}

fn current_runtime() -> Result<Handle, ChatError> {
    Handle::try_current().map_err(|e| ChatError::NoRuntime(e.to_string()))
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, ChatError> {
        self.state
            .lock()
            .map_err(|e| ChatError::StatePoisoned(e.to_string()))
    }

    /// Lock for reads, draft edits and settling. A poisoned lock is recovered
    /// so the session can still return to idle.
    fn guard(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn append(&self, state: &mut SessionState, message: Message) {
        state.conversation.append(message.clone());
        self.emit(ChatEvent::Appended {
            index: state.conversation.len() - 1,
            message,
        });
    }

    fn replace_last(&self, state: &mut SessionState, message: Message) {
        match state.conversation.replace_last(message.clone()) {
            Ok(_) => self.emit(ChatEvent::Replaced {
                index: state.conversation.len() - 1,
                message,
            }),
            Err(e) => error!(error = %e, "Placeholder missing on settle"),
        }
    }

    fn remove_last(&self, state: &mut SessionState) {
        match state.conversation.remove_last() {
            Ok(_) => self.emit(ChatEvent::Retracted {
                index: state.conversation.len(),
            }),
            Err(e) => error!(error = %e, "Placeholder missing on settle"),
        }
    }

    /// Record the user entry and placeholder and enter the awaiting state.
    fn begin(
        &self,
        state: &mut SessionState,
        kind: RequestKind,
        entry: Message,
        placeholder: &str,
    ) -> Result<Uuid, ChatError> {
        let from = state.request;
        let to = kind.awaiting_state();
        state.request.transition(to)?;

        self.append(state, entry);
        self.append(state, Message::system(placeholder));
        self.emit(ChatEvent::StateChanged { from, to });

        let id = Uuid::new_v4();
        state.in_flight = Some(id);
        Ok(id)
    }

    fn finish(&self, state: &mut SessionState) {
        let from = state.request;
        if let Err(e) = state.request.transition(RequestState::Idle) {
            warn!(error = %e, "Forcing request state back to idle");
            state.request = RequestState::Idle;
        }
        state.in_flight = None;
        self.emit(ChatEvent::StateChanged {
            from,
            to: RequestState::Idle,
        });
    }

    /// Apply the backend result for request `id`.
    fn settle(
        &self,
        id: Uuid,
        kind: RequestKind,
        result: Result<String, BackendError>,
    ) -> RequestOutcome {
        let mut state = self.guard();
        if state.in_flight != Some(id) {
            warn!(request_id = %id, "Settling a request that is no longer in flight");
        }

        let outcome = match (kind, result) {
            (RequestKind::Ask, Ok(answer)) => {
                self.replace_last(&mut state, Message::system(answer.clone()));
                RequestOutcome::Answered(answer)
            }
            (RequestKind::Summarize, Ok(summary)) => {
                self.replace_last(&mut state, Message::system(summary.clone()));
                RequestOutcome::Summarized(summary)
            }
            (RequestKind::Ask, Err(err)) => {
                warn!(request_id = %id, kind = %err.kind, error = %err, "Question failed");
                self.remove_last(&mut state);
                RequestOutcome::Failed(Notice::from(&err))
            }
            (RequestKind::Summarize, Err(err)) => {
                warn!(request_id = %id, kind = %err.kind, error = %err, "Summary failed");
                let entry = format!("{}{}", SUMMARY_FAILED_PREFIX, err.message);
                self.replace_last(&mut state, Message::system(entry));
                RequestOutcome::Failed(Notice::from(&err))
            }
        };

        self.finish(&mut state);
        if let RequestOutcome::Failed(notice) = &outcome {
            self.emit(ChatEvent::Notice {
                notice: notice.clone(),
            });
        }
        info!(request_id = %id, len = state.conversation.len(), "Request settled");
        outcome
    }

    /// The request task ended without settling (the backend panicked).
    fn abandon(&self, id: Uuid, kind: RequestKind) {
        let mut state = self.guard();
        if state.in_flight != Some(id) {
            return;
        }
        warn!(request_id = %id, "Request task ended without settling; returning to idle");

        let notice = Notice::error("The request was interrupted. Please try again.");
        match kind {
            RequestKind::Ask => self.remove_last(&mut state),
            RequestKind::Summarize => {
                let entry = format!("{}{}", SUMMARY_FAILED_PREFIX, notice.message);
                self.replace_last(&mut state, Message::system(entry));
            }
        }
        self.finish(&mut state);
        self.emit(ChatEvent::Notice { notice });
    }
}

/// Returns the session to idle if the request task unwinds before settling.
struct SettleGuard {
    shared: Arc<Shared>,
    id: Uuid,
    kind: RequestKind,
    armed: bool,
}

impl SettleGuard {
    fn new(shared: Arc<Shared>, id: Uuid, kind: RequestKind) -> Self {
        Self {
            shared,
            id,
            kind,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.armed {
            self.shared.abandon(self.id, self.kind);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
