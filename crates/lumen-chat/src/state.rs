//! Request state machine.
//!
//! One request may be in flight per session:
//! - Idle -> AwaitingAsk (question accepted)
//! - Idle -> AwaitingSummarize (document accepted)
//! - AwaitingAsk -> Idle (answer or failure settled)
//! - AwaitingSummarize -> Idle (summary or failure settled)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Lifecycle of the single outstanding backend call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Nothing in flight. Submissions are accepted.
    #[default]
    Idle,
    /// Waiting for the backend to answer a question.
    AwaitingAsk,
    /// Waiting for the backend to summarize a document.
    AwaitingSummarize,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Idle => write!(f, "idle"),
            RequestState::AwaitingAsk => write!(f, "awaiting answer"),
            RequestState::AwaitingSummarize => write!(f, "awaiting summary"),
        }
    }
}

impl RequestState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, RequestState::Idle)
    }

    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: RequestState) -> bool {
        matches!(
            (self, target),
            (RequestState::Idle, RequestState::AwaitingAsk)
                | (RequestState::Idle, RequestState::AwaitingSummarize)
                | (RequestState::AwaitingAsk, RequestState::Idle)
                | (RequestState::AwaitingSummarize, RequestState::Idle)
        )
    }

    /// Move to `target` if the transition is allowed.
    pub fn transition(&mut self, target: RequestState) -> Result<(), ChatError> {
        if self.can_transition_to(target) {
            tracing::debug!("Request state: {} -> {}", self, target);
            *self = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }
}
