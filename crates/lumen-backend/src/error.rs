//! Backend failure classification.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Remote error text of the form `SysTransient, "msg"` or
/// `CanisterReject, \"msg\"`, possibly embedded in a larger dump.
static REMOTE_ERROR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(SysTransient|CanisterReject),\s*\\*"([^\\"]+)"#)
        .expect("Invalid remote error regex")
});

/// How a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Network trouble, timeouts, overloaded or failing service.
    Transient,
    /// The remote explicitly declined the request.
    Rejected,
}

impl BackendErrorKind {
    /// Whether the call could succeed if issued again. Nothing in Lumen
    /// retries automatically; this only informs the message shown.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::Transient => write!(f, "transient"),
            BackendErrorKind::Rejected => write!(f, "rejected"),
        }
    }
}

/// A classified backend failure carrying a human-readable message.
///
/// `Display` yields the message verbatim so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transient, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected, message)
    }

    /// Extract a reject code and message from remote error text, if present.
    pub fn from_remote(raw: &str) -> Option<Self> {
        let caps = REMOTE_ERROR_PATTERN.captures(raw)?;
        let kind = match &caps[1] {
            "CanisterReject" => BackendErrorKind::Rejected,
            _ => BackendErrorKind::Transient,
        };
        Some(Self::new(kind, &caps[2]))
    }

    /// Classify opaque remote error text.
    ///
    /// Text without a recognizable reject code counts as transient and keeps
    /// its whole (trimmed) content as the message.
    pub fn classify(raw: &str) -> Self {
        if let Some(err) = Self::from_remote(raw) {
            return err;
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::transient("the reasoning service returned an empty error")
        } else {
            Self::transient(trimmed)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
