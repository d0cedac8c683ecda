//! User-visible notifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use lumen_backend::BackendError;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Input was refused; nothing changed.
    Warning,
    /// A backend call failed.
    Error,
}

/// Something the front-end should show as a blocking notification.
///
/// Refused input (a [`ChatError`]) becomes a warning; a failed backend call
/// (a [`BackendError`]) becomes an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&BackendError> for Notice {
    fn from(err: &BackendError) -> Self {
        Notice::error(err.message.clone())
    }
}

impl From<&ChatError> for Notice {
    fn from(err: &ChatError) -> Self {
        Notice::warning(err.to_string())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
