use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

// =============================================================================
// Conversation entries
// =============================================================================

/// Payload shared by both message variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub content: String,
    /// When the entry was created. Rendered as the entry's clock time.
    #[serde(default)]
    pub created_at: Timestamp,
}

impl MessageBody {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// A single conversation entry.
///
/// Serialized externally tagged, e.g. `{"user":{"content":"hi",...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    /// Something the person typed or uploaded.
    User(MessageBody),
    /// Greeting, placeholder, answer, summary or error notice.
    System(MessageBody),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User(MessageBody::new(content))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::System(MessageBody::new(content))
    }

    /// Override the creation time (tests, replayed transcripts).
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        match &mut self {
            Message::User(body) | Message::System(body) => body.created_at = created_at,
        }
        self
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User(_))
    }

    pub fn text(&self) -> &str {
        &self.body().content
    }

    pub fn created_at(&self) -> Timestamp {
        self.body().created_at
    }

    /// Label shown next to the entry.
    pub fn author(&self) -> &'static str {
        match self {
            Message::User(_) => "You",
            Message::System(_) => "AI Assistant",
        }
    }

    /// Creation time as zero-padded `HH:MM` in the local timezone.
    pub fn display_time(&self) -> String {
        self.display_time_in(&Local)
    }

    /// Creation time as zero-padded `HH:MM` in the given timezone.
    pub fn display_time_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.created_at()
            .to_datetime()
            .with_timezone(tz)
            .format("%H:%M")
            .to_string()
    }

    fn body(&self) -> &MessageBody {
        match self {
            Message::User(body) | Message::System(body) => body,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.author(), self.text())
    }
}
