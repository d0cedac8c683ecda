//! Change notifications for observers of a chat session.
//!
//! Events are sent while the session lock is held, so receivers see them in
//! mutation order.

use serde::{Deserialize, Serialize};

use lumen_core::Message;

use crate::notice::Notice;
use crate::state::RequestState;

/// Capacity of each session's broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A new entry was added at `index`.
    Appended { index: usize, message: Message },
    /// The entry at `index` (always the newest) was swapped in place.
    Replaced { index: usize, message: Message },
    /// The entry at `index` (always the newest) was removed.
    Retracted { index: usize },
    /// The request state moved.
    StateChanged {
        from: RequestState,
        to: RequestState,
    },
    /// Something to show the user.
    Notice { notice: Notice },
}
