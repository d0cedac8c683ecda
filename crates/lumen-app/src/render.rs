//! Terminal rendering of conversation events.

use tokio::sync::broadcast::{self, error::RecvError};

use lumen_chat::{ChatEvent, Notice};
use lumen_core::Message;

/// `[HH:MM] Author: text`
pub fn format_message(message: &Message) -> String {
    format!("[{}] {}", message.display_time(), message)
}

pub fn format_notice(notice: &Notice) -> String {
    format!("! {}", notice)
}

/// The line to print for `event`, if any.
///
/// Retractions and state changes are silent; a failed question is reported
/// through the notice that follows its retraction.
pub fn format_event(event: &ChatEvent) -> Option<String> {
    match event {
        ChatEvent::Appended { message, .. } | ChatEvent::Replaced { message, .. } => {
            Some(format_message(message))
        }
        ChatEvent::Notice { notice } => Some(format_notice(notice)),
        ChatEvent::Retracted { .. } | ChatEvent::StateChanged { .. } => None,
    }
}

pub fn print_history(messages: &[Message]) {
    for message in messages {
        println!("{}", format_message(message));
    }
}

/// Print events until every session handle is gone.
pub async fn run(mut events: broadcast::Receiver<ChatEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = format_event(&event) {
                    println!("{}", line);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind, some events were not shown");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
