//! Line-oriented input loop.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use lumen_chat::{ChatError, ChatSession, IngestionAdapter, Notice, PendingRequest};

use crate::render;

const HELP: &str = "Type a question, or: /upload <path>  /history  /help  /quit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Upload(PathBuf),
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Ask(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "upload" if !arg.is_empty() => Command::Upload(PathBuf::from(arg)),
            "history" => Command::History,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

/// How the loop ended.
#[derive(Debug)]
pub enum Exit {
    Quit,
    /// Input closed; carries the most recent request, which may still be running.
    EndOfInput(Option<PendingRequest>),
}

/// Read lines from `input` until `/quit` or end of input.
pub async fn run<R>(
    input: R,
    session: &ChatSession,
    adapter: &IngestionAdapter,
    mut last: Option<PendingRequest>,
) -> std::io::Result<Exit>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Ask(question) => match session.submit_question(&question) {
                Ok(Some(pending)) => last = Some(pending),
                Ok(None) => {}
                Err(ChatError::Busy { state }) => {
                    tracing::debug!(%state, "Question typed while busy");
                    println!(
                        "{}",
                        render::format_notice(&Notice::warning(
                            "Still working on the previous request. Please wait for it to finish."
                        ))
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Could not submit question");
                    println!("{}", render::format_notice(&Notice::from(&e)));
                }
            },
            // Rejections are reported to the renderer by the session.
            Command::Upload(path) => match adapter.ingest_path(&path).await {
                Ok(pending) => last = Some(pending),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Upload not submitted"),
            },
            Command::History => render::print_history(&session.messages()),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Exit::Quit),
            Command::Unknown(text) => println!("Unknown command {}. {}", text, HELP),
        }
    }
    Ok(Exit::EndOfInput(last))
}
