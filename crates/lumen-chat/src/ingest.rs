//! Ingestion adapter: turns a user-chosen file into a summarize request.
//!
//! Only plain text is accepted (any `text/*` media type). Content is decoded
//! as UTF-8 and handed to the session untouched; summarizing it is entirely
//! the backend's job. Every rejection is reported as a warning notice and
//! leaves the conversation unchanged.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use lumen_core::config::ChatConfig;

use crate::error::ChatError;
use crate::notice::Notice;
use crate::session::{ChatSession, PendingRequest};

/// A file handed over by the file-picking collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    /// Name shown in the conversation, e.g. `notes.txt`.
    pub display_name: String,
    /// Declared media type, if the picker knows it.
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(
        display_name: impl Into<String>,
        media_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Read a whole file from disk, guessing its media type from the
    /// extension. [`IngestionAdapter::ingest_path`] checks type and size
    /// before reading anything.
    pub async fn from_path(path: &Path) -> Result<Self, ChatError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            display_name: display_name_of(path),
            media_type: guess_media_type(path),
            bytes,
        })
    }

    /// Declared media type, else one guessed from the display name.
    pub fn effective_media_type(&self) -> Option<String> {
        self.media_type
            .as_ref()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .or_else(|| guess_media_type(Path::new(&self.display_name)))
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn guess_media_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Feeds decoded documents to a [`ChatSession`].
#[derive(Debug, Clone)]
pub struct IngestionAdapter {
    session: ChatSession,
    max_document_bytes: usize,
}

impl IngestionAdapter {
    pub fn new(session: ChatSession, max_document_bytes: usize) -> Self {
        Self {
            session,
            max_document_bytes,
        }
    }

    pub fn from_config(session: ChatSession, config: &ChatConfig) -> Self {
        Self::new(session, config.max_document_bytes)
    }

    /// Check the file is acceptable plain text and decode it.
    pub fn decode(&self, file: &DocumentFile) -> Result<String, ChatError> {
        check_media_type(file.effective_media_type().as_deref(), &file.display_name)?;
        self.check_size(file.bytes.len() as u64)?;

        let text = std::str::from_utf8(&file.bytes)
            .map_err(|_| ChatError::InvalidEncoding(file.display_name.clone()))?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
    }

    fn check_size(&self, size: u64) -> Result<(), ChatError> {
        if size > self.max_document_bytes as u64 {
            return Err(ChatError::DocumentTooLarge {
                size: usize::try_from(size).unwrap_or(usize::MAX),
                limit: self.max_document_bytes,
            });
        }
        Ok(())
    }

    /// Read `path` only once its name says text and its length fits the
    /// limit. The read itself is capped at one byte over the limit.
    async fn read_checked(&self, path: &Path) -> Result<DocumentFile, ChatError> {
        let display_name = display_name_of(path);
        let media_type = guess_media_type(path);
        check_media_type(media_type.as_deref(), &display_name)?;

        let file = tokio::fs::File::open(path).await?;
        self.check_size(file.metadata().await?.len())?;

        let mut bytes = Vec::new();
        file.take((self.max_document_bytes as u64).saturating_add(1))
            .read_to_end(&mut bytes)
            .await?;
        self.check_size(bytes.len() as u64)?;

        Ok(DocumentFile {
            display_name,
            media_type,
            bytes,
        })
    }

    /// Decode `file` and submit it for summarization.
    pub fn ingest(&self, file: DocumentFile) -> Result<PendingRequest, ChatError> {
        let text = match self.decode(&file) {
            Ok(text) => text,
            Err(err) => {
                warn!(file = %file.display_name, error = %err, "Document rejected");
                self.session.notify(Notice::from(&err));
                return Err(err);
            }
        };
        debug!(file = %file.display_name, chars = text.chars().count(), "Document decoded");
        self.session.submit_document(text, &file.display_name)
    }

    /// Read `path` and submit it for summarization.
    ///
    /// Non-text and oversized files are rejected before any content is read.
    pub async fn ingest_path(&self, path: &Path) -> Result<PendingRequest, ChatError> {
        match self.read_checked(path).await {
            Ok(file) => self.ingest(file),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Document rejected");
                let notice = match &err {
                    ChatError::Io(_) => {
                        Notice::warning(format!("Could not read {}: {}", path.display(), err))
                    }
                    other => Notice::from(other),
                };
                self.session.notify(notice);
                Err(err)
            }
        }
    }
}

/// Any `text/*` type is plain text.
fn check_media_type(media_type: Option<&str>, display_name: &str) -> Result<(), ChatError> {
    match media_type {
        Some(media) if media.starts_with("text/") => Ok(()),
        Some(media) => Err(ChatError::UnsupportedMediaType(media.to_string())),
        None => Err(ChatError::UnsupportedMediaType(format!(
            "unknown type of {}",
            display_name
        ))),
    }
}
