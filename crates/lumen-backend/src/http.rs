//! JSON-over-HTTP reasoning backend.
//!
//! `POST {base}/chat` with `{"messages": [...]}` and `POST {base}/summarize`
//! with `{"document": "..."}`. Both answer `{"response": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lumen_core::config::BackendConfig;
use lumen_core::{LumenError, Message};

use crate::error::{BackendError, BackendErrorKind};
use crate::ReasoningBackend;

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum WireMessage<'a> {
    User { content: &'a str },
    System { content: &'a str },
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        match message {
            Message::User(body) => WireMessage::User {
                content: &body.content,
            },
            Message::System(body) => WireMessage::System {
                content: &body.content,
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    document: &'a str,
}

#[derive(Deserialize)]
struct ServiceReply {
    response: String,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// Reasoning backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url`. `timeout` bounds each whole call.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> lumen_core::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LumenError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> lumen_core::Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(&config.base_url, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "Calling reasoning service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, &text);
            warn!(status = %status, kind = %err.kind, "Reasoning service returned an error");
            return Err(err);
        }

        let reply: ServiceReply = response.json().await.map_err(|e| {
            BackendError::transient(format!("unexpected reply from the reasoning service: {}", e))
        })?;
        Ok(reply.response)
    }
}

#[async_trait]
impl ReasoningBackend for HttpBackend {
    async fn ask(&self, history: &[Message]) -> Result<String, BackendError> {
        let request = ChatRequest {
            messages: history.iter().map(WireMessage::from).collect(),
        };
        self.post("chat", &request).await
    }

    async fn summarize(&self, document: &str) -> Result<String, BackendError> {
        self.post("summarize", &SummarizeRequest { document }).await
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::transient("the reasoning service did not answer in time")
    } else if err.is_connect() {
        BackendError::transient("could not reach the reasoning service")
    } else {
        BackendError::transient(err.to_string())
    }
}

/// A reject code in the body decides the kind. Otherwise 4xx (except 429)
/// means the service declined and anything else may pass.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let text = match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.to_string(),
    };
    if let Some(err) = BackendError::from_remote(&text) {
        return err;
    }

    let kind = if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        BackendErrorKind::Rejected
    } else {
        BackendErrorKind::Transient
    };
    let message = match text.trim() {
        "" => format!("the reasoning service answered {}", status),
        trimmed => trimmed.to_string(),
    };
    BackendError::new(kind, message)
}
