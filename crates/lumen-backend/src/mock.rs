//! Scriptable in-process backend for tests and offline use.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use lumen_core::Message;

use crate::error::BackendError;
use crate::ReasoningBackend;

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Ask(Vec<Message>),
    Summarize(String),
}

/// Backend that answers from scripted reply queues.
///
/// Unscripted calls answer deterministically: `ask` echoes the latest user
/// message and `summarize` returns the first sentence of the document. A held
/// mock parks every call until [`MockBackend::release`] is called, which lets
/// tests observe a session while a request is in flight.
#[derive(Debug, Default)]
pub struct MockBackend {
    ask_replies: Mutex<VecDeque<Result<String, BackendError>>>,
    summarize_replies: Mutex<VecDeque<Result<String, BackendError>>>,
    calls: Mutex<Vec<BackendCall>>,
    gate: Option<Semaphore>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose calls wait for [`MockBackend::release`].
    pub fn held() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Queue the result of the next unanswered `ask`.
    pub fn push_ask_reply(&self, reply: Result<String, BackendError>) -> &Self {
        lock(&self.ask_replies).push_back(reply);
        self
    }

    /// Queue the result of the next unanswered `summarize`.
    pub fn push_summarize_reply(&self, reply: Result<String, BackendError>) -> &Self {
        lock(&self.summarize_replies).push_back(reply);
        self
    }

    /// Let `n` parked (or future) calls proceed. No-op on a mock that is not held.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    pub fn ask_calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                BackendCall::Ask(history) => Some(history.clone()),
                BackendCall::Summarize(_) => None,
            })
            .collect()
    }

    pub fn summarize_calls(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                BackendCall::Summarize(document) => Some(document.clone()),
                BackendCall::Ask(_) => None,
            })
            .collect()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            // The semaphore is never closed, so acquire only fails after drop.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl ReasoningBackend for MockBackend {
    async fn ask(&self, history: &[Message]) -> Result<String, BackendError> {
        lock(&self.calls).push(BackendCall::Ask(history.to_vec()));
        self.pass_gate().await;

        let scripted = lock(&self.ask_replies).pop_front();
        scripted.unwrap_or_else(|| Ok(echo_answer(history)))
    }

    async fn summarize(&self, document: &str) -> Result<String, BackendError> {
        lock(&self.calls).push(BackendCall::Summarize(document.to_string()));
        self.pass_gate().await;

        let scripted = lock(&self.summarize_replies).pop_front();
        scripted.unwrap_or_else(|| Ok(first_sentence_summary(document)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn echo_answer(history: &[Message]) -> String {
    match history.iter().rev().find(|m| m.is_user()) {
        Some(question) => format!("You asked: {}", question.text().trim()),
        None => "Ask me anything about your course material.".to_string(),
    }
}

fn first_sentence_summary(document: &str) -> String {
    let words = document.split_whitespace().count();
    let trimmed = document.trim();
    let first = match trimmed.find(['.', '!', '?']) {
        Some(end) => &trimmed[..=end],
        None => trimmed,
    };
    format!("Summary ({} words): {}", words, first)
}
