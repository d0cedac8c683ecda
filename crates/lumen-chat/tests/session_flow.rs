//! End-to-end conversation flows against the mock backend.

use std::sync::Arc;

use lumen_backend::{BackendError, MockBackend};
use lumen_chat::session::{
    SUMMARIZING_PLACEHOLDER, SUMMARY_FAILED_PREFIX, THINKING_PLACEHOLDER, UPLOAD_PREFIX,
};
use lumen_chat::{
    ChatError, ChatEvent, ChatSession, DocumentFile, IngestionAdapter, Notice, NoticeLevel,
    RequestOutcome, RequestState,
};
use lumen_core::Message;

// =============================================================================
// Helpers
// =============================================================================

const GREETING: &str = "I'm an AI study assistant. Upload a .txt file.";

fn new_session(backend: &Arc<MockBackend>) -> ChatSession {
    ChatSession::new(GREETING, Arc::clone(backend) as Arc<dyn lumen_backend::ReasoningBackend>)
}

/// `(is_user, text)` pairs, ignoring creation times.
fn transcript(session: &ChatSession) -> Vec<(bool, String)> {
    session
        .messages()
        .iter()
        .map(|m| (m.is_user(), m.text().to_string()))
        .collect()
}

fn user(text: &str) -> (bool, String) {
    (true, text.to_string())
}

fn system(text: &str) -> (bool, String) {
    (false, text.to_string())
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_successful_question() {
    let backend = Arc::new(MockBackend::new());
    backend.push_ask_reply(Ok("Photosynthesis converts light to chemical energy.".to_string()));
    let session = new_session(&backend);

    let pending = session
        .submit_question("What is photosynthesis?")
        .unwrap()
        .expect("question accepted");
    let outcome = pending.wait().await.unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Answered("Photosynthesis converts light to chemical energy.".to_string())
    );
    assert_eq!(
        transcript(&session),
        vec![
            system(GREETING),
            user("What is photosynthesis?"),
            system("Photosynthesis converts light to chemical energy."),
        ]
    );
    assert_eq!(session.state(), RequestState::Idle);
}

#[tokio::test]
async fn test_summarize_transient_failure_leaves_error_entry() {
    let backend = Arc::new(MockBackend::new());
    backend.push_summarize_reply(Err(BackendError::transient("Couldn't send message")));
    let session = new_session(&backend);
    let mut events = session.subscribe();

    let outcome = session
        .submit_document("Lorem ipsum...", "notes.txt")
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Failed(Notice::error("Couldn't send message"))
    );
    assert_eq!(
        transcript(&session),
        vec![
            system(GREETING),
            user("Uploaded file: notes.txt"),
            system(&format!("{}Couldn't send message", SUMMARY_FAILED_PREFIX)),
        ]
    );
    assert_eq!(session.state(), RequestState::Idle);

    let mut notified = false;
    while let Ok(event) = events.try_recv() {
        if let ChatEvent::Notice { notice } = event {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.message, "Couldn't send message");
            notified = true;
        }
    }
    assert!(notified, "summary failure must notify the user");
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_submit_appends_two_entries_before_dispatch_completes() {
    let backend = Arc::new(MockBackend::held());
    let session = new_session(&backend);

    for (i, question) in ["a", "  padded  ", "multi\nline", "ünïcödé"].iter().enumerate() {
        let before = session.len();
        let pending = session.submit_question(question).unwrap().unwrap();

        // Visible synchronously, before the backend has answered.
        assert_eq!(session.len(), before + 2, "question #{}", i);
        assert_eq!(session.state(), RequestState::AwaitingAsk);
        let messages = session.messages();
        assert_eq!(messages[before].text(), *question);
        assert!(messages[before].is_user());
        assert_eq!(messages[before + 1].text(), THINKING_PLACEHOLDER);
        assert!(!pending.is_finished());

        backend.release(1);
        pending.wait().await.unwrap();
        // Placeholder replaced in place: length unchanged from post-submit.
        assert_eq!(session.len(), before + 2);
        assert_eq!(session.state(), RequestState::Idle);
    }
}

#[tokio::test]
async fn test_blank_questions_are_noops() {
    let backend = Arc::new(MockBackend::new());
    let session = new_session(&backend);
    let mut events = session.subscribe();

    for blank in ["", "   ", "\n\t "] {
        assert!(session.submit_question(blank).unwrap().is_none());
        assert_eq!(session.len(), 1);
        assert_eq!(session.state(), RequestState::Idle);
    }
    assert!(backend.calls().is_empty());
    assert!(events.try_recv().is_err(), "blank input is not reported");
}

#[tokio::test]
async fn test_failed_question_retracts_placeholder_only() {
    let backend = Arc::new(MockBackend::new());
    backend.push_ask_reply(Err(BackendError::rejected("Canister rejected the message")));
    let session = new_session(&backend);

    let pending = session.submit_question("Explain mitosis").unwrap().unwrap();
    let post_submit_len = session.len();
    let outcome = pending.wait().await.unwrap();

    assert_eq!(session.len(), post_submit_len - 1);
    assert_eq!(session.state(), RequestState::Idle);
    assert_eq!(
        transcript(&session),
        vec![system(GREETING), user("Explain mitosis")]
    );
    match outcome {
        RequestOutcome::Failed(notice) => {
            assert_eq!(notice.message, "Canister rejected the message")
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_second_submission_while_busy_is_rejected() {
    let backend = Arc::new(MockBackend::held());
    let session = new_session(&backend);

    let pending = session.submit_question("first").unwrap().unwrap();
    let snapshot = transcript(&session);

    let err = session.submit_question("second").unwrap_err();
    assert!(matches!(
        err,
        ChatError::Busy {
            state: RequestState::AwaitingAsk
        }
    ));
    let err = session.submit_document("text", "notes.txt").unwrap_err();
    assert!(matches!(err, ChatError::Busy { .. }));

    assert_eq!(transcript(&session), snapshot);
    assert_eq!(session.state(), RequestState::AwaitingAsk);

    backend.release(1);
    pending.wait().await.unwrap();
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_question_while_summarizing_is_rejected() {
    let backend = Arc::new(MockBackend::held());
    let session = new_session(&backend);

    let pending = session.submit_document("Some notes.", "notes.txt").unwrap();
    assert_eq!(session.state(), RequestState::AwaitingSummarize);
    assert_eq!(
        transcript(&session).last().unwrap(),
        &system(SUMMARIZING_PLACEHOLDER)
    );

    assert!(matches!(
        session.submit_question("hello"),
        Err(ChatError::Busy {
            state: RequestState::AwaitingSummarize
        })
    ));
    assert_eq!(session.len(), 3);

    backend.release(1);
    pending.wait().await.unwrap();
    assert_eq!(session.state(), RequestState::Idle);
}

#[tokio::test]
async fn test_upload_while_busy_is_reported() {
    let backend = Arc::new(MockBackend::held());
    let session = new_session(&backend);
    let adapter = IngestionAdapter::new(session.clone(), 1024);

    let pending = session.submit_question("first").unwrap().unwrap();
    let mut events = session.subscribe();

    let file = DocumentFile::new("notes.txt", None, "text");
    assert!(matches!(adapter.ingest(file), Err(ChatError::Busy { .. })));
    match events.try_recv().unwrap() {
        ChatEvent::Notice { notice } => {
            assert_eq!(notice.level, NoticeLevel::Warning);
            assert!(notice.message.contains("notes.txt"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(session.len(), 3);

    backend.release(1);
    pending.wait().await.unwrap();
}

#[tokio::test]
async fn test_history_sent_excludes_greeting_and_includes_question() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_ask_reply(Ok("A1".to_string()))
        .push_ask_reply(Ok("A2".to_string()));
    let session = new_session(&backend);

    session.submit_question("Q1").unwrap().unwrap().wait().await.unwrap();
    session.submit_question("Q2").unwrap().unwrap().wait().await.unwrap();

    let calls = backend.ask_calls();
    assert_eq!(calls.len(), 2);
    let texts = |history: &Vec<Message>| -> Vec<String> {
        history.iter().map(|m| m.text().to_string()).collect()
    };
    assert_eq!(texts(&calls[0]), vec!["Q1"]);
    assert_eq!(texts(&calls[1]), vec!["Q1", "A1", "Q2"]);
    assert!(calls
        .iter()
        .flatten()
        .all(|m| m.text() != GREETING && m.text() != THINKING_PLACEHOLDER));

    let snapshot = session.snapshot_for_backend();
    assert_eq!(texts(&snapshot), vec!["Q1", "A1", "Q2", "A2"]);
}

#[tokio::test]
async fn test_summarize_sends_document_only() {
    let backend = Arc::new(MockBackend::new());
    backend.push_ask_reply(Ok("answer".to_string()));
    backend.push_summarize_reply(Ok("The notes cover cell biology.".to_string()));
    let session = new_session(&backend);

    session.submit_question("warm-up").unwrap().unwrap().wait().await.unwrap();
    let outcome = session
        .submit_document("Cells are the unit of life.", "bio.txt")
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Summarized("The notes cover cell biology.".to_string())
    );
    assert_eq!(
        backend.summarize_calls(),
        vec!["Cells are the unit of life.".to_string()]
    );
    assert_eq!(
        transcript(&session)[3..].to_vec(),
        vec![
            user(&format!("{}bio.txt", UPLOAD_PREFIX)),
            system("The notes cover cell biology."),
        ]
    );
}

#[tokio::test]
async fn test_failure_is_not_retried_and_session_recovers() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_ask_reply(Err(BackendError::transient("timeout")))
        .push_ask_reply(Ok("second try works".to_string()));
    let session = new_session(&backend);

    session.submit_question("Q").unwrap().unwrap().wait().await.unwrap();
    assert_eq!(backend.ask_calls().len(), 1, "no automatic retry");

    session.submit_question("Q again").unwrap().unwrap().wait().await.unwrap();
    assert_eq!(
        transcript(&session),
        vec![
            system(GREETING),
            user("Q"),
            user("Q again"),
            system("second try works"),
        ]
    );
    // The retained unanswered question is part of the next history.
    let texts: Vec<String> = backend.ask_calls()[1]
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts, vec!["Q", "Q again"]);
}

#[tokio::test]
async fn test_at_most_one_placeholder_over_many_requests() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_ask_reply(Err(BackendError::transient("flaky")))
        .push_summarize_reply(Err(BackendError::rejected("too long")));
    let session = new_session(&backend);

    session.submit_question("one").unwrap().unwrap().wait().await.unwrap();
    session.submit_document("doc", "a.txt").unwrap().wait().await.unwrap();
    session.submit_question("two").unwrap().unwrap().wait().await.unwrap();
    session.submit_document("doc two.", "b.txt").unwrap().wait().await.unwrap();

    let placeholders = session
        .messages()
        .iter()
        .filter(|m| m.text() == THINKING_PLACEHOLDER || m.text() == SUMMARIZING_PLACEHOLDER)
        .count();
    assert_eq!(placeholders, 0);
    assert_eq!(session.state(), RequestState::Idle);
    assert_eq!(session.messages()[0].text(), GREETING);
}

#[tokio::test]
async fn test_observers_never_see_a_gap_on_replace() {
    let backend = Arc::new(MockBackend::new());
    let session = new_session(&backend);
    let mut events = session.subscribe();

    session.submit_question("Q").unwrap().unwrap().wait().await.unwrap();

    let mut len: usize = 1;
    let mut min_after_submit = usize::MAX;
    while let Ok(event) = events.try_recv() {
        match event {
            ChatEvent::Appended { .. } => len += 1,
            ChatEvent::Retracted { .. } => len -= 1,
            ChatEvent::Replaced { .. } => {}
            ChatEvent::StateChanged { .. } | ChatEvent::Notice { .. } => {}
        }
        if len >= 3 || min_after_submit != usize::MAX {
            min_after_submit = min_after_submit.min(len);
        }
    }
    assert_eq!(len, 3);
    assert_eq!(min_after_submit, 3);
}
