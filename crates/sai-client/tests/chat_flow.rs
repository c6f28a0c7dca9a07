//! End-to-end chat turns against a mock Ollama server.

use std::io;
use std::time::Duration;

use sai_client::{ChatError, ErrorKind, LiveView, OllamaClient, ResponseSession};
use sai_core::{Conversation, Message, MessageRole, ModelName};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Keeps the latest snapshot the way a terminal panel would.
#[derive(Default)]
struct ScreenView {
    title: String,
    screen: String,
    redraws: usize,
    complete: bool,
    error: Option<ErrorKind>,
}

impl LiveView for ScreenView {
    fn start(&mut self, title: &str) -> io::Result<()> {
        self.title = title.to_string();
        self.screen.clear();
        Ok(())
    }

    fn update(&mut self, snapshot: &str) -> io::Result<()> {
        self.screen = snapshot.to_string();
        self.redraws += 1;
        Ok(())
    }

    fn finish(&mut self, snapshot: &str) -> io::Result<()> {
        self.screen = snapshot.to_string();
        self.complete = true;
        Ok(())
    }

    fn fail(&mut self, error: &ChatError) -> io::Result<()> {
        self.error = Some(error.kind());
        Ok(())
    }

    fn interrupt(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

async fn mount_chat(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"model": "m1", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(server)
        .await;
}

fn session(server: &MockServer) -> ResponseSession<OllamaClient, ScreenView> {
    let client = OllamaClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    ResponseSession::new(client, ScreenView::default())
}

fn m1() -> ModelName {
    ModelName::new("m1").unwrap()
}

// =============================================================================
// Successful turns
// =============================================================================

#[tokio::test]
async fn two_fragment_reply_is_recorded() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        ndjson(&[
            serde_json::json!({"message": {"role": "assistant", "content": "he"}, "done": false}),
            serde_json::json!({"message": {"role": "assistant", "content": "llo"}, "done": false}),
            serde_json::json!({"message": {"role": "assistant", "content": ""}, "done": true, "done_reason": "stop"}),
        ]),
    )
    .await;

    let mut session = session(&server);
    let mut history = Conversation::from(vec![Message::user("hi")]);

    let reply = session.chat(&mut history, &m1(), "hi again").await;

    assert_eq!(reply.map(|m| m.content).as_deref(), Some("hello"));
    assert_eq!(history.len(), 3);
    assert_eq!(history.messages()[2].role, MessageRole::Assistant);

    let view = session.view();
    assert_eq!(view.title, "m1");
    assert_eq!(view.screen, "hello");
    assert_eq!(view.redraws, 3);
    assert!(view.complete);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn thinking_model_reply_has_markers() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        ndjson(&[
            serde_json::json!({"message": {"role": "assistant", "content": "", "thinking": "Let me"}}),
            serde_json::json!({"message": {"role": "assistant", "content": "", "thinking": " think."}}),
            serde_json::json!({"message": {"role": "assistant", "content": "Done."}}),
        ]),
    )
    .await;

    let mut session = session(&server);
    let mut history = Conversation::new();

    let reply = session.chat(&mut history, &m1(), "q").await.unwrap();
    assert_eq!(reply.content, "THINKING 🤔: Let me think.\n\n---\nDone.");
}

// =============================================================================
// Failed turns
// =============================================================================

#[tokio::test]
async fn error_mid_stream_leaves_history_unchanged() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        ndjson(&[
            serde_json::json!({"message": {"role": "assistant", "content": "partial"}}),
            serde_json::json!({"error": "an unknown error was encountered while running the model"}),
        ]),
    )
    .await;

    let mut session = session(&server);
    let mut history = Conversation::from(vec![Message::system("be brief")]);

    assert!(session.chat(&mut history, &m1(), "hi").await.is_none());
    assert_eq!(history.len(), 1);
    assert_eq!(session.view().error, Some(ErrorKind::Protocol));
    assert!(!session.view().complete);
}

#[tokio::test]
async fn invalid_utf8_fragment_is_decode_error() {
    let server = MockServer::start().await;
    let mut body = b"{\"message\":{\"role\":\"assistant\",\"content\":\"fine \"}}\n".to_vec();
    body.extend_from_slice(b"{\"message\":{\"role\":\"assistant\",\"content\":\"a\xffb\"}}\n");
    body.extend_from_slice(b"{\"message\":{\"role\":\"assistant\",\"content\":\"later\"}}\n");
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let mut session = session(&server);
    let mut history = Conversation::from(vec![Message::user("hi")]);

    assert!(session.chat(&mut history, &m1(), "again").await.is_none());
    assert_eq!(history.len(), 1);
    let view = session.view();
    assert_eq!(view.error, Some(ErrorKind::Decode));
    assert!(!view.screen.contains('\u{fffd}'));
    assert!(!view.screen.contains("later"));
    assert!(!view.complete);
}

#[tokio::test]
async fn empty_body_leaves_history_unchanged() {
    let server = MockServer::start().await;
    mount_chat(&server, String::new()).await;

    let mut session = session(&server);
    let mut history = Conversation::from(vec![Message::user("hi")]);

    assert!(session.send(&mut history, &m1()).await.is_none());
    assert_eq!(history.len(), 1);
    assert_eq!(session.view().redraws, 0);
    assert_eq!(session.view().error, Some(ErrorKind::Protocol));
}

#[tokio::test]
async fn unknown_model_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(
                serde_json::json!({"error": "model \"m1\" not found, try pulling it first"}),
            ),
        )
        .mount(&server)
        .await;

    let mut session = session(&server);
    let mut history = Conversation::new();

    assert!(session.chat(&mut history, &m1(), "hi").await.is_none());
    assert!(history.is_empty());
    assert_eq!(session.view().error, Some(ErrorKind::Protocol));
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let client = OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let mut session = ResponseSession::new(client, ScreenView::default());
    let mut history = Conversation::new();

    assert!(session.chat(&mut history, &m1(), "hi").await.is_none());
    assert!(history.is_empty());
    assert_eq!(session.view().error, Some(ErrorKind::Connection));
}
