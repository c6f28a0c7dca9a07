//! HTTP client for the Ollama API.
//!
//! [`OllamaClient`] lists installed models, preloads a model and opens
//! streaming chat requests. The chat stream is exposed through the
//! [`ChatTransport`] trait so a session can be driven without a server.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

use sai_core::ModelName;

use crate::error::{describe_reqwest, ChatError, FrameError, OllamaError, Result};
use crate::framing::LineFramer;
use crate::types::{ApiErrorResponse, ChatRequest, PreloadRequest, PreloadResponse, TagsResponse};

/// Default timeout for connecting and for each read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A stream of raw NDJSON lines from a chat reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Something that can open a streaming chat request.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `request` and return the reply as a stream of raw lines.
    ///
    /// Dropping the stream closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or rejects the
    /// request before streaming starts.
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChunkStream>;

    /// The endpoint this transport talks to, for messages and logs.
    fn endpoint(&self) -> &str;
}

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for `base_url` (e.g. `http://localhost:11434`).
    ///
    /// `timeout` bounds connecting and every individual read, so a reply
    /// that keeps producing tokens may run longer than `timeout` in total.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ChatError::connection(&base_url, describe_reqwest(&e)))?;

        Ok(Self { client, base_url })
    }

    /// The normalised base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn connection_error(&self, err: &reqwest::Error) -> ChatError {
        ChatError::connection(&self.base_url, describe_reqwest(err))
    }

    /// Turn a non-2xx response into an Ollama error.
    async fn handle_error(response: reqwest::Response) -> ChatError {
        let status = response.status();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        };
        OllamaError::new(message).into()
    }

    // =========================================================================
    // Models
    // =========================================================================

    /// List installed models, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers with an
    /// error or an unexpected body.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.url("/api/tags");
        debug!(%url, "listing models");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body = response.text().await.map_err(|e| self.connection_error(&e))?;
        let tags: TagsResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::decode(&body, e))?;

        Ok(tags.models.into_iter().map(|m| m.model).collect())
    }

    /// Ask the server to load `model` into memory.
    ///
    /// Returns the `done` flag of the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or rejects the model.
    pub async fn preload_model(&self, model: &ModelName) -> Result<bool> {
        let url = self.url("/api/chat");
        debug!(%url, %model, "preloading model");

        let response = self
            .client
            .post(&url)
            .json(&PreloadRequest { model })
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body = response.text().await.map_err(|e| self.connection_error(&e))?;
        let reply: PreloadResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::decode(&body, e))?;

        Ok(reply.done)
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Open a streaming chat request.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or answers the request
    /// with an error status.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let url = self.url("/api/chat");
        debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(Box::pin(line_stream(
            self.base_url.clone(),
            Box::pin(response.bytes_stream()),
        )))
    }
}

#[async_trait]
impl ChatTransport for OllamaClient {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChunkStream> {
        self.stream_chat(request).await
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

/// Re-frame a response body into lines.
fn line_stream(base_url: String, bytes: ByteStream) -> impl Stream<Item = Result<String>> + Send {
    struct State {
        base_url: String,
        bytes: ByteStream,
        framer: LineFramer,
        pending: VecDeque<std::result::Result<String, FrameError>>,
        done: bool,
    }

    stream::try_unfold(
        State {
            base_url,
            bytes,
            framer: LineFramer::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                match state.pending.pop_front() {
                    Some(Ok(line)) => return Ok(Some((line, state))),
                    Some(Err(err)) => return Err(ChatError::from(err)),
                    None => {}
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.framer.push_chunk(&chunk));
                    }
                    Some(Err(e)) => {
                        return Err(ChatError::connection(
                            &state.base_url,
                            format!("stream interrupted: {}", describe_reqwest(&e)),
                        ));
                    }
                    None => {
                        state.pending.extend(state.framer.finish().transpose());
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sai_core::Message;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn model() -> ModelName {
        ModelName::new("m1").unwrap()
    }

    async fn collect_lines(stream: ChunkStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[test]
    fn base_url_is_normalised() {
        let client = OllamaClient::new("http://localhost:11434//", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.endpoint(), "http://localhost:11434");
    }

    // =========================================================================
    // Models
    // =========================================================================

    #[tokio::test]
    async fn list_models_returns_server_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    {"name": "qwen3:8b", "model": "qwen3:8b"},
                    {"name": "llama3.2:latest", "model": "llama3.2:latest"}
                ]
            })))
            .mount(&server)
            .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["qwen3:8b", "llama3.2:latest"]);
    }

    #[tokio::test]
    async fn list_models_with_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_models().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn preload_sends_model_only_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({"model": "m1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "m1",
                "message": {"role": "assistant", "content": ""},
                "done_reason": "load",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).preload_model(&model()).await.unwrap());
    }

    #[tokio::test]
    async fn preload_unknown_model_reports_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model \"m1\" not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).preload_model(&model()).await.unwrap_err();
        assert!(matches!(err, ChatError::Ollama(e) if e.message() == "model \"m1\" not found"));
    }

    // =========================================================================
    // Chat
    // =========================================================================

    #[tokio::test]
    async fn stream_chat_yields_lines() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"he\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}"
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let request = ChatRequest::new(&model(), &[Message::user("hi")]);
        let stream = client(&server).stream_chat(&request).await.unwrap();
        let lines: Vec<String> = collect_lines(stream)
            .await
            .into_iter()
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"he\""));
        assert!(lines[2].contains("\"done\":true"));
    }

    #[tokio::test]
    async fn stream_chat_invalid_utf8_ends_stream() {
        let server = MockServer::start().await;
        let mut body = b"{\"message\":{\"content\":\"ok\"}}\n".to_vec();
        body.extend_from_slice(b"{\"message\":{\"content\":\"a\xffb\"}}\n");
        body.extend_from_slice(b"{\"message\":{\"content\":\"never\"}}\n");
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let request = ChatRequest::new(&model(), &[Message::user("hi")]);
        let stream = client(&server).stream_chat(&request).await.unwrap();
        let items = collect_lines(stream).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].as_ref().unwrap().contains("\"ok\""));
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(matches!(err, ChatError::Frame(FrameError::InvalidUtf8 { .. })));
    }

    #[tokio::test]
    async fn stream_chat_error_status_is_ollama_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "bad model"})),
            )
            .mount(&server)
            .await;

        let request = ChatRequest::new(&model(), &[Message::user("hi")]);
        let err = client(&server).stream_chat(&request).await.err().unwrap();
        assert!(matches!(err, ChatError::Ollama(e) if e.message() == "bad model"));
    }

    #[tokio::test]
    async fn stream_chat_error_status_without_body_names_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let request = ChatRequest::new(&model(), &[Message::user("hi")]);
        let err = client(&server).stream_chat(&request).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_error() {
        // Nothing listens on port 9 on test machines.
        let client = OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let request = ChatRequest::new(&model(), &[Message::user("hi")]);

        let err = client.stream_chat(&request).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
