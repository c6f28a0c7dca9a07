//! Wire types for the Ollama HTTP API.
//!
//! Only the chat endpoint family is modelled: `POST /api/chat` (streaming
//! and preload) and `GET /api/tags`.

use serde::{Deserialize, Serialize};

use sai_core::{Message, ModelName};

// =============================================================================
// Requests
// =============================================================================

/// Body of a streaming `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model to run.
    pub model: ModelName,
    /// Full conversation, oldest first.
    pub messages: Vec<Message>,
    /// Always `true`: replies are consumed as NDJSON.
    pub stream: bool,
}

impl ChatRequest {
    /// Build a streaming request for `model` over `messages`.
    #[must_use]
    pub fn new(model: &ModelName, messages: &[Message]) -> Self {
        Self {
            model: model.clone(),
            messages: messages.to_vec(),
            stream: true,
        }
    }
}

/// Model-only body that asks the server to load a model into memory.
#[derive(Debug, Clone, Serialize)]
pub struct PreloadRequest<'a> {
    /// Model to load.
    pub model: &'a ModelName,
}

// =============================================================================
// Responses
// =============================================================================

/// One line of a streamed chat reply.
///
/// The server sends either `{"error": ...}` or a record with a `message`
/// object; the last record also carries `done: true` and timing statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatChunk {
    /// Stream-aborting error.
    #[serde(default)]
    pub error: Option<String>,
    /// Partial assistant message.
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    /// Set on the final record.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (`stop`, `length`, `load`, ...).
    #[serde(default)]
    pub done_reason: Option<String>,
}

/// The `message` object inside a [`ChatChunk`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChunkMessage {
    /// Usually `assistant`.
    #[serde(default)]
    pub role: Option<String>,
    /// Reasoning text, present only while the model is thinking.
    #[serde(default)]
    pub thinking: Option<String>,
    /// Answer text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Reply to a preload request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreloadResponse {
    /// `true` once the model is loaded.
    #[serde(default)]
    pub done: bool,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    /// Locally installed models.
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One installed model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    /// Full model name including tag.
    pub model: String,
    /// Display name (usually equal to `model`).
    #[serde(default)]
    pub name: Option<String>,
    /// Size on disk in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_correctly() {
        let model = ModelName::new("m1").unwrap();
        let request = ChatRequest::new(&model, &[Message::system("sys"), Message::user("hi")]);

        let parsed = serde_json::to_value(&request).unwrap();

        assert_eq!(parsed["model"], "m1");
        assert_eq!(parsed["stream"], true);
        assert_eq!(parsed["messages"][0]["role"], "system");
        assert_eq!(parsed["messages"][1]["role"], "user");
        assert_eq!(parsed["messages"][1]["content"], "hi");
    }

    #[test]
    fn preload_request_is_model_only() {
        let model = ModelName::new("m1").unwrap();
        let parsed = serde_json::to_value(PreloadRequest { model: &model }).unwrap();
        assert_eq!(parsed, serde_json::json!({"model": "m1"}));
    }

    #[test]
    fn content_chunk_deserializes() {
        let json = r#"{"model":"m1","created_at":"2025-01-01T00:00:00Z","message":{"role":"assistant","content":"he"},"done":false}"#;
        let chunk: ChatChunk = serde_json::from_str(json).unwrap();

        let message = chunk.message.unwrap();
        assert_eq!(message.content.as_deref(), Some("he"));
        assert_eq!(message.thinking, None);
        assert!(!chunk.done);
    }

    #[test]
    fn final_chunk_deserializes() {
        let json = r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","total_duration":123,"eval_count":4}"#;
        let chunk: ChatChunk = serde_json::from_str(json).unwrap();

        assert!(chunk.done);
        assert_eq!(chunk.done_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn error_chunk_deserializes() {
        let chunk: ChatChunk = serde_json::from_str(r#"{"error":"model is loading"}"#).unwrap();
        assert_eq!(chunk.error.as_deref(), Some("model is loading"));
        assert!(chunk.message.is_none());
    }

    #[test]
    fn tags_response_deserializes() {
        let json = r#"{"models":[{"name":"llama3.2:latest","model":"llama3.2:latest","size":2019393189},{"model":"qwen3:8b"}]}"#;
        let tags: TagsResponse = serde_json::from_str(json).unwrap();

        let names: Vec<_> = tags.models.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(names, vec!["llama3.2:latest", "qwen3:8b"]);
        assert_eq!(tags.models[0].size, Some(2_019_393_189));
    }
}
