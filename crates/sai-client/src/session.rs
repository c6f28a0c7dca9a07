//! One request/response cycle.
//!
//! A [`ResponseSession`] opens the chat stream, pushes every decoded
//! snapshot to its [`LiveView`] and, when the reply completes, appends it to
//! the conversation. Failures end the turn, never the program: they are
//! logged, shown in the view and reported as `None`.

use std::future::{self, Future};
use std::io;

use futures::StreamExt;
use tracing::{debug, info, warn};

use sai_core::{Conversation, Message, ModelName};

use crate::client::ChatTransport;
use crate::decoder::decode_snapshots;
use crate::error::{ChatError, Result};
use crate::types::ChatRequest;
use crate::view::LiveView;

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The reply completed with non-empty text.
    Completed(Message),
    /// The reply failed; nothing should be recorded.
    Failed(ChatError),
    /// The user cancelled the reply.
    Cancelled,
}

impl TurnOutcome {
    /// The assistant message, if the turn completed.
    #[must_use]
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Completed(message) => Some(message),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }
}

/// Drives chat turns over a transport into a live view.
pub struct ResponseSession<T, V> {
    transport: T,
    view: V,
}

impl<T: ChatTransport, V: LiveView> ResponseSession<T, V> {
    /// Create a session from its transport and view.
    pub fn new(transport: T, view: V) -> Self {
        Self { transport, view }
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Replace the transport, e.g. after the server URL changed.
    pub fn set_transport(&mut self, transport: T) {
        self.transport = transport;
    }

    /// The view.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The view, mutably.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Send `history` as it is and append the reply to it.
    pub async fn send(&mut self, history: &mut Conversation, model: &ModelName) -> Option<Message> {
        self.send_with_cancel(history, model, future::pending()).await
    }

    /// Like [`send`](Self::send), but gives up when `cancel` resolves.
    pub async fn send_with_cancel<C>(
        &mut self,
        history: &mut Conversation,
        model: &ModelName,
        cancel: C,
    ) -> Option<Message>
    where
        C: Future<Output = ()>,
    {
        let message = self
            .exchange(history.messages(), model, cancel)
            .await
            .into_message()?;
        history.push(message.clone());
        Some(message)
    }

    /// Send a new user turn on top of `history`.
    ///
    /// On success both the user turn and the reply are appended; otherwise
    /// `history` is left as it was.
    pub async fn chat(
        &mut self,
        history: &mut Conversation,
        model: &ModelName,
        user_text: &str,
    ) -> Option<Message> {
        self.chat_with_cancel(history, model, user_text, future::pending())
            .await
    }

    /// Like [`chat`](Self::chat), but gives up when `cancel` resolves.
    pub async fn chat_with_cancel<C>(
        &mut self,
        history: &mut Conversation,
        model: &ModelName,
        user_text: &str,
        cancel: C,
    ) -> Option<Message>
    where
        C: Future<Output = ()>,
    {
        let turn = Message::user(user_text);
        let mut messages = history.messages().to_vec();
        messages.push(turn.clone());

        let message = self.exchange(&messages, model, cancel).await.into_message()?;
        history.push(turn);
        history.push(message.clone());
        Some(message)
    }

    /// Run one turn over `messages` and report how it ended.
    ///
    /// Nothing is recorded anywhere; the caller decides what to keep.
    pub async fn exchange<C>(
        &mut self,
        messages: &[Message],
        model: &ModelName,
        cancel: C,
    ) -> TurnOutcome
    where
        C: Future<Output = ()>,
    {
        let request = ChatRequest::new(model, messages);
        draw(self.view.start(model.as_str()));

        tokio::pin!(cancel);
        let outcome = tokio::select! {
            result = stream_reply(&self.transport, &mut self.view, &request) => match result {
                Ok(message) => TurnOutcome::Completed(message),
                Err(err) => TurnOutcome::Failed(err),
            },
            () = &mut cancel => TurnOutcome::Cancelled,
        };

        match &outcome {
            TurnOutcome::Completed(message) => {
                debug!(chars = message.content.len(), "reply complete");
                draw(self.view.finish(&message.content));
            }
            TurnOutcome::Failed(err) => {
                warn!(
                    kind = err.kind().as_str(),
                    endpoint = self.transport.endpoint(),
                    error = %err,
                    "chat turn failed"
                );
                draw(self.view.fail(err));
            }
            TurnOutcome::Cancelled => {
                info!("chat turn cancelled");
                draw(self.view.interrupt());
            }
        }
        outcome
    }
}

/// Stream one reply into `view`, returning the finished message.
async fn stream_reply<T, V>(transport: &T, view: &mut V, request: &ChatRequest) -> Result<Message>
where
    T: ChatTransport,
    V: LiveView,
{
    let lines = transport.open_chat(request).await?;
    let snapshots = decode_snapshots(lines);
    tokio::pin!(snapshots);

    let mut fragments = 0usize;
    let mut last = None;
    while let Some(snapshot) = snapshots.next().await {
        let snapshot = snapshot?;
        draw(view.update(&snapshot));
        fragments += 1;
        last = Some(snapshot);
    }
    debug!(fragments, "chat stream closed");

    match last {
        Some(text) if !text.trim().is_empty() => Ok(Message::assistant(text)),
        _ => Err(ChatError::EmptyResponse),
    }
}

/// Drawing problems never abort a turn.
fn draw(result: io::Result<()>) {
    if let Err(err) = result {
        warn!(error = %err, "failed to draw reply");
    }
}
