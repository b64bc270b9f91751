//! Collaborator traits implemented by the infrastructure layer.
//!
//! The engine talks to three external collaborators: the chat HTTP API, the
//! realtime channel, and the visitor identity store. Each is specified here
//! as a trait; implementations live in `confab-client`. Uses native async
//! fn in traits (RPITIT, Rust 2024 edition).

use confab_types::chat::{Feedback, Rating};
use confab_types::error::{ApiError, ChannelError, IdentityError};
use confab_types::ids::{ChatId, FeedbackId, ItemId, VisitorId};
use confab_types::wire::{ChannelFrame, CreatedChat, HistoryData, SendData};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The chat HTTP API collaborator.
///
/// Every response is envelope-wrapped on the wire; implementations unwrap
/// the envelope and map non-success codes to [`ApiError::Application`].
pub trait ChatApi: Send + Sync + 'static {
    /// Create a new conversation named after the first question.
    fn create_chat(
        &self,
        name: &str,
        visitor_id: Option<&VisitorId>,
    ) -> impl Future<Output = Result<CreatedChat, ApiError>> + Send;

    /// Fetch one newest-first page of conversation history.
    fn fetch_history(
        &self,
        chat_id: &ChatId,
        page: u32,
        size: u32,
        visitor_id: Option<&VisitorId>,
    ) -> impl Future<Output = Result<HistoryData, ApiError>> + Send;

    /// Submit a question and await the server's answer.
    fn send_question(
        &self,
        question: &str,
        chat_id: Option<&ChatId>,
        visitor_id: Option<&VisitorId>,
    ) -> impl Future<Output = Result<SendData, ApiError>> + Send;

    /// Create feedback on an answered item.
    fn create_feedback(
        &self,
        history_id: &ItemId,
        rating: Rating,
        comment: &str,
    ) -> impl Future<Output = Result<Feedback, ApiError>> + Send;

    /// Update previously submitted feedback.
    fn update_feedback(
        &self,
        feedback_id: &FeedbackId,
        rating: Rating,
        comment: &str,
    ) -> impl Future<Output = Result<Feedback, ApiError>> + Send;
}

/// The realtime channel collaborator.
///
/// One subscription per session identifier. The controller tears a
/// subscription down (cancel + drop) before opening the next one, so frame
/// delivery for a stale session ends before the new session's begins.
pub trait RealtimeConnector: Send + Sync + 'static {
    /// Open a subscription scoped to one conversation.
    fn connect(
        &self,
        chat_id: &ChatId,
    ) -> impl Future<Output = Result<ChannelSubscription, ChannelError>> + Send;
}

/// A live, cancellable stream of frames for one session.
///
/// Dropping the subscription cancels the underlying connection task.
#[derive(Debug)]
pub struct ChannelSubscription {
    frames: mpsc::Receiver<ChannelFrame>,
    token: CancellationToken,
}

impl ChannelSubscription {
    /// Build a subscription from the connector's frame stream and its
    /// cancellation token.
    pub fn new(frames: mpsc::Receiver<ChannelFrame>, token: CancellationToken) -> Self {
        Self { frames, token }
    }

    /// Receive the next frame. Returns `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ChannelFrame> {
        self.frames.recv().await
    }

    /// Tear the subscription down.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The visitor identity persistence collaborator.
///
/// Opaque beyond "read current value" and "store new value": the id is read
/// at session start and rewritten whenever the server issues a new one.
pub trait VisitorStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<VisitorId>, IdentityError>;
    fn store(&self, visitor_id: &VisitorId) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_recv_yields_queued_frames_then_none() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = ChannelSubscription::new(rx, CancellationToken::new());

        tx.send(ChannelFrame::ChatReceive {
            chat_id: ChatId::new("c1"),
            question: "q".to_string(),
            answer: "a".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn drop_cancels_token() {
        let (_tx, rx) = mpsc::channel::<ChannelFrame>(1);
        let token = CancellationToken::new();
        let sub = ChannelSubscription::new(rx, token.clone());
        assert!(!token.is_cancelled());
        drop(sub);
        assert!(token.is_cancelled());
    }
}
