//! Events consumed by the session reducer.
//!
//! Everything that can change session state arrives here: user commands
//! (already resolved to events by the controller, which stamps temporary
//! ids and timestamps so the reducer stays deterministic), HTTP
//! completions, realtime frames, and typewriter ticks.

use chrono::{DateTime, Utc};
use confab_types::chat::{Feedback, Rating};
use confab_types::error::ApiError;
use confab_types::ids::{ChatId, FeedbackId, ItemId};
use confab_types::wire::{CreatedChat, Envelope, HistoryData, SendData};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The externally supplied conversation identifier changed (navigation,
    /// view mount, or chat closed).
    ChatSwitched { chat_id: Option<ChatId> },

    /// A history page was requested (initial load or scroll trigger).
    HistoryRequested { page: u32 },

    /// A history fetch resolved. `chat_id` is the identifier the fetch was
    /// issued for; stale completions are discarded on mismatch.
    HistoryLoaded {
        chat_id: ChatId,
        page: u32,
        data: HistoryData,
    },

    /// A history fetch failed.
    HistoryFailed {
        chat_id: ChatId,
        page: u32,
        error: ApiError,
    },

    /// The user submitted a question.
    SendStarted {
        temp_id: ItemId,
        question: String,
        at: DateTime<Utc>,
    },

    /// The conversation-creation step of a no-session send resolved.
    ChatCreated { chat: CreatedChat },

    /// The send call resolved with the server's reply.
    SendCompleted { reply: SendData },

    /// The send call failed at the transport or application layer.
    SendFailed { error: ApiError },

    /// The realtime channel pushed an externally triggered exchange.
    BroadcastReceived {
        chat_id: ChatId,
        question: String,
        answer: String,
        temp_id: ItemId,
        at: DateTime<Utc>,
    },

    /// The realtime channel acknowledged the locally issued send.
    AckReceived { envelope: Envelope<SendData> },

    /// One typewriter reveal step.
    PlaybackTick,

    /// The user submitted (or edited) feedback on an answered item.
    FeedbackSubmitted {
        item_id: ItemId,
        rating: Rating,
        comment: String,
        existing: Option<FeedbackId>,
    },

    /// A feedback call resolved.
    FeedbackSaved {
        item_id: ItemId,
        feedback: Feedback,
        updated: bool,
    },

    /// A feedback call failed.
    FeedbackFailed { error: ApiError },
}
