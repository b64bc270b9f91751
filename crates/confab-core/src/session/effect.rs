//! Effects returned by the session reducer.
//!
//! The reducer never performs IO; it describes what should happen next and
//! the controller interprets it -- spawning API calls, managing the channel
//! subscription and the playback slot, and forwarding view-facing effects.

use confab_types::chat::Rating;
use confab_types::ids::{ChatId, FeedbackId, ItemId, VisitorId};

/// Weight of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch one history page for the given conversation.
    FetchHistory { chat_id: ChatId, page: u32 },

    /// Run the send pipeline (creating the conversation first when none
    /// exists) for the question of the exchange just begun.
    DispatchSend { question: String },

    /// Create or update feedback through the HTTP collaborator.
    DispatchFeedback {
        item_id: ItemId,
        rating: Rating,
        comment: String,
        existing: Option<FeedbackId>,
    },

    /// Open the realtime subscription for this conversation.
    ConnectChannel { chat_id: ChatId },

    /// Tear down the current realtime subscription, if any.
    DisconnectChannel,

    /// Start the typewriter metronome for the playback just begun.
    StartPlayback,

    /// Cancel the typewriter metronome.
    StopPlayback,

    /// Persist a server-issued visitor identity.
    StoreVisitorId { visitor_id: VisitorId },

    /// View: stick the scroll position to the newest item once rendered.
    ScrollToBottom,

    /// View: `count` older items were prepended; compensate the scroll
    /// offset so the visual anchor does not jump.
    HistoryPrepended { count: usize },

    /// View: a conversation was created lazily for the first exchange.
    ConversationCreated { chat_id: ChatId },

    /// View: user-visible notification.
    Notify { severity: Severity, message: String },
}
