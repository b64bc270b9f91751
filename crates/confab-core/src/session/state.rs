//! Observable state of one chat session.

use confab_types::chat::ChatItem;
use confab_types::ids::{ChatId, ItemId};

use std::time::Duration;

/// History page size requested from the server.
pub const PAGE_SIZE: u32 = 5;

/// Distance from the top of the scroll area (in view units) under which the
/// next history page is requested.
pub const TOP_SCROLL_THRESHOLD: f32 = 20.0;

/// Delay between typewriter reveal steps.
pub const TYPEWRITER_INTERVAL: Duration = Duration::from_millis(20);

/// Answer text written into an item whose exchange failed.
pub const SEND_ERROR_TEXT: &str = "Something went wrong, please try again later.";

/// Answer text written into an item whose exchange succeeded with no answer.
pub const NO_ANSWER_TEXT: &str =
    "Sorry, there is no answer available for this question right now.";

/// Longest conversation name derived from the first question.
pub const CHAT_NAME_LIMIT: usize = 50;

/// The single-slot exchange state machine.
///
/// At most one exchange is in flight per session: `Idle -> Pending ->
/// Playing -> Idle`. A second send while not `Idle` is rejected rather than
/// overwriting the slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangePhase {
    /// No exchange in flight.
    Idle,
    /// A question is out and awaiting its answer. `id` is the optimistic
    /// item's identifier: temporary until reconciliation, server-issued
    /// after.
    Pending { id: ItemId },
    /// The answer is known and being revealed. `revealed` is a byte offset
    /// into `answer`, always on a character boundary.
    Playing {
        id: ItemId,
        answer: String,
        revealed: usize,
    },
}

impl ExchangePhase {
    /// Whether the slot is free for a new exchange.
    pub fn is_idle(&self) -> bool {
        matches!(self, ExchangePhase::Idle)
    }

    /// The item id currently occupying the slot, if any.
    pub fn active_id(&self) -> Option<&ItemId> {
        match self {
            ExchangePhase::Idle => None,
            ExchangePhase::Pending { id } | ExchangePhase::Playing { id, .. } => Some(id),
        }
    }
}

/// All observable state of one conversation.
///
/// The item list is ordered ascending by arrival (oldest first): pagination
/// prepends strictly-older pages, live arrivals append. Ids are unique
/// within the list at any instant.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// `None` until a conversation exists (pre-creation).
    pub chat_id: Option<ChatId>,
    /// Server-reported conversation name, from history or creation replies.
    pub chat_name: Option<String>,
    pub items: Vec<ChatItem>,
    /// Last successfully loaded history page; 0 before any load.
    pub page: u32,
    pub has_more: bool,
    pub loading_initial: bool,
    pub loading_more: bool,
    pub phase: ExchangePhase,
    /// Revealed prefix of the answer being played back; empty when idle.
    pub typing_buffer: String,
}

impl SessionState {
    /// Fresh state for a (possibly absent) conversation identifier.
    pub fn new(chat_id: Option<ChatId>) -> Self {
        Self {
            chat_id,
            chat_name: None,
            items: Vec::new(),
            page: 0,
            has_more: true,
            loading_initial: false,
            loading_more: false,
            phase: ExchangePhase::Idle,
            typing_buffer: String::new(),
        }
    }

    /// Whether the assistant is occupied with an exchange ("bot typing").
    pub fn is_busy(&self) -> bool {
        !self.phase.is_idle()
    }

    /// Whether a history fetch is already in flight.
    pub fn history_in_flight(&self) -> bool {
        self.loading_initial || self.loading_more
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut ChatItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = SessionState::new(Some(ChatId::new("c1")));
        assert_eq!(state.page, 0);
        assert!(state.has_more);
        assert!(!state.is_busy());
        assert!(!state.history_in_flight());
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_active_id_per_phase() {
        assert_eq!(ExchangePhase::Idle.active_id(), None);
        let pending = ExchangePhase::Pending {
            id: ItemId::temp(1),
        };
        assert_eq!(pending.active_id(), Some(&ItemId::temp(1)));
        let playing = ExchangePhase::Playing {
            id: ItemId::new("h1"),
            answer: "a".to_string(),
            revealed: 0,
        };
        assert_eq!(playing.active_id(), Some(&ItemId::new("h1")));
    }
}
