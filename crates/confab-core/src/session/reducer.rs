//! The session reducer: `SessionState::apply(event) -> effects`.
//!
//! Transcribes every list mutation as a read-modify-write against current
//! state, so asynchronous completions can resolve in any order relative to
//! user actions. Completions carry the conversation id they were issued
//! for; the reducer discards stale ones instead of trusting the caller.

use confab_types::error::ApiError;
use confab_types::ids::ChatId;
use confab_types::wire::SendData;

use std::collections::HashSet;

use super::effect::{Effect, Severity};
use super::event::SessionEvent;
use super::state::{ExchangePhase, NO_ANSWER_TEXT, SEND_ERROR_TEXT, SessionState};

impl SessionState {
    /// Apply one event, returning the effects the controller must perform.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::ChatSwitched { chat_id } => self.on_chat_switched(chat_id),
            SessionEvent::HistoryRequested { page } => self.on_history_requested(page),
            SessionEvent::HistoryLoaded {
                chat_id,
                page,
                data,
            } => self.on_history_loaded(chat_id, page, data),
            SessionEvent::HistoryFailed {
                chat_id,
                page,
                error,
            } => self.on_history_failed(chat_id, page, error),
            SessionEvent::SendStarted {
                temp_id,
                question,
                at,
            } => self.on_send_started(temp_id, question, at),
            SessionEvent::ChatCreated { chat } => self.on_chat_created(chat),
            SessionEvent::SendCompleted { reply } => self.reconcile(reply),
            SessionEvent::SendFailed { error } => self.on_send_failed(error),
            SessionEvent::BroadcastReceived {
                chat_id,
                question,
                answer,
                temp_id,
                at,
            } => self.on_broadcast(chat_id, question, answer, temp_id, at),
            SessionEvent::AckReceived { envelope } => self.on_ack(envelope),
            SessionEvent::PlaybackTick => self.on_playback_tick(),
            SessionEvent::FeedbackSubmitted {
                item_id,
                rating,
                comment,
                existing,
            } => self.on_feedback_submitted(item_id, rating, comment, existing),
            SessionEvent::FeedbackSaved {
                item_id,
                feedback,
                updated,
            } => self.on_feedback_saved(item_id, feedback, updated),
            SessionEvent::FeedbackFailed { error } => self.on_feedback_failed(error),
        }
    }

    // --- Session identity ---

    fn on_chat_switched(&mut self, chat_id: Option<ChatId>) -> Vec<Effect> {
        if chat_id == self.chat_id {
            return Vec::new();
        }
        tracing::info!(
            from = self.chat_id.as_ref().map(|c| c.as_str()),
            to = chat_id.as_ref().map(|c| c.as_str()),
            "conversation switched, resetting session"
        );

        // Teardown in cancellation order: channel first, then playback.
        // In-flight fetches are allowed to complete; their completion
        // events carry the old id and will be discarded.
        let mut effects = vec![Effect::DisconnectChannel, Effect::StopPlayback];
        *self = SessionState::new(chat_id);
        if let Some(chat_id) = self.chat_id.clone() {
            self.loading_initial = true;
            effects.push(Effect::ConnectChannel {
                chat_id: chat_id.clone(),
            });
            effects.push(Effect::FetchHistory { chat_id, page: 1 });
        }
        effects
    }

    fn on_chat_created(&mut self, chat: confab_types::wire::CreatedChat) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(visitor_id) = chat.visitor_id {
            effects.push(Effect::StoreVisitorId { visitor_id });
        }
        if Some(&chat.id) != self.chat_id.as_ref() {
            self.promote(chat.id, chat.name, &mut effects);
        } else if chat.name.is_some() {
            self.chat_name = chat.name;
        }
        effects
    }

    /// Adopt a newly created conversation identifier without clearing the
    /// list: the in-progress exchange belongs to the new session. The
    /// channel is resubscribed atomically (teardown before connect).
    fn promote(&mut self, chat_id: ChatId, name: Option<String>, effects: &mut Vec<Effect>) {
        tracing::info!(chat_id = %chat_id, "adopting newly created conversation");
        effects.push(Effect::DisconnectChannel);
        effects.push(Effect::ConnectChannel {
            chat_id: chat_id.clone(),
        });
        effects.push(Effect::ConversationCreated {
            chat_id: chat_id.clone(),
        });
        self.chat_id = Some(chat_id);
        if name.is_some() {
            self.chat_name = name;
        }
    }

    // --- History pagination ---

    fn on_history_requested(&mut self, page: u32) -> Vec<Effect> {
        let Some(chat_id) = self.chat_id.clone() else {
            tracing::debug!("history requested with no conversation");
            return Vec::new();
        };
        if self.history_in_flight() {
            tracing::debug!(page, "history fetch already in flight");
            return Vec::new();
        }
        if page > 1 && !self.has_more {
            return Vec::new();
        }
        if page == 1 {
            self.loading_initial = true;
        } else {
            self.loading_more = true;
        }
        vec![Effect::FetchHistory { chat_id, page }]
    }

    fn on_history_loaded(
        &mut self,
        chat_id: ChatId,
        page: u32,
        data: confab_types::wire::HistoryData,
    ) -> Vec<Effect> {
        if Some(&chat_id) != self.chat_id.as_ref() {
            tracing::debug!(chat_id = %chat_id, "discarding history for inactive conversation");
            return Vec::new();
        }
        self.loading_initial = false;
        self.loading_more = false;
        self.has_more = data.pagination.has_more;
        if data.chat.name.is_some() {
            self.chat_name = data.chat.name;
        }

        // The server returns newest-first; the list is oldest-first.
        let mut incoming = data.items;
        incoming.reverse();
        let count = incoming.len();
        tracing::info!(page, count, "history page loaded");

        self.page = page;
        if page == 1 {
            self.items = incoming;
            vec![Effect::ScrollToBottom]
        } else {
            let present: HashSet<_> = self.items.iter().map(|item| item.id.clone()).collect();
            incoming.retain(|item| !present.contains(&item.id));
            let count = incoming.len();
            incoming.append(&mut self.items);
            self.items = incoming;
            vec![Effect::HistoryPrepended { count }]
        }
    }

    fn on_history_failed(&mut self, chat_id: ChatId, page: u32, error: ApiError) -> Vec<Effect> {
        if Some(&chat_id) != self.chat_id.as_ref() {
            tracing::debug!(chat_id = %chat_id, "discarding failed history for inactive conversation");
            return Vec::new();
        }
        tracing::warn!(page, error = %error, "history fetch failed");
        self.loading_initial = false;
        self.loading_more = false;
        vec![Effect::Notify {
            severity: Severity::Error,
            message: "Unable to load chat history.".to_string(),
        }]
    }

    // --- Pending exchange ---

    fn on_send_started(
        &mut self,
        temp_id: confab_types::ids::ItemId,
        question: String,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Vec<Effect> {
        if question.trim().is_empty() {
            return Vec::new();
        }
        if !self.phase.is_idle() {
            tracing::warn!("send rejected: an exchange is already in flight");
            return Vec::new();
        }
        self.items.push(confab_types::chat::ChatItem::optimistic(
            temp_id.clone(),
            question.clone(),
            at,
        ));
        self.phase = ExchangePhase::Pending { id: temp_id };
        vec![Effect::DispatchSend { question }, Effect::ScrollToBottom]
    }

    /// Route a successful send reply (HTTP or realtime ack) into the list.
    fn reconcile(&mut self, reply: SendData) -> Vec<Effect> {
        let ExchangePhase::Pending { id: pending } = self.phase.clone() else {
            tracing::warn!("discarding reply with no pending exchange");
            return Vec::new();
        };
        let mut effects = Vec::new();

        if let Some(visitor_id) = reply.visitor_id {
            effects.push(Effect::StoreVisitorId { visitor_id });
        }

        if let Some(chat_id) = reply.chat_id
            && Some(&chat_id) != self.chat_id.as_ref()
        {
            self.promote(chat_id, None, &mut effects);
        }

        // Rewrite the optimistic item to its server id so subsequent
        // typewriter frames target the correct entry.
        let target = match reply.history_id {
            Some(server_id) => {
                tracing::debug!(from = %pending, to = %server_id, "reconciling item id");
                for item in &mut self.items {
                    if item.id == pending {
                        item.id = server_id.clone();
                    }
                }
                server_id
            }
            None => pending,
        };

        match reply.answer {
            Some(answer) if !answer.is_empty() => {
                self.typing_buffer.clear();
                self.phase = ExchangePhase::Playing {
                    id: target,
                    answer,
                    revealed: 0,
                };
                effects.push(Effect::StartPlayback);
            }
            _ => {
                tracing::warn!(item = %target, "reply carried no answer");
                self.phase = ExchangePhase::Pending { id: target };
                self.finalize_pending(NO_ANSWER_TEXT);
            }
        }
        effects
    }

    fn on_send_failed(&mut self, error: ApiError) -> Vec<Effect> {
        if !matches!(self.phase, ExchangePhase::Pending { .. }) {
            tracing::warn!(error = %error, "discarding send failure with no pending exchange");
            return Vec::new();
        }
        tracing::warn!(error = %error, "send failed");
        self.finalize_pending(SEND_ERROR_TEXT);
        let message = error
            .server_message()
            .unwrap_or("Unable to send message. Please try again.")
            .to_string();
        vec![Effect::Notify {
            severity: Severity::Error,
            message,
        }]
    }

    /// Write `text` into the pending item's answer and free the slot. The
    /// failed or answerless exchange stays visible; items are never removed.
    fn finalize_pending(&mut self, text: &str) {
        if let Some(id) = self.phase.active_id().cloned() {
            if let Some(item) = self.item_mut(&id) {
                item.answer = text.to_string();
            }
        }
        self.phase = ExchangePhase::Idle;
        self.typing_buffer.clear();
    }

    // --- Realtime channel ---

    fn on_broadcast(
        &mut self,
        chat_id: ChatId,
        question: String,
        answer: String,
        temp_id: confab_types::ids::ItemId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Vec<Effect> {
        if Some(&chat_id) != self.chat_id.as_ref() {
            tracing::debug!(chat_id = %chat_id, "discarding broadcast for inactive conversation");
            return Vec::new();
        }
        if !self.phase.is_idle() {
            tracing::warn!("broadcast rejected: an exchange is already in flight");
            return Vec::new();
        }
        self.items.push(confab_types::chat::ChatItem::optimistic(
            temp_id.clone(),
            question,
            at,
        ));
        if answer.is_empty() {
            self.phase = ExchangePhase::Pending { id: temp_id };
            self.finalize_pending(NO_ANSWER_TEXT);
            return vec![Effect::ScrollToBottom];
        }
        self.typing_buffer.clear();
        self.phase = ExchangePhase::Playing {
            id: temp_id,
            answer,
            revealed: 0,
        };
        vec![Effect::StartPlayback, Effect::ScrollToBottom]
    }

    fn on_ack(&mut self, envelope: confab_types::wire::Envelope<SendData>) -> Vec<Effect> {
        if !matches!(self.phase, ExchangePhase::Pending { .. }) {
            tracing::warn!("discarding acknowledgment with no pending exchange");
            return Vec::new();
        }
        match envelope.into_result() {
            Ok(reply) => self.reconcile(reply),
            Err(error) => self.on_send_failed(error),
        }
    }

    // --- Typewriter playback ---

    fn on_playback_tick(&mut self) -> Vec<Effect> {
        let (id, prefix, done) = match &mut self.phase {
            ExchangePhase::Playing {
                id,
                answer,
                revealed,
            } => {
                // One Unicode scalar per tick; `revealed` stays on a
                // character boundary.
                if let Some(next) = answer[*revealed..].chars().next() {
                    *revealed += next.len_utf8();
                }
                (
                    id.clone(),
                    answer[..*revealed].to_string(),
                    *revealed >= answer.len(),
                )
            }
            _ => {
                tracing::debug!("discarding playback tick with no active playback");
                return Vec::new();
            }
        };

        // A reset mid-playback may have removed the target; the mutation is
        // a no-op but playback still terminates and clears its own state.
        if let Some(item) = self.item_mut(&id) {
            item.answer = prefix.clone();
        }
        if done {
            self.typing_buffer.clear();
            self.phase = ExchangePhase::Idle;
            vec![Effect::StopPlayback]
        } else {
            self.typing_buffer = prefix;
            Vec::new()
        }
    }

    // --- Feedback ---

    fn on_feedback_submitted(
        &mut self,
        item_id: confab_types::ids::ItemId,
        rating: confab_types::chat::Rating,
        comment: String,
        existing: Option<confab_types::ids::FeedbackId>,
    ) -> Vec<Effect> {
        if item_id.is_temp() {
            tracing::warn!(item = %item_id, "feedback rejected for unreconciled item");
            return Vec::new();
        }
        vec![Effect::DispatchFeedback {
            item_id,
            rating,
            comment,
            existing,
        }]
    }

    fn on_feedback_saved(
        &mut self,
        item_id: confab_types::ids::ItemId,
        feedback: confab_types::chat::Feedback,
        updated: bool,
    ) -> Vec<Effect> {
        match self.item_mut(&item_id) {
            Some(item) => item.set_feedback(feedback),
            None => {
                tracing::warn!(item = %item_id, "feedback saved for item no longer in list");
                return Vec::new();
            }
        }
        let message = if updated {
            "Feedback updated."
        } else {
            "Thanks for your feedback!"
        };
        vec![Effect::Notify {
            severity: Severity::Success,
            message: message.to_string(),
        }]
    }

    fn on_feedback_failed(&mut self, error: ApiError) -> Vec<Effect> {
        tracing::warn!(error = %error, "feedback submission failed");
        let message = error
            .server_message()
            .unwrap_or("Unable to submit feedback. Please try again.")
            .to_string();
        vec![Effect::Notify {
            severity: Severity::Error,
            message,
        }]
    }
}
