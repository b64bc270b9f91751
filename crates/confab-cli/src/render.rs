//! Line-oriented rendering of session snapshots and view events.
//!
//! The renderer diffs consecutive snapshots: freshly loaded history is
//! printed wholesale, appended questions as they arrive, and the typewriter
//! buffer incrementally (only the suffix not yet written, so the reveal
//! shows live in the terminal). Scroll imperatives have no meaning in a
//! line terminal and are reported as plain notices.

use confab_core::controller::{SessionSnapshot, ViewEvent};
use confab_core::session::Severity;
use confab_types::chat::ChatItem;

use std::io::Write;

#[derive(Default)]
pub struct Renderer {
    prev: Option<SessionSnapshot>,
    /// Portion of the live answer already written to the terminal.
    typed: String,
}

impl Renderer {
    pub fn on_view_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Notice { severity, message } => match severity {
                Severity::Error => println!("[error] {message}"),
                Severity::Success => println!("[ok] {message}"),
            },
            ViewEvent::ConversationCreated { chat_id } => {
                println!("(conversation created: {chat_id})");
            }
            ViewEvent::HistoryPrepended { count } => {
                println!("(loaded {count} older messages)");
            }
            // Nothing to anchor in a line terminal.
            ViewEvent::ScrollToBottom => {}
        }
    }

    pub fn on_snapshot(&mut self, snap: &SessionSnapshot) {
        let prev = self.prev.take();

        if let Some(prev) = &prev {
            if prev.loading_initial && !snap.loading_initial {
                self.print_history(snap);
            } else if appended(prev, snap) {
                if let Some(item) = snap.items.last() {
                    println!("you: {}", item.question);
                }
            }

            self.print_typing_delta(snap);

            if prev.typing && !snap.typing {
                self.finish_exchange(snap);
            }
        } else if !snap.loading_initial {
            self.print_history(snap);
        }

        self.prev = Some(snap.clone());
    }

    fn print_history(&mut self, snap: &SessionSnapshot) {
        if let Some(name) = &snap.chat_name {
            println!("=== {name} ===");
        }
        for item in &snap.items {
            print_item(item);
        }
    }

    /// Write the not-yet-printed suffix of the typing buffer.
    fn print_typing_delta(&mut self, snap: &SessionSnapshot) {
        if snap.typing_buffer.len() > self.typed.len()
            && snap.typing_buffer.starts_with(&self.typed)
        {
            if self.typed.is_empty() {
                print!("bot: ");
            }
            print!("{}", &snap.typing_buffer[self.typed.len()..]);
            let _ = std::io::stdout().flush();
            self.typed = snap.typing_buffer.clone();
        }
    }

    /// The exchange ended: emit whatever tail never went through the
    /// buffer (the final reveal step, or a full error/placeholder answer).
    fn finish_exchange(&mut self, snap: &SessionSnapshot) {
        if let Some(item) = snap.items.last() {
            if item.answer.starts_with(&self.typed) && item.answer.len() > self.typed.len() {
                if self.typed.is_empty() {
                    print!("bot: ");
                }
                print!("{}", &item.answer[self.typed.len()..]);
            }
        }
        println!();
        self.typed.clear();
    }
}

/// Whether `snap` grew by an item at the tail (send or broadcast), as
/// opposed to a prepend of older history.
fn appended(prev: &SessionSnapshot, snap: &SessionSnapshot) -> bool {
    snap.items.len() > prev.items.len()
        && snap.items.last().map(|item| &item.id) != prev.items.last().map(|item| &item.id)
}

fn print_item(item: &ChatItem) {
    println!("you: {}", item.question);
    if !item.answer.is_empty() {
        println!("bot: {}", item.answer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use confab_types::ids::ItemId;

    fn snap(items: Vec<ChatItem>) -> SessionSnapshot {
        SessionSnapshot {
            chat_id: None,
            chat_name: None,
            items,
            typing: false,
            typing_buffer: String::new(),
            loading_initial: false,
            loading_more: false,
            has_more: false,
            page: 1,
        }
    }

    fn item(id: &str) -> ChatItem {
        ChatItem::optimistic(ItemId::new(id), format!("q {id}"), Utc::now())
    }

    #[test]
    fn test_append_detection() {
        let base = snap(vec![item("h2"), item("h3")]);
        let appended_snap = snap(vec![item("h2"), item("h3"), item("h4")]);
        let prepended_snap = snap(vec![item("h1"), item("h2"), item("h3")]);
        assert!(appended(&base, &appended_snap));
        assert!(!appended(&base, &prepended_snap));
        assert!(!appended(&base, &base.clone()));
    }
}
