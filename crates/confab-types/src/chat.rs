//! Chat item and feedback types for Confab.
//!
//! These types model one conversation between a visitor and the assistant
//! as an ordered list of question/answer items. Serde renames match the
//! server's wire field names so the same types serve as wire payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FeedbackId, ItemId};

/// A 1-5 star rating attached to feedback.
///
/// Values outside the 1-5 range are rejected at construction and at
/// deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Create a rating, rejecting values outside 1-5.
    pub fn new(value: u8) -> Result<Self, InvalidRating> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRating(value))
        }
    }

    /// The raw 1-5 value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Error for a rating outside the 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct InvalidRating(pub u8);

/// A visitor's rating and comment on a single answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: FeedbackId,
    pub rating: Rating,
    pub comment: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One question/answer exchange within a conversation.
///
/// `question` and `created_at` are immutable once the item exists. `answer`
/// starts empty for optimistic items, grows monotonically during typewriter
/// playback, then freezes. `id` transitions exactly once, from a temporary
/// id to the server-issued history id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatItem {
    #[serde(rename = "_id")]
    pub id: ItemId,
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(rename = "isFeedback", default)]
    pub is_feedback: bool,
}

impl ChatItem {
    /// Create an optimistic item: known question, empty answer, no feedback.
    pub fn optimistic(id: ItemId, question: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            question: question.into(),
            answer: String::new(),
            created_at,
            feedback: None,
            is_feedback: false,
        }
    }

    /// Attach or replace feedback, keeping `is_feedback` in sync.
    pub fn set_feedback(&mut self, feedback: Feedback) {
        self.feedback = Some(feedback);
        self.is_feedback = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        for v in 1..=5 {
            assert_eq!(Rating::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn test_rating_serde_rejects_out_of_range() {
        let parsed: Result<Rating, _> = serde_json::from_str("7");
        assert!(parsed.is_err());
        let parsed: Rating = serde_json::from_str("4").unwrap();
        assert_eq!(parsed.value(), 4);
    }

    #[test]
    fn test_chat_item_wire_shape() {
        let json = r#"{
            "_id": "665f1c2e9b1d8a0012345678",
            "question": "Điều kiện tuyển sinh?",
            "answer": "Xét tuyển theo học bạ.",
            "createdAt": "2025-06-01T08:30:00Z",
            "isFeedback": false
        }"#;
        let item: ChatItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "665f1c2e9b1d8a0012345678");
        assert!(item.feedback.is_none());
        assert!(!item.is_feedback);
    }

    #[test]
    fn test_chat_item_defaults_missing_fields() {
        // History items may omit answer, feedback, and isFeedback.
        let json = r#"{
            "_id": "h1",
            "question": "q",
            "createdAt": "2025-06-01T08:30:00Z"
        }"#;
        let item: ChatItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.answer, "");
        assert!(!item.is_feedback);
    }

    #[test]
    fn test_set_feedback_syncs_flag() {
        let mut item = ChatItem::optimistic(ItemId::temp(1), "q", Utc::now());
        item.set_feedback(Feedback {
            id: FeedbackId::new("f1"),
            rating: Rating::new(5).unwrap(),
            comment: "helpful".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        assert!(item.is_feedback);
        assert_eq!(item.feedback.as_ref().unwrap().rating.value(), 5);
    }
}
