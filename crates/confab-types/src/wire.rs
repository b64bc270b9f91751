//! Wire payloads exchanged with the chat server.
//!
//! Every HTTP response is wrapped in a consistent envelope:
//! ```json
//! { "Code": 1, "Message": "...", "Data": { ... } }
//! ```
//! `Code == 1` is success; any other value is a recoverable application
//! error whose `Message` is surfaced to the user. The realtime channel
//! carries JSON text frames tagged by an `event` field.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatItem, Rating};
use crate::error::ApiError;
use crate::ids::{ChatId, ItemId, VisitorId};

/// The envelope code signalling success.
pub const SUCCESS_CODE: i32 = 1;

/// Response envelope wrapping all API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "Code")]
    pub code: i32,
    #[serde(
        rename = "Message",
        default = "Option::default",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    #[serde(
        rename = "Data",
        default = "Option::default",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwrap the payload, mapping non-success codes (and success envelopes
    /// that carry no payload) to [`ApiError::Application`].
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.is_success() {
            self.data.ok_or(ApiError::Application {
                message: Some("response envelope carried no data".to_string()),
            })
        } else {
            Err(ApiError::Application {
                message: self.message,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `POST /chats` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<VisitorId>,
}

/// `POST /chatbot/chat` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<VisitorId>,
}

/// `POST /feedbacks` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub history_id: ItemId,
    pub rating: Rating,
    pub comment: String,
}

/// `PUT /feedbacks/{id}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFeedbackRequest {
    pub rating: Rating,
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// `Data` of the conversation-creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedChat {
    #[serde(rename = "_id")]
    pub id: ChatId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "visitorId", default)]
    pub visitor_id: Option<VisitorId>,
}

/// Conversation metadata within a history response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ChatId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Pagination cursor within a history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub has_more: bool,
}

/// `Data` of the paginated history response. Items arrive newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryData {
    #[serde(default)]
    pub chat: ChatSummary,
    pub pagination: Pagination,
    pub items: Vec<ChatItem>,
}

/// `Data` of the send response and of the realtime send acknowledgment.
///
/// Every field is optional on the wire; reconciliation treats each
/// independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendData {
    #[serde(default)]
    pub history_id: Option<ItemId>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub visitor_id: Option<VisitorId>,
}

// ---------------------------------------------------------------------------
// Realtime channel frames
// ---------------------------------------------------------------------------

/// A frame received on the realtime channel, tagged by its `event` field.
///
/// Unknown events are rejected at parse time and logged by the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ChannelFrame {
    /// A server-pushed question/answer pair for a conversation.
    #[serde(rename = "chat:receive", rename_all = "camelCase")]
    ChatReceive {
        chat_id: ChatId,
        question: String,
        answer: String,
    },
    /// The acknowledgment of a locally issued send.
    #[serde(rename = "chat:response")]
    ChatResponse(Envelope<SendData>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_roundtrip() {
        let json = r#"{"Code":1,"Message":"OK","Data":{"_id":"c1","name":"Tuyển sinh","visitorId":"v1"}}"#;
        let env: Envelope<CreatedChat> = serde_json::from_str(json).unwrap();
        assert!(env.is_success());
        let created = env.into_result().unwrap();
        assert_eq!(created.id.as_str(), "c1");
        assert_eq!(created.visitor_id.as_ref().unwrap().as_str(), "v1");
    }

    #[test]
    fn test_envelope_failure_carries_message() {
        let json = r#"{"Code":0,"Message":"chat not found"}"#;
        let env: Envelope<CreatedChat> = serde_json::from_str(json).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.server_message(), Some("chat not found"));
    }

    #[test]
    fn test_envelope_success_without_data_is_error() {
        let json = r#"{"Code":1}"#;
        let env: Envelope<SendData> = serde_json::from_str(json).unwrap();
        assert!(env.into_result().is_err());
    }

    #[test]
    fn test_history_data_shape() {
        let json = r#"{
            "chat": {"_id": "c1", "name": "Tuyển sinh 2025"},
            "pagination": {"hasMore": true},
            "items": [
                {"_id": "h2", "question": "q2", "answer": "a2", "createdAt": "2025-06-01T08:31:00Z"},
                {"_id": "h1", "question": "q1", "answer": "a1", "createdAt": "2025-06-01T08:30:00Z"}
            ]
        }"#;
        let data: HistoryData = serde_json::from_str(json).unwrap();
        assert!(data.pagination.has_more);
        assert_eq!(data.chat.name.as_deref(), Some("Tuyển sinh 2025"));
        // Newest-first on the wire; the reducer reverses.
        assert_eq!(data.items[0].id.as_str(), "h2");
    }

    #[test]
    fn test_send_data_all_fields_optional() {
        let data: SendData = serde_json::from_str("{}").unwrap();
        assert!(data.history_id.is_none());
        assert!(data.answer.is_none());

        let data: SendData =
            serde_json::from_str(r#"{"historyId":"h1","answer":"a","chatId":"c1"}"#).unwrap();
        assert_eq!(data.history_id.unwrap().as_str(), "h1");
        assert_eq!(data.chat_id.unwrap().as_str(), "c1");
    }

    #[test]
    fn test_channel_frame_receive() {
        let json = r#"{"event":"chat:receive","chatId":"c1","question":"q","answer":"a"}"#;
        let frame: ChannelFrame = serde_json::from_str(json).unwrap();
        match frame {
            ChannelFrame::ChatReceive { chat_id, question, answer } => {
                assert_eq!(chat_id.as_str(), "c1");
                assert_eq!(question, "q");
                assert_eq!(answer, "a");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_channel_frame_response() {
        let json = r#"{"event":"chat:response","Code":1,"Data":{"historyId":"h1","answer":"a"}}"#;
        let frame: ChannelFrame = serde_json::from_str(json).unwrap();
        match frame {
            ChannelFrame::ChatResponse(env) => {
                let data = env.into_result().unwrap();
                assert_eq!(data.history_id.unwrap().as_str(), "h1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_channel_frame_unknown_event_rejected() {
        let json = r#"{"event":"chat:typing","chatId":"c1"}"#;
        let frame: Result<ChannelFrame, _> = serde_json::from_str(json);
        assert!(frame.is_err());
    }
}
