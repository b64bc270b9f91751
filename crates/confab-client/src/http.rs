//! HTTP implementation of the [`ChatApi`] port.
//!
//! All endpoints return the `{Code, Message, Data}` envelope; responses are
//! unwrapped here so the engine only ever sees payloads or [`ApiError`].
//! No request timeout is set beyond the transport's own defaults -- the
//! send call in particular can be slow while the server generates an
//! answer.

use confab_core::ports::ChatApi;
use confab_types::chat::{Feedback, Rating};
use confab_types::error::ApiError;
use confab_types::ids::{ChatId, FeedbackId, ItemId, VisitorId};
use confab_types::wire::{
    CreateChatRequest, CreateFeedbackRequest, CreatedChat, Envelope, HistoryData, SendData,
    SendRequest, UpdateFeedbackRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Chat server client for one base URL (e.g. `http://localhost:4000/api`).
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        unwrap_envelope(response).await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        unwrap_envelope(response).await
    }
}

impl ChatApi for HttpChatApi {
    async fn create_chat(
        &self,
        name: &str,
        visitor_id: Option<&VisitorId>,
    ) -> Result<CreatedChat, ApiError> {
        self.post(
            "/chats",
            &CreateChatRequest {
                name: name.to_string(),
                visitor_id: visitor_id.cloned(),
            },
        )
        .await
    }

    async fn fetch_history(
        &self,
        chat_id: &ChatId,
        page: u32,
        size: u32,
        visitor_id: Option<&VisitorId>,
    ) -> Result<HistoryData, ApiError> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(visitor_id) = visitor_id {
            query.push(("visitorId", visitor_id.as_str().to_string()));
        }
        let response = self
            .client
            .get(self.url(&format!("/chatbot/history/{chat_id}")))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        unwrap_envelope(response).await
    }

    async fn send_question(
        &self,
        question: &str,
        chat_id: Option<&ChatId>,
        visitor_id: Option<&VisitorId>,
    ) -> Result<SendData, ApiError> {
        self.post(
            "/chatbot/chat",
            &SendRequest {
                question: question.to_string(),
                chat_id: chat_id.cloned(),
                visitor_id: visitor_id.cloned(),
            },
        )
        .await
    }

    async fn create_feedback(
        &self,
        history_id: &ItemId,
        rating: Rating,
        comment: &str,
    ) -> Result<Feedback, ApiError> {
        self.post(
            "/feedbacks",
            &CreateFeedbackRequest {
                history_id: history_id.clone(),
                rating,
                comment: comment.to_string(),
            },
        )
        .await
    }

    async fn update_feedback(
        &self,
        feedback_id: &FeedbackId,
        rating: Rating,
        comment: &str,
    ) -> Result<Feedback, ApiError> {
        self.put(
            &format!("/feedbacks/{feedback_id}"),
            &UpdateFeedbackRequest {
                rating,
                comment: comment.to_string(),
            },
        )
        .await
    }
}

fn transport(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

/// Decode the response body as an envelope and unwrap it.
async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let envelope: Envelope<T> = response.json().await.map_err(transport)?;
    envelope.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = HttpChatApi::new("http://localhost:4000/api/");
        assert_eq!(api.url("/chats"), "http://localhost:4000/api/chats");
    }

    #[test]
    fn test_history_url_embeds_chat_id() {
        let api = HttpChatApi::new("http://localhost:4000/api");
        let chat_id = ChatId::new("c1");
        assert_eq!(
            api.url(&format!("/chatbot/history/{chat_id}")),
            "http://localhost:4000/api/chatbot/history/c1"
        );
    }

    #[test]
    fn test_request_bodies_use_wire_names() {
        let body = SendRequest {
            question: "q".to_string(),
            chat_id: Some(ChatId::new("c1")),
            visitor_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["question"], "q");
        assert_eq!(json["chatId"], "c1");
        assert!(json.get("visitorId").is_none());
    }
}
