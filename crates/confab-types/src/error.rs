use thiserror::Error;

/// Errors from calls to the chat HTTP API.
///
/// `Transport` covers failures below the application layer (connect, DNS,
/// timeout, malformed body). `Application` means the server answered but
/// signalled failure through the response envelope. Both recover the same
/// way -- the pending item is finalized with the local error text and the
/// user is notified -- but `Application` carries the server's message.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("application error: {}", .message.as_deref().unwrap_or("unspecified"))]
    Application { message: Option<String> },
}

impl ApiError {
    /// The server-provided message, when there is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Transport(_) => None,
            ApiError::Application { message } => message.as_deref(),
        }
    }
}

/// Errors from the realtime channel connector.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("invalid realtime url: {0}")]
    InvalidUrl(String),

    #[error("realtime connect failed: {0}")]
    Connect(String),

    #[error("realtime connect timed out")]
    Timeout,
}

/// Errors from the visitor identity store.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("identity storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_display() {
        let err = ApiError::Application {
            message: Some("chat not found".to_string()),
        };
        assert_eq!(err.to_string(), "application error: chat not found");
        assert_eq!(err.server_message(), Some("chat not found"));
    }

    #[test]
    fn test_application_error_without_message() {
        let err = ApiError::Application { message: None };
        assert_eq!(err.to_string(), "application error: unspecified");
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_transport_error_has_no_server_message() {
        let err = ApiError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.server_message(), None);
    }
}
