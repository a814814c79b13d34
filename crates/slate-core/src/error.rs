use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Classified failures from the API client. The client never recovers
/// these; it classifies and rethrows, and callers decide what to swallow.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed input rejected by the server (400/422), with the
    /// message(s) extracted from the structured `detail` payload.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Missing, invalid or expired token, or bad credentials (401-class).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Referenced task or label absent, or not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// No response received at all.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-2xx response.
    #[error("server error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Classify a non-2xx response from its status code and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let messages = detail_messages(body);
        let message = |fallback: &str| {
            messages
                .first()
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };

        match status {
            401 | 403 => ClientError::Auth(message("invalid or expired credentials")),
            404 => ClientError::NotFound(message("resource not found")),
            400 | 422 => {
                if messages.is_empty() {
                    ClientError::Validation(vec!["request rejected by server".to_string()])
                } else {
                    ClientError::Validation(messages)
                }
            }
            _ => ClientError::Api {
                status,
                message: message("unexpected server response"),
            },
        }
    }
}

/// Extract human-readable messages from a FastAPI-style error body:
/// `{"detail": "..."}"` or `{"detail": [{"msg": "...", ...}, ...]}`.
fn detail_messages(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return vec![];
    };

    match value.get("detail") {
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Object(map) => map
                    .get("msg")
                    .and_then(Value::as_str)
                    .map(|msg| msg.to_string()),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}
