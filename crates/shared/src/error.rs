use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request never produced an HTTP response.
    Transport,
    Unauthorized,
    /// HTTP 403 for an unpaid account.
    PaymentRequired,
    /// HTTP 403 with `is_locked` set: the lesson or test is not open yet.
    Locked,
    NotFound,
    Http,
    MalformedResponse,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::PaymentRequired,
            404 => ErrorCode::NotFound,
            _ => ErrorCode::Http,
        }
    }

    /// Authorization and entitlement failures redirect or prompt; everything
    /// else is rendered inline with a retry button.
    pub fn blocks_page(self) -> bool {
        matches!(self, ErrorCode::Unauthorized | ErrorCode::PaymentRequired)
    }
}

/// Error body returned by the backend next to a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
}

#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, body: Option<ApiError>) -> Self {
        let locked = body.as_ref().is_some_and(|body| body.is_locked);
        let code = match ErrorCode::from_status(status) {
            ErrorCode::PaymentRequired if locked => ErrorCode::Locked,
            code => code,
        };
        let message = match (code, body.and_then(|body| body.error)) {
            (_, Some(message)) => message,
            (ErrorCode::Unauthorized, None) => "Не авторизован".to_string(),
            (ErrorCode::PaymentRequired, None) => "Доступ запрещен".to_string(),
            (_, None) => format!("HTTP error! status: {status}"),
        };
        Self {
            code,
            status: Some(status),
            message,
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::Transport, err.to_string())
    }

    pub fn malformed(what: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::MalformedResponse, what.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::PaymentRequired);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(502), ErrorCode::Http);
    }

    #[test]
    fn server_message_wins_over_default_text() {
        let err = ApiException::from_status(
            403,
            Some(ApiError {
                error: Some("Урок заблокирован".into()),
                is_locked: true,
            }),
        );
        assert_eq!(err.code, ErrorCode::Locked);
        assert_eq!(err.message, "Урок заблокирован");
        assert_eq!(err.status, Some(403));

        let err = ApiException::from_status(500, None);
        assert_eq!(err.message, "HTTP error! status: 500");
    }
}
