use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by the portal API client.
///
/// Cloneable so that callers coalesced onto one in-flight request can all
/// receive the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    /// Rejected before anything was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shape of error bodies returned by the portal functions.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull a human-readable message out of a non-2xx response body.
    ///
    /// Prefers the JSON `error` field, then `message`, then a generic
    /// "Request failed with status N".
    pub fn server_message(status: u16, body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .filter(|m| !m.trim().is_empty())
            .map(|m| Self::truncate_body(&m))
            .unwrap_or_else(|| format!("Request failed with status {}", status))
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::server_message(status, body);
        match status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Status { status, message },
        }
    }

    /// Stable category for callers that branch on error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => "NETWORK_ERROR",
            ApiError::InvalidResponse(_) => "PARSE_ERROR",
            ApiError::NotAuthenticated => "AUTH_ERROR",
            ApiError::InvalidRequest(_) => "VALIDATION_ERROR",
            _ => "API_ERROR",
        }
    }

    /// HTTP status code, for errors that came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) | ApiError::NotAuthenticated => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(_)
            | ApiError::Timeout(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidRequest(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Transport-level failure where no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}
