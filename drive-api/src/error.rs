use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Main error type for the drive API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Session missing or expired (401)
    #[error("Session expired: {0}")]
    Unauthorized(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Build an error from a failed response's status code and raw body
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .or(parsed.msg)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("request failed with status {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        if status == 401 {
            ApiError::Unauthorized(message)
        } else {
            ApiError::Status { status, message }
        }
    }

    /// Check if this error requires login
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            ApiError::RequestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_message_field() {
        let err = ApiError::from_status(400, r#"{"message":"Folder name required"}"#);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Folder name required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_falls_back_to_raw_body() {
        let err = ApiError::from_status(502, "Bad Gateway");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_status_empty_body() {
        let err = ApiError::from_status(404, "");
        assert_eq!(err.to_string(), "HTTP 404: request failed with status 404");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unauthorized_requires_login() {
        let err = ApiError::from_status(401, r#"{"error":"jwt expired"}"#);
        assert!(err.requires_login());
        assert_eq!(err.to_string(), "Session expired: jwt expired");
    }

    #[test]
    fn test_rate_limit_is_transient() {
        assert!(ApiError::from_status(429, "").is_transient());
        assert!(!ApiError::Other("boom".into()).is_transient());
    }
}
