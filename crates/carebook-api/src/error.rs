//! Error types for scheduling API calls.
//!
//! Every remote failure is classified by an [`ApiErrorCode`] so the booking
//! flow can decide whether to offer a retry and what to tell the user.

use std::fmt;
use thiserror::Error;

/// The category of an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// Missing, invalid or expired credentials (401).
    Unauthorized,
    /// Authenticated but not allowed (403).
    Forbidden,
    /// Connection failed, timed out, DNS, etc.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// Server returned 5xx.
    ServerError,
    /// Response body could not be understood.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request rejected as malformed (400/422).
    BadRequest,
    /// Request conflicts with server state, e.g. the slot was just taken (409).
    Conflict,
    /// Client-side configuration is missing or invalid.
    Configuration,
    /// Unexpected internal state.
    Internal,
}

impl ApiErrorCode {
    /// Returns true if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Conflict => "conflict",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }

    /// Maps an HTTP status to a code. Returns `None` for success statuses.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 | 422 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            409 | 410 => Some(Self::Conflict),
            429 => Some(Self::RateLimited),
            500..=599 => Some(Self::ServerError),
            _ => Some(Self::InvalidResponse),
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the scheduling API.
#[derive(Debug, Error)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ApiErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// A copy without the source chain, for handing to several listeners.
    pub fn detached(&self) -> Self {
        Self::new(self.code, self.message.clone())
    }

    /// Text suitable for showing to a patient.
    pub fn user_message(&self) -> String {
        match self.code {
            ApiErrorCode::Unauthorized => "Your session has expired. Please sign in again.".into(),
            ApiErrorCode::Forbidden => "You are not allowed to do that.".into(),
            ApiErrorCode::NetworkError => {
                "Could not reach the server. Check your connection and try again.".into()
            }
            ApiErrorCode::RateLimited => "Too many requests. Please wait a moment and retry.".into(),
            ApiErrorCode::ServerError => "The server had a problem. Please try again.".into(),
            ApiErrorCode::Conflict => {
                "That time is no longer available. Please pick another slot.".into()
            }
            ApiErrorCode::NotFound => "The requested item could not be found.".into(),
            ApiErrorCode::BadRequest => format!("The request was rejected: {}", self.message),
            ApiErrorCode::InvalidResponse
            | ApiErrorCode::Configuration
            | ApiErrorCode::Internal => format!("Something went wrong: {}", self.message),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Clone for ApiError {
    fn clone(&self) -> Self {
        self.detached()
    }
}

impl PartialEq for ApiError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

/// A specialized Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(ApiErrorCode::NetworkError.is_retryable());
        assert!(ApiErrorCode::RateLimited.is_retryable());
        assert!(ApiErrorCode::ServerError.is_retryable());
        assert!(!ApiErrorCode::Conflict.is_retryable());
        assert!(!ApiErrorCode::Unauthorized.is_retryable());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiErrorCode::from_status(200), None);
        assert_eq!(ApiErrorCode::from_status(201), None);
        assert_eq!(ApiErrorCode::from_status(401), Some(ApiErrorCode::Unauthorized));
        assert_eq!(ApiErrorCode::from_status(409), Some(ApiErrorCode::Conflict));
        assert_eq!(ApiErrorCode::from_status(422), Some(ApiErrorCode::BadRequest));
        assert_eq!(ApiErrorCode::from_status(503), Some(ApiErrorCode::ServerError));
        assert_eq!(ApiErrorCode::from_status(302), Some(ApiErrorCode::InvalidResponse));
    }

    #[test]
    fn display_includes_code() {
        let err = ApiError::conflict("slot taken");
        assert_eq!(err.to_string(), "conflict: slot taken");
        assert!(err.user_message().contains("no longer available"));
    }

    #[test]
    fn source_is_kept_but_not_cloned() {
        use std::error::Error;
        let err = ApiError::network("reset").with_source(std::io::Error::other("eof"));
        assert!(err.source().is_some());
        let copy = err.clone();
        assert!(copy.source().is_none());
        assert_eq!(copy, err);
    }
}
