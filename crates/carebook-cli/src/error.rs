//! Client error types.

use std::fmt;

use carebook_api::ApiError;
use carebook_core::TracingError;
use carebook_session::SessionError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// The scheduling API failed.
    Api(ApiError),
    /// The booking session rejected a step.
    Session(SessionError),
    /// A provider, type, date or time named on the command line was not offered.
    NotFound(String),
    /// IO error.
    Io(std::io::Error),
    /// Logging could not be set up.
    Tracing(TracingError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Api(err) => write!(f, "{}", err.user_message()),
            Self::Session(err) => write!(f, "{}", err.user_message()),
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Tracing(err) => write!(f, "logging setup failed: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Tracing(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<TracingError> for ClientError {
    fn from(err: TracingError) -> Self {
        Self::Tracing(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_session::ValidationError;

    #[test]
    fn session_errors_show_user_message() {
        let err = ClientError::from(SessionError::from(ValidationError::ProviderRequired));
        assert_eq!(err.to_string(), "Please choose a provider.");
    }

    #[test]
    fn config_errors_are_prefixed() {
        let err = ClientError::Config("bad".to_string());
        assert_eq!(err.to_string(), "configuration error: bad");
    }
}
