use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced to WebDriver clients.
///
/// Each variant maps to a legacy numeric status code carried in the JSON
/// envelope and to the HTTP status used on the transport. Only
/// `UnknownCommand`, `UnsupportedOperation` and `UnknownError` leave the
/// 200 range; everything else is a command-level failure the client reads
/// out of the body.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("no such session: {0}")]
    NoSuchSession(String),

    #[error("no such window: {0}")]
    NoSuchWindow(String),

    #[error("no such frame: {0}")]
    NoSuchFrame(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("stale element reference: {0}")]
    StaleElementReference(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("session not created: {0}")]
    SessionNotCreated(String),

    #[error("{message}")]
    Unexpected {
        message: String,
        stacktrace: Option<String>,
    },
}

pub type WireResult<T> = Result<T, WireError>;

impl WireError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        WireError::Unexpected {
            message: message.into(),
            stacktrace: None,
        }
    }

    /// Legacy JSON Wire Protocol status code carried in the response body.
    pub fn status(&self) -> u16 {
        match self {
            WireError::NoSuchSession(_) => 6,
            WireError::NoSuchElement(_) => 7,
            WireError::NoSuchFrame(_) => 8,
            WireError::UnknownCommand(_) => 9,
            WireError::UnsupportedOperation(_) => 9,
            WireError::StaleElementReference(_) => 10,
            WireError::Unexpected { .. } => 13,
            WireError::Timeout(_) => 21,
            WireError::NoSuchWindow(_) => 23,
            WireError::SessionNotCreated(_) => 33,
            WireError::InvalidArgument(_) => 61,
        }
    }

    /// Error class reported in `value.class`, for clients that match on the
    /// body rather than the numeric status.
    pub fn class(&self) -> &'static str {
        match self {
            WireError::NoSuchSession(_) => "no such session",
            WireError::NoSuchWindow(_) => "no such window",
            WireError::NoSuchFrame(_) => "no such frame",
            WireError::NoSuchElement(_) => "no such element",
            WireError::StaleElementReference(_) => "stale element reference",
            WireError::InvalidArgument(_) => "invalid argument",
            WireError::Timeout(_) => "timeout",
            WireError::UnknownCommand(_) => "unknown command",
            WireError::UnsupportedOperation(_) => "unsupported operation",
            WireError::SessionNotCreated(_) => "session not created",
            WireError::Unexpected { .. } => "unknown error",
        }
    }

    /// HTTP status on the transport. Command-level failures ride 200 with a
    /// non-zero body status; 404/405/500 are reserved for the transport
    /// classes.
    pub fn http_status(&self) -> u16 {
        match self {
            WireError::UnknownCommand(_) => 404,
            WireError::UnsupportedOperation(_) => 405,
            WireError::Unexpected { .. } => 500,
            _ => 200,
        }
    }

    pub fn stacktrace(&self) -> Option<&str> {
        match self {
            WireError::Unexpected { stacktrace, .. } => stacktrace.as_deref(),
            _ => None,
        }
    }
}

impl From<EngineError> for WireError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoSuchElement(msg) => WireError::NoSuchElement(msg),
            EngineError::StaleElement(msg) => WireError::StaleElementReference(msg),
            EngineError::NoSuchWindow(msg) => WireError::NoSuchWindow(msg),
            EngineError::NoSuchFrame(msg) => WireError::NoSuchFrame(msg),
            EngineError::Timeout(msg) => WireError::Timeout(msg),
            EngineError::InvalidSelector(msg) => WireError::InvalidArgument(msg),
            EngineError::Unsupported(msg) => WireError::UnsupportedOperation(msg),
            EngineError::Script { message, stacktrace } => WireError::Unexpected {
                message,
                stacktrace,
            },
            EngineError::Backend(msg) => WireError::Unexpected {
                message: msg,
                stacktrace: None,
            },
        }
    }
}
