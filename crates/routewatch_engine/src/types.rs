use serde_json::Value;
use thiserror::Error;

/// Backend acknowledgement of a bulk submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAccepted {
    pub message: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusReply {
    Status(Value),
    /// 404: no active job on the server.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("could not read upload: {0}")]
    Io(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    /// The backend answered `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
