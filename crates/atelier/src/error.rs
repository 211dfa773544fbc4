use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Unified error taxonomy for the job lifecycle.
///
/// Remote jobs that finish unsuccessfully (moderation, "Task not found",
/// remote "Error") are not errors here; they are terminal
/// [`JobStatus`](crate::status::JobStatus) values returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Remote request failed with {status}: {body}")]
    RemoteRequest { status: StatusCode, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed result payload: {0}")]
    MalformedResult(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Status fetch failed: {0}")]
    PollTransport(String),

    #[error("Deadline of {0:?} exceeded while awaiting job completion")]
    DeadlineExceeded(Duration),

    #[error("Polling cancelled")]
    Cancelled,

    #[error("Registry storage error: {0}")]
    Storage(String),
}

fn describe_reqwest(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return "request timed out".to_string();
    }
    if error.is_connect() {
        if let Some(url) = error.url() {
            if let Some(host) = url.host_str() {
                return format!("could not connect to {}", host);
            }
        }
        return "could not connect to the remote host".to_string();
    }
    error.to_string()
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Network(describe_reqwest(&error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Storage(error.to_string())
    }
}

impl From<strum::ParseError> for Error {
    fn from(error: strum::ParseError) -> Self {
        Error::InvalidArgument(error.to_string())
    }
}

impl Error {
    /// Detail string used by poll-loop call sites that fold transport
    /// failures into [`Error::PollTransport`].
    pub(crate) fn transport_detail(error: &reqwest::Error) -> String {
        describe_reqwest(error)
    }
}
