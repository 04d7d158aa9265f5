use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response. `message` is the server's `error` field when present.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("event stream closed")]
    StreamClosed,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
