use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// No credential from `--key` or the environment.
    #[error("No API key provided: pass --key or set {0}")]
    Configuration(&'static str),

    #[error("Failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Error reading from stream: {0}")]
    Transport(String),

    /// Recoverable: the stream keeps going after one of these.
    #[error("Malformed frame: {0}")]
    FrameDecode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChatError::FrameDecode(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
