use titlecast_core::StatusKind;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode lookup response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no metadata for {0}")]
    NotFound(String),

    #[error("no lookup strategy for {0} keys")]
    Unsupported(StatusKind),
}

pub type Result<T> = std::result::Result<T, LookupError>;
