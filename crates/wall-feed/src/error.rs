/// Everything that can go wrong on the client side.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Caught before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// The server refused the request; carries its `error` text.
    #[error("{0}")]
    Rejected(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid stored data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FeedError {
    /// Text suitable for showing next to the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Rejected(msg) => msg.clone(),
            _ => "Failed to submit message".into(),
        }
    }
}
