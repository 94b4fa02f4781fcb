use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response missing {0}")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, FeedError>;
