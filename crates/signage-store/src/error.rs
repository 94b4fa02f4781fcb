use thiserror::Error;

/// Message fragments the Sheets API uses when a caller exceeds its quota.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "RATE_LIMIT_EXCEEDED",
    "rateLimitExceeded",
    "Quota exceeded",
    "RESOURCE_EXHAUSTED",
];

#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote store refused the call because of quota. The only retryable
    /// class.
    #[error("rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("remote store error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("worksheet `{0}` not found")]
    MissingWorksheet(String),

    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Classify a non-success HTTP response from the remote store.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || RATE_LIMIT_MARKERS.iter().any(|m| body.contains(m)) {
            Self::RateLimited {
                status,
                message: body,
            }
        } else if status == 401 || status == 403 {
            Self::Auth(body)
        } else {
            Self::Remote {
                status,
                message: body,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        assert!(StoreError::from_status(429, String::new()).is_rate_limited());
    }

    #[test]
    fn quota_text_is_rate_limited_regardless_of_status() {
        let body = r#"{"error":{"code":403,"message":"Quota exceeded for quota metric 'Read requests'","status":"PERMISSION_DENIED"}}"#;
        assert!(StoreError::from_status(403, body.into()).is_rate_limited());
    }

    #[test]
    fn other_failures_are_permanent() {
        assert!(matches!(
            StoreError::from_status(403, "The caller does not have permission".into()),
            StoreError::Auth(_)
        ));
        let e = StoreError::from_status(400, "Unable to parse range".into());
        assert!(!e.is_rate_limited());
        assert!(matches!(e, StoreError::Remote { status: 400, .. }));
    }
}
