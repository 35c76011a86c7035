use thiserror::Error;

/// Persistence failures. Fatal for the invocation: an action whose record
/// could not be written must not be treated as recorded.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state store i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("state encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures signalled by the remote platform.
#[derive(Debug, Error)]
pub enum SocialError {
    /// The platform is throttling us. Retried on a later invocation,
    /// never within the current one.
    #[error("rate limited by remote api")]
    RateLimited { retry_after_secs: Option<i64> },
    /// Credentials rejected. Fatal for the run.
    #[error("authorization rejected: {0}")]
    Auth(String),
    #[error("api request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
