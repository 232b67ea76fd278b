use thiserror::Error;

/// Result type for rate limiter operations
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Rate limiter error types
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Counter store error: {0}")]
    Store(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Deadline exceeded before the counter store answered")]
    DeadlineExceeded,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RateLimitError {
    /// Whether this error was raised while building a limiter, as opposed to
    /// while answering a request.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            RateLimitError::Config(_) | RateLimitError::Runtime(_) | RateLimitError::Io(_)
        )
    }
}
