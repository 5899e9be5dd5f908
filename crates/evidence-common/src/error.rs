/// Error types shared across evidence service crates.
///
/// These errors represent failures in infrastructure components (the Redis
/// cache backend) that are common to every evidence service. Application
/// errors live in each service crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis unavailable, degrading gracefully")]
    RedisUnavailable,

    #[error("cache operation timed out after {0}ms")]
    Timeout(u128),
}
