/// Redis cache wrapper with graceful degradation.
///
/// `get` returns `Result<Option<String>, CommonError>` so callers can tell a
/// genuine miss from a backend failure; the public contracts built on top of
/// this wrapper collapse both into a miss. `set_with_ttl` is fire-and-forget.
/// The system is fully functional without Redis.
///
/// Availability is a cached flag, not a live probe: `probe()` issues a PING
/// and stores the result, and every operation refreshes the flag from its own
/// outcome. `is_available()` only reads the flag and never fails. Every
/// network call is bounded by a per-operation timeout.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use redis::AsyncCommands;
use tokio::time::timeout;
use tracing::warn;

use crate::error::CommonError;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisCache {
    client: Option<redis::Client>,
    healthy: AtomicBool,
    op_timeout: Duration,
}

impl RedisCache {
    /// Attempt to create a client. If the URL is `None` or invalid, returns a
    /// `RedisCache` that always degrades gracefully (no-ops).
    pub fn new(url: Option<&str>) -> Self {
        Self::with_timeout(url, DEFAULT_OP_TIMEOUT)
    }

    /// Like [`RedisCache::new`] with an explicit per-operation timeout.
    pub fn with_timeout(url: Option<&str>, op_timeout: Duration) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(
                    |e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"),
                )
                .ok()
        });
        Self {
            client,
            healthy: AtomicBool::new(false),
            op_timeout,
        }
    }

    /// Current backend reachability, read from the cached health flag.
    /// Synchronous and infallible; call `probe()` to refresh explicitly.
    pub fn is_available(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Test the connection by sending a PING and store the outcome in the
    /// health flag. Returns `true` if Redis is reachable.
    pub async fn probe(&self) -> bool {
        let ok = self.try_ping().await.is_ok();
        self.healthy.store(ok, Ordering::Relaxed);
        ok
    }

    /// Get a value. `Ok(None)` is a genuine miss; `Err` is a backend failure
    /// (unreachable, timed out, or not configured).
    pub async fn get(&self, key: &str) -> Result<Option<String>, CommonError> {
        let result = self.try_get(key).await;
        self.note_outcome(result.as_ref().err());
        result
    }

    /// Set a value with a TTL in seconds. Returns `true` if the write landed;
    /// `false` means it was silently dropped (backend failure).
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        match self.try_set_ex(key, value, ttl_secs).await {
            Ok(()) => {
                self.healthy.store(true, Ordering::Relaxed);
                true
            }
            Err(CommonError::RedisUnavailable) => false,
            Err(e) => {
                warn!(error = %e, key, "redis SETEX failed, write dropped");
                self.healthy.store(false, Ordering::Relaxed);
                false
            }
        }
    }

    fn note_outcome(&self, err: Option<&CommonError>) {
        match err {
            None => self.healthy.store(true, Ordering::Relaxed),
            // Not configured at all: the flag stays false without churn.
            Some(CommonError::RedisUnavailable) => {}
            Some(_) => self.healthy.store(false, Ordering::Relaxed),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        match timeout(self.op_timeout, client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(CommonError::Redis(e)),
            Err(_) => Err(CommonError::Timeout(self.op_timeout.as_millis())),
        }
    }

    async fn try_ping(&self) -> Result<(), CommonError> {
        let mut conn = self.connection().await?;
        let reply: Result<String, _> =
            match timeout(self.op_timeout, redis::cmd("PING").query_async(&mut conn)).await {
                Ok(result) => result,
                Err(_) => return Err(CommonError::Timeout(self.op_timeout.as_millis())),
            };
        reply.map(|_| ()).map_err(CommonError::Redis)
    }

    async fn try_get(&self, key: &str) -> Result<Option<String>, CommonError> {
        let mut conn = self.connection().await?;
        match timeout(self.op_timeout, conn.get::<_, Option<String>>(key)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CommonError::Redis(e)),
            Err(_) => Err(CommonError::Timeout(self.op_timeout.as_millis())),
        }
    }

    async fn try_set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CommonError> {
        let mut conn = self.connection().await?;
        match timeout(self.op_timeout, conn.set_ex::<_, _, ()>(key, value, ttl_secs)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CommonError::Redis(e)),
            Err(_) => Err(CommonError::Timeout(self.op_timeout.as_millis())),
        }
    }
}
