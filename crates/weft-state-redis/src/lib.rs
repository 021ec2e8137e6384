//! Redis implementation of the execution status store.
//!
//! Records are stored as JSON strings under `weft:status:<step id>` with an
//! expiry, so a store shared by many runs does not grow without bound.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, info, warn};
use weft_core::{CoreError, ExecutionRecord, StatusRepository, StepId};

const KEY_PREFIX: &str = "weft:status:";
const DEFAULT_MAX_CONNECTIONS: usize = 20;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 3000;
const DEFAULT_POOL_TIMEOUT_MS: u64 = 5000;
const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Redis store configuration
#[derive(Debug, Clone)]
pub struct RedisStatusConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Connection timeout in milliseconds
    pub connection_timeout_ms: u64,
    /// Time to wait for a free connection slot in milliseconds
    pub pool_timeout_ms: u64,
    /// Expiry of every record, at least one second
    pub ttl_seconds: u64,
}

impl Default for RedisStatusConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            pool_timeout_ms: DEFAULT_POOL_TIMEOUT_MS,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

/// Status repository backed by Redis
pub struct RedisStatusRepository {
    client: Client,
    slots: Semaphore,
    config: RedisStatusConfig,
}

impl RedisStatusRepository {
    /// Create a repository for `redis_url` with default settings
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        Self::with_config(redis_url, RedisStatusConfig::default())
    }

    /// Create a repository with custom settings.
    ///
    /// No connection is made until the first call.
    pub fn with_config(redis_url: &str, config: RedisStatusConfig) -> Result<Self, RedisError> {
        info!(
            max_connections = config.max_connections,
            ttl_seconds = config.ttl_seconds,
            "Creating Redis status repository"
        );
        let client = Client::open(redis_url)?;
        Ok(Self {
            client,
            slots: Semaphore::new(config.max_connections.max(1)),
            config,
        })
    }

    /// Redis key of a step's record
    pub fn make_key(step_id: &StepId) -> String {
        format!("{}{}", KEY_PREFIX, step_id)
    }

    fn ttl_seconds(&self) -> usize {
        self.config.ttl_seconds.max(1) as usize
    }

    /// Run `op` on a fresh connection while holding a pool slot
    async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(redis::aio::Connection) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let _permit = match time::timeout(
            Duration::from_millis(self.config.pool_timeout_ms),
            self.slots.acquire(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => {
                return Err(CoreError::RecorderError(format!("Redis semaphore error: {}", e)))
            }
            Err(_) => {
                return Err(CoreError::RecorderError(format!(
                    "Timed out waiting for Redis connection after {}ms",
                    self.config.pool_timeout_ms
                )))
            }
        };

        let connection = match time::timeout(
            Duration::from_millis(self.config.connection_timeout_ms),
            self.client.get_async_connection(),
        )
        .await
        {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                return Err(CoreError::RecorderError(format!("Redis connection error: {}", e)))
            }
            Err(_) => {
                return Err(CoreError::RecorderError(format!(
                    "Timed out establishing Redis connection after {}ms",
                    self.config.connection_timeout_ms
                )))
            }
        };

        op(connection).await
    }
}

fn decode(key: &str, raw: &str) -> Result<ExecutionRecord, CoreError> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::RecorderError(format!("JSON parse error for {}: {}", key, e)))
}

#[async_trait]
impl StatusRepository for RedisStatusRepository {
    async fn save(&self, record: ExecutionRecord) -> Result<(), CoreError> {
        let key = Self::make_key(&record.step_id);
        let json = serde_json::to_string(&record)
            .map_err(|e| CoreError::RecorderError(format!("JSON serialize error: {}", e)))?;
        let ttl = self.ttl_seconds();

        self.with_connection(|mut conn| async move {
            let _: () = conn
                .set_ex(&key, json, ttl)
                .await
                .map_err(|e| CoreError::RecorderError(format!("Redis setex error: {}", e)))?;
            debug!(key = %key, ttl_seconds = ttl, "Saved execution record");
            Ok(())
        })
        .await
    }

    async fn get_by_step_id(&self, step_id: &StepId) -> Result<Option<ExecutionRecord>, CoreError> {
        let key = Self::make_key(step_id);
        self.with_connection(|mut conn| async move {
            let raw: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| CoreError::RecorderError(format!("Redis get error: {}", e)))?;
            raw.map(|raw| decode(&key, &raw)).transpose()
        })
        .await
    }

    async fn get_all(&self) -> Result<Vec<ExecutionRecord>, CoreError> {
        self.with_connection(|mut conn| async move {
            let mut keys: Vec<String> = redis::cmd("KEYS")
                .arg(format!("{}*", KEY_PREFIX))
                .query_async(&mut conn)
                .await
                .map_err(|e| CoreError::RecorderError(format!("Redis keys error: {}", e)))?;
            keys.sort();

            let mut records = Vec::with_capacity(keys.len());
            for key in keys {
                // Keys can expire between KEYS and GET
                let raw: Option<String> = conn
                    .get(&key)
                    .await
                    .map_err(|e| CoreError::RecorderError(format!("Redis get error: {}", e)))?;
                let Some(raw) = raw else {
                    continue;
                };
                match decode(&key, &raw) {
                    Ok(record) => records.push(record),
                    Err(error) => warn!(key = %key, error = %error, "Skipping unreadable record"),
                }
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key() {
        assert_eq!(
            RedisStatusRepository::make_key(&StepId::from("fetch")),
            "weft:status:fetch"
        );
    }

    #[test]
    fn test_ttl_never_zero() {
        let repo = RedisStatusRepository::with_config(
            "redis://127.0.0.1:6379",
            RedisStatusConfig {
                ttl_seconds: 0,
                ..RedisStatusConfig::default()
            },
        )
        .unwrap();
        assert_eq!(repo.ttl_seconds(), 1);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisStatusRepository::new("not a url").is_err());
    }

    #[test]
    fn test_decode_failure_is_recorder_error() {
        let err = decode("weft:status:x", "{").unwrap_err();
        assert!(matches!(err, CoreError::RecorderError(_)));
    }
}
