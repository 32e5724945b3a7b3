//! Redis snapshot cache
//!
//! Values are stored as JSON documents with an expiry. A document that no
//! longer decodes is evicted on read and reported as a miss.

use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{error, info, warn};

use crate::error::{CacheError, CacheResult};

/// Redis client shared by the services
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Open a client for `url`; no connection is made until first use
    pub fn open(url: &str) -> CacheResult<Self> {
        let client = Client::open(url)?;
        info!("Redis client initialized");
        Ok(Self { client })
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Store `value` under `key` as JSON, expiring after `ttl_seconds` (at least 1)
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        let document = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, document, ttl_seconds.max(1)).await?;
        Ok(())
    }

    /// Read the JSON document under `key`
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let mut conn = self.connection().await?;
        let document: Option<String> = conn.get(key).await?;
        let Some(document) = document else {
            return Ok(None);
        };

        match serde_json::from_str(&document) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Evicting undecodable cache entry {}: {}", key, e);
                self.evict(key).await?;
                Ok(None)
            }
        }
    }

    /// Remove `key`; absent keys are not an error
    pub async fn evict(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Whether Redis answers a PING
    pub async fn health_check(&self) -> bool {
        let ping = async {
            let mut conn = self.connection().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<bool, CacheError>(pong == "PONG")
        };

        match ping.await {
            Ok(up) => up,
            Err(e) => {
                error!("Redis health check failed: {}", e);
                false
            }
        }
    }
}
