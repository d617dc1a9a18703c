//! Redis implementation of both backend traits.

use std::time::Duration;

use redis::AsyncCommands;
use redis::Script;
use redis::aio::ConnectionManager;

use crate::backend::{BoxFuture, CacheBackend, LockBackend};
use crate::error::CacheError;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
local ttl = redis.call("PTTL", KEYS[1])
if ttl < 0 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Cache and lease storage over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("connected to redis");
        Ok(Self { conn })
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl CacheBackend for RedisBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis(ttl))
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: i64 = conn.del(key).await?;
            Ok(())
        })
    }

    fn incr_window<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<(u64, Duration), CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let (count, ttl_ms): (u64, i64) = Script::new(INCR_WINDOW_SCRIPT)
                .key(key)
                .arg(millis(window))
                .invoke_async(&mut conn)
                .await?;
            let ttl = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0));
            Ok((count, ttl))
        })
    }
}

impl LockBackend for RedisBackend {
    fn try_claim<'a>(&'a self, key: &'a str, token: &'a str, expiry: Duration) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(token)
                .arg("NX")
                .arg("PX")
                .arg(millis(expiry))
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
    }

    fn release<'a>(&'a self, key: &'a str, token: &'a str) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let deleted: i64 = Script::new(RELEASE_SCRIPT)
                .key(key)
                .arg(token)
                .invoke_async(&mut conn)
                .await?;
            Ok(deleted == 1)
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let present: bool = conn.exists(key).await?;
            Ok(present)
        })
    }
}
