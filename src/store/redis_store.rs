use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult, aio::MultiplexedConnection};
use time::OffsetDateTime;
use tracing::{debug, error};

use super::{
    BLACKLIST_KEY, StoreError, StoreResult, TIME_INDEX_KEY, TranscodeStore, decode_record,
    encode_record, page_bounds,
};
use crate::infrastructure::redis::client::RedisService;
use crate::modules::jobs::model::{PackagingQueueMessage, TranscodeRecord};

const OP_TIMEOUT: Duration = Duration::from_secs(3);
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis/Valkey backed store. Records are JSON strings; the time index,
/// blacklist and packaging queues are sorted sets scored by epoch millis.
#[derive(Clone)]
pub struct RedisTranscodeStore {
    redis: RedisService,
}

impl RedisTranscodeStore {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }

    fn conn(&self) -> MultiplexedConnection {
        self.redis.get_conn()
    }
}

fn now_millis() -> f64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as f64
}

async fn bounded<T>(
    op: &'static str,
    limit: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(op)),
    }
}

#[async_trait]
impl TranscodeStore for RedisTranscodeStore {
    async fn get(&self, key: &str) -> StoreResult<Option<TranscodeRecord>> {
        let mut conn = self.conn();
        let raw: Option<Vec<u8>> = bounded("get", OP_TIMEOUT, conn.get(key)).await?;
        match raw {
            None => Ok(None),
            Some(bytes) => {
                let record = decode_record(key, &bytes).inspect_err(|e| {
                    error!(key, error = %e, "Failed to decode value from Redis");
                })?;
                Ok(Some(record))
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        record: &TranscodeRecord,
        ttl_secs: Option<u64>,
    ) -> StoreResult<()> {
        let payload = encode_record(key, record)?;

        let mut pipe = redis::pipe();
        pipe.atomic().set(key, payload).ignore();
        match ttl_secs {
            Some(ttl) => {
                pipe.expire(key, ttl as i64).ignore();
            }
            None => {
                pipe.persist(key).ignore();
            }
        }
        pipe.zadd(TIME_INDEX_KEY, key, now_millis()).ignore();

        let mut conn = self.conn();
        let _: () = bounded("set", OP_TIMEOUT, pipe.query_async(&mut conn)).await?;
        debug!(key, status = ?record.status, ttl = ?ttl_secs, "Set key in Redis");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(key)
            .ignore()
            .zrem(TIME_INDEX_KEY, key)
            .ignore();

        let mut conn = self.conn();
        let _: () = bounded("delete", OP_TIMEOUT, pipe.query_async(&mut conn)).await?;
        debug!(key, "Deleted key from Redis");
        Ok(())
    }

    async fn list(&self, page: usize, size: usize) -> StoreResult<(Vec<TranscodeRecord>, u64)> {
        let mut conn = self.conn();
        if size == 0 {
            let total: u64 = bounded("list", LIST_TIMEOUT, conn.zcard(TIME_INDEX_KEY)).await?;
            return Ok((Vec::new(), total));
        }
        let (start, stop) = page_bounds(page, size);

        let keys: Vec<String> = bounded(
            "list",
            LIST_TIMEOUT,
            conn.zrevrange(TIME_INDEX_KEY, start as isize, stop as isize),
        )
        .await?;
        let total: u64 = bounded("list", LIST_TIMEOUT, conn.zcard(TIME_INDEX_KEY)).await?;

        if keys.is_empty() {
            return Ok((Vec::new(), total));
        }

        let values: Vec<Option<Vec<u8>>> = bounded(
            "list",
            LIST_TIMEOUT,
            redis::cmd("MGET").arg(&keys).query_async(&mut conn),
        )
        .await?;

        let records = keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| {
                // Index entries can outlive records that expired on their own.
                let bytes = value?;
                decode_record(key, &bytes)
                    .inspect_err(|e| error!(key = %key, error = %e, "Skipping undecodable record"))
                    .ok()
            })
            .collect();

        Ok((records, total))
    }

    async fn blacklist(&self, url: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = bounded(
            "blacklist",
            OP_TIMEOUT,
            conn.zadd(BLACKLIST_KEY, url, now_millis()),
        )
        .await?;
        debug!(url, "Added URL to blacklist");
        Ok(())
    }

    async fn in_blacklist(&self, url: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let score: Option<f64> =
            bounded("in_blacklist", OP_TIMEOUT, conn.zscore(BLACKLIST_KEY, url)).await?;
        Ok(score.is_some())
    }

    async fn remove_from_blacklist(&self, url: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = bounded(
            "remove_from_blacklist",
            OP_TIMEOUT,
            conn.zrem(BLACKLIST_KEY, url),
        )
        .await?;
        debug!(url, "Removed URL from blacklist");
        Ok(())
    }

    async fn list_blacklist(&self, page: usize, size: usize) -> StoreResult<(Vec<String>, u64)> {
        let mut conn = self.conn();
        if size == 0 {
            let total: u64 =
                bounded("list_blacklist", LIST_TIMEOUT, conn.zcard(BLACKLIST_KEY)).await?;
            return Ok((Vec::new(), total));
        }
        let (start, stop) = page_bounds(page, size);
        let urls: Vec<String> = bounded(
            "list_blacklist",
            LIST_TIMEOUT,
            conn.zrevrange(BLACKLIST_KEY, start as isize, stop as isize),
        )
        .await?;
        let total: u64 = bounded("list_blacklist", LIST_TIMEOUT, conn.zcard(BLACKLIST_KEY)).await?;
        Ok((urls, total))
    }

    async fn enqueue_packaging_job(
        &self,
        queue_name: &str,
        message: &PackagingQueueMessage,
    ) -> StoreResult<()> {
        let payload = serde_json::to_string(message).map_err(|source| StoreError::Serialize {
            key: queue_name.to_string(),
            source,
        })?;
        let mut conn = self.conn();
        let _: () = bounded(
            "enqueue_packaging_job",
            OP_TIMEOUT,
            conn.zadd(queue_name, payload, now_millis()),
        )
        .await?;
        debug!(queue = queue_name, job_id = %message.job_id, "Enqueued packaging job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::model::TranscodeStatus;

    async fn store() -> RedisTranscodeStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisTranscodeStore::new(RedisService::new(&url).await.unwrap())
    }

    #[tokio::test]
    #[ignore = "requires a running redis instance"]
    async fn set_get_delete_against_redis() {
        let store = store().await;
        let key = format!("test-{}", uuid::Uuid::new_v4());
        let record = TranscodeRecord {
            url: "https://cdn/x/index.m3u8".into(),
            aspect_ratio: "16:9".into(),
            frame_rates: vec![25.0, 50.0],
            status: TranscodeStatus::Completed,
            source: "https://m/x.mp4".into(),
            last_update: 1,
            error: None,
        };

        store.set(&key, &record, Some(60)).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(record.clone()));

        let (records, total) = store.list(0, 100).await.unwrap();
        assert!(total >= 1);
        assert!(records.contains(&record));

        let (empty, zero_page_total) = store.list(0, 0).await.unwrap();
        assert!(empty.is_empty());
        assert!(zero_page_total >= 1);

        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running redis instance"]
    async fn blacklist_against_redis() {
        let store = store().await;
        let url = format!("https://m/{}.mp4", uuid::Uuid::new_v4());
        store.blacklist(&url).await.unwrap();
        assert!(store.in_blacklist(&url).await.unwrap());
        let (urls, total) = store.list_blacklist(0, 0).await.unwrap();
        assert!(urls.is_empty());
        assert!(total >= 1);
        store.remove_from_blacklist(&url).await.unwrap();
        assert!(!store.in_blacklist(&url).await.unwrap());
    }
}
