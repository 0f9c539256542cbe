//! Durable cache of transcode state.
//!
//! Callers only see the [`TranscodeStore`] trait. Serialization, key layout
//! and per-operation deadlines live inside each backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::modules::jobs::model::{PackagingQueueMessage, TranscodeRecord};

pub mod memory;
pub mod redis_store;

pub const BLACKLIST_KEY: &str = "blacklist";
pub const TIME_INDEX_KEY: &str = "job_time_index";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation '{0}' timed out")]
    Timeout(&'static str),
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("failed to serialize value for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("corrupt value stored under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TranscodeStore: Send + Sync {
    /// `Ok(None)` on a plain cache miss.
    async fn get(&self, key: &str) -> StoreResult<Option<TranscodeRecord>>;

    /// Writes the record and refreshes its time-index entry. Without a TTL the
    /// key is made non-expiring, even if an earlier write set one.
    async fn set(&self, key: &str, record: &TranscodeRecord, ttl_secs: Option<u64>)
    -> StoreResult<()>;

    /// Removes the record and its time-index entry. Missing keys are not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Most recently written records first. The count is the size of the whole
    /// time index; entries whose record has expired are skipped.
    async fn list(&self, page: usize, size: usize) -> StoreResult<(Vec<TranscodeRecord>, u64)>;

    async fn blacklist(&self, url: &str) -> StoreResult<()>;

    async fn in_blacklist(&self, url: &str) -> StoreResult<bool>;

    async fn remove_from_blacklist(&self, url: &str) -> StoreResult<()>;

    /// Blacklisted URLs, most recently added first, with the total count.
    async fn list_blacklist(&self, page: usize, size: usize) -> StoreResult<(Vec<String>, u64)>;

    async fn enqueue_packaging_job(
        &self,
        queue_name: &str,
        message: &PackagingQueueMessage,
    ) -> StoreResult<()>;
}

pub(crate) fn encode_record(key: &str, record: &TranscodeRecord) -> StoreResult<String> {
    serde_json::to_string(record).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn decode_record(key: &str, raw: &[u8]) -> StoreResult<TranscodeRecord> {
    if raw.is_empty() {
        return Err(StoreError::Corrupt {
            key: key.to_string(),
            reason: "0 length value".to_string(),
        });
    }
    serde_json::from_slice(raw).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Index range `[start, stop]` covered by a zero-based page.
pub(crate) fn page_bounds(page: usize, size: usize) -> (usize, usize) {
    let start = page.saturating_mul(size);
    (start, start.saturating_add(size).saturating_sub(1))
}
