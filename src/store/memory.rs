//! In-process implementation of [`TranscodeStore`].
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Nothing is
//! durable and nothing is shared between instances. Values are kept in their
//! serialized form so both backends go through the same encode/decode path.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreResult, TranscodeStore, decode_record, encode_record, page_bounds};
use crate::modules::jobs::model::{PackagingQueueMessage, TranscodeRecord};

#[derive(Debug)]
struct Entry {
    payload: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Entry>,
    // Insertion sequence stands in for the timestamp score; it never ties.
    time_index: HashMap<String, u64>,
    blacklist: HashMap<String, u64>,
    queues: HashMap<String, Vec<String>>,
    seq: u64,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Drops `key` only if it is still expired at `now`. A concurrent write
    /// may have replaced the entry since it was seen expired.
    fn remove_if_expired(&mut self, key: &str, now: Instant) -> bool {
        match self.records.get(key) {
            Some(entry) if !entry.is_live(now) => {
                self.records.remove(key);
                true
            }
            _ => false,
        }
    }
}

fn newest_first<'a>(index: &'a HashMap<String, u64>, page: usize, size: usize) -> Vec<&'a String> {
    let mut ordered: Vec<(&String, &u64)> = index.iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(a.1));
    let (start, _) = page_bounds(page, size);
    ordered
        .into_iter()
        .skip(start)
        .take(size)
        .map(|(k, _)| k)
        .collect()
}

#[derive(Clone, Default)]
pub struct MemoryTranscodeStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryTranscodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages enqueued on `queue_name`, oldest first.
    pub async fn queued_messages(&self, queue_name: &str) -> Vec<PackagingQueueMessage> {
        let inner = self.inner.read().await;
        inner
            .queues
            .get(queue_name)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|raw| serde_json::from_str(raw).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranscodeStore for MemoryTranscodeStore {
    async fn get(&self, key: &str) -> StoreResult<Option<TranscodeRecord>> {
        let now = Instant::now();
        {
            let inner = self.inner.read().await;
            match inner.records.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => {
                    return decode_record(key, entry.payload.as_bytes()).map(Some);
                }
                Some(_) => {}
            }
        }
        // Expired: drop the record but leave the index entry, as redis would.
        let mut inner = self.inner.write().await;
        if inner.remove_if_expired(key, Instant::now()) {
            return Ok(None);
        }
        match inner.records.get(key) {
            Some(entry) => decode_record(key, entry.payload.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        record: &TranscodeRecord,
        ttl_secs: Option<u64>,
    ) -> StoreResult<()> {
        let payload = encode_record(key, record)?;
        let expires_at = ttl_secs.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq();
        inner
            .records
            .insert(key.to_string(), Entry { payload, expires_at });
        inner.time_index.insert(key.to_string(), seq);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.records.remove(key);
        inner.time_index.remove(key);
        Ok(())
    }

    async fn list(&self, page: usize, size: usize) -> StoreResult<(Vec<TranscodeRecord>, u64)> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        let total = inner.time_index.len() as u64;
        let records = newest_first(&inner.time_index, page, size)
            .into_iter()
            .filter_map(|key| {
                let entry = inner.records.get(key).filter(|e| e.is_live(now))?;
                decode_record(key, entry.payload.as_bytes()).ok()
            })
            .collect();
        Ok((records, total))
    }

    async fn blacklist(&self, url: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq();
        inner.blacklist.insert(url.to_string(), seq);
        Ok(())
    }

    async fn in_blacklist(&self, url: &str) -> StoreResult<bool> {
        Ok(self.inner.read().await.blacklist.contains_key(url))
    }

    async fn remove_from_blacklist(&self, url: &str) -> StoreResult<()> {
        self.inner.write().await.blacklist.remove(url);
        Ok(())
    }

    async fn list_blacklist(&self, page: usize, size: usize) -> StoreResult<(Vec<String>, u64)> {
        let inner = self.inner.read().await;
        let urls = newest_first(&inner.blacklist, page, size)
            .into_iter()
            .cloned()
            .collect();
        Ok((urls, inner.blacklist.len() as u64))
    }

    async fn enqueue_packaging_job(
        &self,
        queue_name: &str,
        message: &PackagingQueueMessage,
    ) -> StoreResult<()> {
        let payload = serde_json::to_string(message).map_err(|source| super::StoreError::Serialize {
            key: queue_name.to_string(),
            source,
        })?;
        self.inner
            .write()
            .await
            .queues
            .entry(queue_name.to_string())
            .or_default()
            .push(payload);
        Ok(())
    }
}
