use std::collections::BTreeMap;

use futures_util::future::join_all;
use tracing::{debug, error};

use super::creative::CreativeAsset;
use crate::modules::jobs::model::{TranscodeRecord, TranscodeStatus};
use crate::store::TranscodeStore;

/// A creative with no usable rendition yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingCreative {
    pub asset: CreativeAsset,
    /// Status of the cached record, if there is one.
    pub status: Option<TranscodeStatus>,
}

impl MissingCreative {
    /// Whether a transcode job should be submitted. Creatives with a job
    /// already in flight, or without a source to transcode, are left alone.
    pub fn needs_dispatch(&self) -> bool {
        if self.asset.source_url.is_empty() {
            return false;
        }
        !self.status.is_some_and(|s| s.is_in_flight())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Partition {
    /// Creatives with a completed rendition; `master_playlist_url` is the cached URL.
    pub ready: BTreeMap<String, CreativeAsset>,
    pub missing: BTreeMap<String, MissingCreative>,
    pub blacklisted: usize,
}

impl Partition {
    pub fn to_dispatch(&self) -> Vec<CreativeAsset> {
        self.missing
            .values()
            .filter(|m| m.needs_dispatch())
            .map(|m| m.asset.clone())
            .collect()
    }
}

enum Bucket {
    Ready(CreativeAsset),
    Missing(MissingCreative),
    Blacklisted,
    Skipped,
}

async fn classify(
    store: &dyn TranscodeStore,
    creative: CreativeAsset,
    check_blacklist: bool,
) -> Bucket {
    if check_blacklist {
        match store.in_blacklist(&creative.source_url).await {
            Ok(true) => {
                debug!(creative_id = %creative.creative_id, url = %creative.source_url, "Creative is blacklisted");
                return Bucket::Blacklisted;
            }
            Ok(false) => {}
            Err(e) => {
                error!(creative_id = %creative.creative_id, error = %e, "Blacklist lookup failed, skipping creative");
                return Bucket::Skipped;
            }
        }
    }

    match store.get(&creative.creative_id).await {
        Ok(Some(record)) if record.is_ready() => Bucket::Ready(ready_asset(creative, record)),
        Ok(record) => Bucket::Missing(MissingCreative {
            status: record.map(|r| r.status),
            asset: creative,
        }),
        Err(e) => {
            error!(creative_id = %creative.creative_id, error = %e, "Cache lookup failed, skipping creative");
            Bucket::Skipped
        }
    }
}

fn ready_asset(creative: CreativeAsset, record: TranscodeRecord) -> CreativeAsset {
    CreativeAsset {
        master_playlist_url: record.url,
        ..creative
    }
}

/// Splits creatives into ready, missing and blacklisted against the cache.
///
/// The blacklist is consulted before the cache, so a blacklisted source is
/// never served even if a rendition exists. A failed lookup drops only the
/// affected creative.
pub async fn partition_creatives(
    store: &dyn TranscodeStore,
    creatives: BTreeMap<String, CreativeAsset>,
    check_blacklist: bool,
) -> Partition {
    let lookups = creatives
        .into_values()
        .map(|creative| classify(store, creative, check_blacklist));

    let mut partition = Partition::default();
    for bucket in join_all(lookups).await {
        match bucket {
            Bucket::Ready(asset) => {
                partition.ready.insert(asset.creative_id.clone(), asset);
            }
            Bucket::Missing(missing) => {
                partition
                    .missing
                    .insert(missing.asset.creative_id.clone(), missing);
            }
            Bucket::Blacklisted => partition.blacklisted += 1,
            Bucket::Skipped => {}
        }
    }
    debug!(
        ready = partition.ready.len(),
        missing = partition.missing.len(),
        blacklisted = partition.blacklisted,
        "Partitioned creatives"
    );
    partition
}
