use std::sync::Arc;

use tracing::{error, info, warn};

use super::creative::CreativeAsset;
use crate::infrastructure::encore::client::EncoreClient;
use crate::modules::jobs::model::TranscodeRecord;
use crate::store::TranscodeStore;

/// Submits a transcode job for one creative and records it as queued.
/// Nothing is written when submission fails, so the next request retries.
pub async fn dispatch_job(
    encore: &dyn EncoreClient,
    store: &dyn TranscodeStore,
    creative: &CreativeAsset,
    in_flight_ttl: Option<u64>,
) -> bool {
    let job = match encore.create_job(creative).await {
        Ok(job) => job,
        Err(e) => {
            error!(creative_id = %creative.creative_id, error = %e, "Failed to create transcode job");
            return false;
        }
    };

    let record = TranscodeRecord::queued(&creative.source_url);
    if let Err(e) = store.set(&creative.creative_id, &record, in_flight_ttl).await {
        warn!(
            creative_id = %creative.creative_id,
            job_id = %job.id,
            error = %e,
            "Job submitted but queued state was not stored"
        );
        return false;
    }
    info!(creative_id = %creative.creative_id, job_id = %job.id, "📥 Creative queued for transcoding");
    true
}

/// Fires one detached task per creative. The caller never waits on them.
pub fn dispatch_jobs(
    encore: &Arc<dyn EncoreClient>,
    store: &Arc<dyn TranscodeStore>,
    creatives: Vec<CreativeAsset>,
    in_flight_ttl: Option<u64>,
) -> usize {
    let count = creatives.len();
    for creative in creatives {
        let encore = Arc::clone(encore);
        let store = Arc::clone(store);
        tokio::spawn(async move {
            dispatch_job(encore.as_ref(), store.as_ref(), &creative, in_flight_ttl).await;
        });
    }
    count
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::infrastructure::encore::client::EncoreError;
    use crate::infrastructure::encore::types::EncoreJob;
    use crate::modules::jobs::model::TranscodeStatus;
    use crate::store::memory::MemoryTranscodeStore;

    #[derive(Default)]
    struct RecordingEncore {
        submitted: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EncoreClient for RecordingEncore {
        async fn create_job(&self, creative: &CreativeAsset) -> Result<EncoreJob, EncoreError> {
            if self.fail {
                return Err(EncoreError::Status { status: 503, body: String::new() });
            }
            self.submitted.lock().unwrap().push(creative.creative_id.clone());
            Ok(EncoreJob { id: "job-1".into(), ..Default::default() })
        }

        async fn get_job(&self, _job_id: &str) -> Result<EncoreJob, EncoreError> {
            unreachable!("not used when dispatching")
        }
    }

    #[tokio::test]
    async fn successful_dispatch_stores_queued_record() {
        let encore = RecordingEncore::default();
        let store = MemoryTranscodeStore::new();
        let creative = CreativeAsset::new("ABC", "https://media.example.com/abc.mp4");

        assert!(dispatch_job(&encore, &store, &creative, Some(60)).await);
        assert_eq!(encore.submitted.lock().unwrap().as_slice(), ["ABC"]);

        let record = store.get("ABC").await.unwrap().unwrap();
        assert_eq!(record.status, TranscodeStatus::Queued);
        assert_eq!(record.source, "https://media.example.com/abc.mp4");
    }

    #[tokio::test]
    async fn failed_dispatch_writes_nothing() {
        let encore = RecordingEncore { fail: true, ..Default::default() };
        let store = MemoryTranscodeStore::new();
        let creative = CreativeAsset::new("ABC", "https://media.example.com/abc.mp4");

        assert!(!dispatch_job(&encore, &store, &creative, Some(60)).await);
        assert!(store.get("ABC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dispatch_jobs_returns_without_waiting() {
        let encore = Arc::new(RecordingEncore::default());
        let store = Arc::new(MemoryTranscodeStore::new());
        let creatives = vec![
            CreativeAsset::new("A", "https://media.example.com/a.mp4"),
            CreativeAsset::new("B", "https://media.example.com/b.mp4"),
        ];

        let encore_dyn: Arc<dyn EncoreClient> = encore.clone();
        let store_dyn: Arc<dyn TranscodeStore> = store.clone();
        assert_eq!(dispatch_jobs(&encore_dyn, &store_dyn, creatives, None), 2);

        for _ in 0..100 {
            if encore.submitted.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let mut submitted = encore.submitted.lock().unwrap().clone();
        submitted.sort();
        assert_eq!(submitted, ["A", "B"]);
    }
}
