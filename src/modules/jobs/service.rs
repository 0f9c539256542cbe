//! Transitions driven by transcode and packaging callbacks.
//!
//! A cache entry is deleted, rather than marked failed, whenever a job ends
//! badly. The next ad request then sees a miss and dispatches again.
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::dto::{EncoreJobProgress, PackagingFailureBody, PackagingSuccessBody, StatusResponse};
use super::model::{
    JobDetailError, PackagingQueueMessage, TranscodeStatus, now_unix, package_url, record_from_job,
};
use crate::common::pagination::Page;
use crate::common::url::join_path;
use crate::infrastructure::encore::client::EncoreError;
use crate::infrastructure::encore::types::EncoreJob;
use crate::state::AppState;
use crate::store::StoreError;

pub const STATUS_PATH: &str = "/api/v1/status";

#[derive(Debug, Error)]
pub enum JobsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Encore(#[from] EncoreError),
    #[error("transcode job {0} not found")]
    JobNotFound(String),
    #[error("transcode job {0} has no external id")]
    MissingExternalId(String),
    #[error(transparent)]
    InvalidJob(#[from] JobDetailError),
}

/// What a progress callback did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Stored(TranscodeStatus),
    Removed,
    Ignored,
}

pub struct JobsService;

impl JobsService {
    pub async fn list(state: AppState, page: Page) -> Result<StatusResponse, JobsError> {
        let (jobs, total) = state.store.list(page.page, page.size).await?;
        Ok(StatusResponse {
            next: page.next_link(STATUS_PATH, jobs.len()),
            prev: page.prev_link(STATUS_PATH),
            page: page.page,
            size: jobs.len(),
            jobs,
            total_amount: total,
        })
    }

    pub async fn handle_progress(
        state: AppState,
        progress: EncoreJobProgress,
    ) -> Result<ProgressOutcome, JobsError> {
        debug!(
            job_id = %progress.job_id,
            creative_id = %progress.external_id,
            status = %progress.status,
            "Transcode progress received"
        );
        match progress.status.as_str() {
            "SUCCESSFUL" => Self::transcode_completed(&state, &progress).await,
            "FAILED" | "CANCELLED" => {
                warn!(job_id = %progress.job_id, creative_id = %progress.external_id, "Transcode job failed");
                state.store.delete(&progress.external_id).await?;
                Ok(ProgressOutcome::Removed)
            }
            "IN_PROGRESS" => {
                info!(
                    creative_id = %progress.external_id,
                    progress = progress.progress,
                    "Transcoding progress updated"
                );
                Ok(ProgressOutcome::Ignored)
            }
            other => {
                info!(status = other, job_id = %progress.job_id, "Ignoring unknown job status");
                Ok(ProgressOutcome::Ignored)
            }
        }
    }

    async fn transcode_completed(
        state: &AppState,
        progress: &EncoreJobProgress,
    ) -> Result<ProgressOutcome, JobsError> {
        let creative_id = progress.external_id.as_str();
        let job = state.encore.get_job(&progress.job_id).await?;
        let config = &state.config;

        let record = match record_from_job(&job, config.jit_packaging, &config.asset_server_url) {
            Ok(record) => record,
            Err(e) => {
                error!(job_id = %progress.job_id, creative_id, error = %e, "Unusable job detail, dropping entry");
                state.store.delete(creative_id).await?;
                return Ok(ProgressOutcome::Removed);
            }
        };

        let ttl = record.status.is_in_flight().then_some(config.in_flight_ttl).flatten();
        if let Err(e) = state.store.set(creative_id, &record, ttl).await {
            error!(creative_id, error = %e, "Failed to store transcode result");
            if let Err(e) = state.store.delete(creative_id).await {
                error!(creative_id, error = %e, "Failed to drop entry after store error");
            }
            return Err(e.into());
        }

        if !config.jit_packaging {
            let message = PackagingQueueMessage {
                job_id: progress.job_id.clone(),
                url: join_path(
                    &config.encore_url,
                    &[config.encore_jobs_path.as_str(), progress.job_id.as_str()],
                )
                .to_string(),
            };
            state
                .store
                .enqueue_packaging_job(&config.packaging_queue, &message)
                .await?;
            debug!(creative_id, queue = %config.packaging_queue, "Packaging job enqueued");
        }
        info!(creative_id, status = ?record.status, "✅ Transcode completed");
        Ok(ProgressOutcome::Stored(record.status))
    }

    async fn job_with_external_id(state: &AppState, job_id: &str) -> Result<EncoreJob, JobsError> {
        let job = state.encore.get_job(job_id).await.map_err(|e| {
            error!(job_id, error = %e, "Failed to fetch transcode job");
            JobsError::JobNotFound(job_id.to_string())
        })?;
        if job.external_id.is_empty() {
            return Err(JobsError::MissingExternalId(job_id.to_string()));
        }
        Ok(job)
    }

    pub async fn packaging_succeeded(
        state: AppState,
        body: PackagingSuccessBody,
    ) -> Result<String, JobsError> {
        let job = Self::job_with_external_id(&state, &body.job_id).await?;
        let config = &state.config;

        let mut record = match record_from_job(&job, config.jit_packaging, &config.asset_server_url) {
            Ok(record) => record,
            Err(e) => {
                if let Err(del) = state.store.delete(&job.external_id).await {
                    error!(creative_id = %job.external_id, error = %del, "Failed to drop entry");
                }
                return Err(e.into());
            }
        };
        let url = package_url(&config.asset_server_url, &body.output_path, "index").to_string();
        record.url = url.clone();
        record.status = TranscodeStatus::Completed;
        record.last_update = now_unix();

        state.store.set(&job.external_id, &record, None).await?;
        info!(creative_id = %job.external_id, url = %url, "📦 Packaging completed");
        Ok(url)
    }

    pub async fn packaging_failed(
        state: AppState,
        body: PackagingFailureBody,
    ) -> Result<(), JobsError> {
        let job = Self::job_with_external_id(&state, &body.message.job_id).await?;
        state.store.delete(&job.external_id).await?;
        warn!(creative_id = %job.external_id, job_id = %job.id, "Packaging failed, entry removed");
        Ok(())
    }
}
