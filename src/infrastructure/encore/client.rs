use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;

use super::types::{EncoreInput, EncoreJob};
use crate::common::url::{join_folder, join_path};
use crate::config::settings::AppConfig;
use crate::infrastructure::osc::token::{ServiceTokenProvider, TokenError};
use crate::modules::ads::creative::CreativeAsset;

const HAL_JSON: &str = "application/hal+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ENCORE_SERVICE_ID: &str = "encore";

#[derive(Debug, Error)]
pub enum EncoreError {
    #[error("request to transcode service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcode service responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not obtain service access token: {0}")]
    Token(#[from] TokenError),
}

/// Job submission and lookup against the transcode service.
#[async_trait]
pub trait EncoreClient: Send + Sync {
    async fn create_job(&self, creative: &CreativeAsset) -> Result<EncoreJob, EncoreError>;

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, EncoreError>;
}

pub struct HttpEncoreClient {
    http: reqwest::Client,
    jobs_url: Url,
    profile: String,
    output_bucket: Url,
    callback_url: Url,
    tokens: Option<Arc<ServiceTokenProvider>>,
}

impl HttpEncoreClient {
    pub fn new(
        config: &AppConfig,
        tokens: Option<Arc<ServiceTokenProvider>>,
    ) -> Result<Self, EncoreError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            jobs_url: join_path(&config.encore_url, &[config.encore_jobs_path.as_str()]),
            profile: config.encore_profile.clone(),
            output_bucket: config.output_bucket_url.clone(),
            callback_url: join_path(&config.root_url, &["encoreCallback"]),
            tokens,
        })
    }

    /// URL the packaging worker uses to look a job up.
    pub fn job_url(&self, job_id: &str) -> Url {
        join_path(&self.jobs_url, &[job_id])
    }

    fn job_request(&self, creative: &CreativeAsset) -> EncoreJob {
        let suffix = Uuid::new_v4().to_string();
        let output_folder = join_folder(
            &self.output_bucket,
            &[creative.creative_id.as_str(), suffix.as_str()],
        );
        EncoreJob {
            external_id: creative.creative_id.clone(),
            profile: self.profile.clone(),
            output_folder: output_folder.to_string(),
            base_name: creative.creative_id.clone(),
            progress_callback_uri: self.callback_url.to_string(),
            inputs: vec![EncoreInput {
                uri: creative.master_playlist_url.clone(),
                seek_to: 0.0,
                copy_ts: true,
                media_type: "AudioVideo".to_string(),
            }],
            ..Default::default()
        }
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, EncoreError> {
        let Some(tokens) = &self.tokens else {
            return Ok(request);
        };
        let token = tokens.service_token(ENCORE_SERVICE_ID).await?;
        Ok(request.header("x-jwt", format!("Bearer {token}")))
    }
}

async fn read_job(response: reqwest::Response) -> Result<EncoreJob, EncoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EncoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<EncoreJob>().await?)
}

#[async_trait]
impl EncoreClient for HttpEncoreClient {
    async fn create_job(&self, creative: &CreativeAsset) -> Result<EncoreJob, EncoreError> {
        let job = self.job_request(creative);
        let request = self
            .http
            .post(self.jobs_url.clone())
            .header(ACCEPT, HAL_JSON)
            .header(CONTENT_TYPE, "application/json")
            .json(&job);
        let response = self.authorize(request).await?.send().await?;

        match read_job(response).await {
            Ok(created) => {
                info!(
                    creative_id = %creative.creative_id,
                    job_id = %created.id,
                    "🎬 Submitted transcode job"
                );
                Ok(created)
            }
            Err(e) => {
                error!(creative_id = %creative.creative_id, error = %e, "Failed to submit transcode job");
                Err(e)
            }
        }
    }

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, EncoreError> {
        let url = self.job_url(job_id);
        debug!(job_id, url = %url, "Fetching transcode job");
        let request = self.http.get(url).header(ACCEPT, HAL_JSON);
        let response = self.authorize(request).await?.send().await?;
        read_job(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::AppConfig;

    #[test]
    fn job_request_is_scoped_to_creative() {
        let client = HttpEncoreClient::new(&AppConfig::sample(), None).unwrap();
        let creative = CreativeAsset::new("abc123", "https://ads.example.com/abc.mp4");
        let job = client.job_request(&creative);

        assert_eq!(job.external_id, "abc123");
        assert_eq!(job.base_name, "abc123");
        assert_eq!(job.profile, "program");
        assert_eq!(job.progress_callback_uri, "https://normalizer.example.com/encoreCallback");
        assert!(job.output_folder.starts_with("s3://bucket/out/abc123/"));
        assert!(job.output_folder.ends_with('/'));
        assert_eq!(job.inputs.len(), 1);
        assert_eq!(job.inputs[0].uri, "https://ads.example.com/abc.mp4");
        assert!(job.inputs[0].copy_ts);
        assert_eq!(job.inputs[0].media_type, "AudioVideo");
    }

    #[test]
    fn output_folders_are_unique_per_submission() {
        let client = HttpEncoreClient::new(&AppConfig::sample(), None).unwrap();
        let creative = CreativeAsset::new("abc123", "https://ads.example.com/abc.mp4");
        assert_ne!(
            client.job_request(&creative).output_folder,
            client.job_request(&creative).output_folder
        );
    }

    #[test]
    fn job_url_includes_jobs_path() {
        let client = HttpEncoreClient::new(&AppConfig::sample(), None).unwrap();
        assert_eq!(
            client.job_url("job-1").as_str(),
            "https://encore.example.com/encoreJobs/job-1"
        );
    }
}
