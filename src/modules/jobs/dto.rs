use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::TranscodeRecord;

/// Progress report posted by the transcode service.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncoreJobProgress {
    pub job_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub progress: i64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingSuccessBody {
    pub job_id: String,
    #[serde(default)]
    pub url: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PackagingFailureBody {
    pub message: PackagingFailureMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingFailureMessage {
    pub job_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub jobs: Vec<TranscodeRecord>,
    pub page: usize,
    /// Number of jobs on this page
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    pub total_amount: u64,
}
