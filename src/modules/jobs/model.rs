use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;
use utoipa::ToSchema;

use crate::common::url::join_path;
use crate::infrastructure::encore::types::EncoreJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscodeStatus {
    Queued,
    InProgress,
    Packaging,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TranscodeStatus {
    /// Maps a status reported by the transcode service onto a cache status.
    pub fn from_encore(status: &str, jit_packaging: bool) -> Self {
        match status {
            "SUCCESSFUL" if jit_packaging => TranscodeStatus::Completed,
            "SUCCESSFUL" => TranscodeStatus::Packaging,
            "FAILED" | "CANCELLED" => TranscodeStatus::Failed,
            "IN_PROGRESS" | "QUEUED" | "NEW" => TranscodeStatus::InProgress,
            _ => TranscodeStatus::Unknown,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TranscodeStatus::Queued | TranscodeStatus::InProgress | TranscodeStatus::Packaging
        )
    }
}

/// Durable cache entry describing the transcoded rendition of one creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default)]
    pub frame_rates: Vec<f64>,
    pub status: TranscodeStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_update: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl TranscodeRecord {
    /// Entry written right after a job has been accepted by the transcode service.
    pub fn queued(source: &str) -> Self {
        Self {
            url: String::new(),
            aspect_ratio: String::new(),
            frame_rates: Vec::new(),
            status: TranscodeStatus::Queued,
            source: source.to_string(),
            last_update: now_unix(),
            error: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == TranscodeStatus::Completed && !self.url.is_empty()
    }
}

/// Work item for the external packaging worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingQueueMessage {
    pub job_id: String,
    pub url: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum JobDetailError {
    #[error("no outputs found for job {0}")]
    NoOutputs(String),
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// `W:H` reduced by the greatest common divisor; `0:0` if either side is zero.
pub fn aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "0:0".to_string();
    }
    let d = gcd(width, height);
    format!("{}:{}", width / d, height / d)
}

/// Parses `numerator[/denominator]` into frames per second rounded to two
/// decimals. Unparseable numerators yield `0.0`.
pub fn parse_frame_rate(raw: &str) -> f64 {
    let mut parts = raw.trim().splitn(2, '/');
    let Some(Ok(numerator)) = parts.next().map(|n| n.trim().parse::<f64>()) else {
        return 0.0;
    };
    let denominator = parts
        .next()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| *d != 0.0)
        .unwrap_or(1.0);
    ((numerator / denominator) * 100.0).round() / 100.0
}

/// Distinct frame rates, ascending.
pub fn distinct_frame_rates<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<f64> {
    let mut rates: Vec<f64> = raw
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(parse_frame_rate)
        .collect();
    rates.sort_by(|a, b| a.total_cmp(b));
    rates.dedup();
    rates
}

pub fn job_frame_rates(job: &EncoreJob) -> Vec<f64> {
    distinct_frame_rates(
        job.outputs
            .iter()
            .flat_map(|o| o.video_streams.iter())
            .map(|vs| vs.frame_rate.as_str()),
    )
}

/// Manifest URL on the asset server for a packaged or JIT-packaged output.
///
/// When `output_folder` is an absolute URL (e.g. `s3://bucket/a/b/`) only its
/// path is kept, since the asset server fronts the bucket.
pub fn package_url(asset_server: &Url, output_folder: &str, base_name: &str) -> Url {
    let folder = match Url::parse(output_folder) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => output_folder.to_string(),
    };
    let manifest = format!("{base_name}.m3u8");
    join_path(asset_server, &[folder.as_str(), manifest.as_str()])
}

/// Derives the cache entry for a job that the transcode service reports as
/// finished.
pub fn record_from_job(
    job: &EncoreJob,
    jit_packaging: bool,
    asset_server: &Url,
) -> Result<TranscodeRecord, JobDetailError> {
    let Some(first_output) = job.outputs.first() else {
        return Err(JobDetailError::NoOutputs(job.id.clone()));
    };
    let aspect = first_output
        .video_streams
        .first()
        .map(|vs| aspect_ratio(vs.width, vs.height))
        .unwrap_or_else(|| aspect_ratio(0, 0));

    let url = if jit_packaging {
        package_url(asset_server, &job.output_folder, &job.base_name).to_string()
    } else {
        String::new()
    };

    Ok(TranscodeRecord {
        url,
        aspect_ratio: aspect,
        frame_rates: job_frame_rates(job),
        status: TranscodeStatus::from_encore(&job.status, jit_packaging),
        source: job.source_uri().unwrap_or_default().to_string(),
        last_update: now_unix(),
        error: job.message.clone().filter(|m| !m.is_empty()),
    })
}
