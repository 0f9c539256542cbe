use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters understood by the normalizer. Every other parameter is
/// passed through to the ad server unchanged.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdQuery {
    /// Replaces the first label of the ad server host
    pub subdomain: Option<String>,
    /// URL of a filler ad appended to the response
    pub filler: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreIngestRequest {
    pub media_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreIngestResponse {
    pub not_yet_processed: usize,
}
