use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::dto::{AdQuery, PreIngestRequest, PreIngestResponse};
use super::model::encode_xml;
use super::rewrite::{AssetDescription, asset_descriptions};
use super::service::{AdsError, AdsService};
use crate::common::response::{ApiError, ApiResponse};
use crate::infrastructure::adserver::client::{
    AdServerError, AdServerRequest, DEVICE_USER_AGENT, FORWARDED_FOR,
};
use crate::state::AppState;

const XML_CONTENT_TYPE: &str = "application/xml";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn upstream_request(query: Vec<(String, String)>, headers: &HeaderMap) -> AdServerRequest {
    AdServerRequest {
        query,
        device_user_agent: header_value(headers, DEVICE_USER_AGENT),
        forwarded_for: header_value(headers, FORWARDED_FOR),
    }
}

fn filler_url(query: &[(String, String)]) -> Option<String> {
    query
        .iter()
        .find(|(k, _)| k == "filler")
        .map(|(_, v)| v.clone())
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(mime::APPLICATION_JSON.essence_str()))
}

impl From<AdsError> for ApiError {
    fn from(err: AdsError) -> Self {
        error!(error = %err, "Failed to normalize ad document");
        match err {
            AdsError::AdServer(AdServerError::Status(status)) => {
                ApiError::bad_gateway(format!("Ad server responded with status {status}"))
            }
            AdsError::AdServer(_) => ApiError::internal("Failed to fetch ad document"),
            AdsError::Document(_) => ApiError::internal("Failed to process ad document"),
        }
    }
}

fn xml_response(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

/// Fetch and normalize a VAST document
#[utoipa::path(
    get,
    path = "/api/v1/vast",
    params(AdQuery),
    responses(
        (status = 200, description = "Normalized VAST, or asset descriptions when JSON is requested", content(
            (String = "application/xml"),
            (Vec<AssetDescription> = "application/json")
        )),
        (status = 502, description = "Ad server error", body = ApiResponse<String>),
        (status = 500, description = "Invalid ad document", body = ApiResponse<String>)
    ),
    tag = "Ads"
)]
pub async fn get_vast(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let filler = filler_url(&query);
    let request = upstream_request(query, &headers);

    let vast = match AdsService::normalize_vast(state, request, filler).await {
        Ok(vast) => vast,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if wants_json(&headers) {
        return Json(asset_descriptions(&vast)).into_response();
    }
    match encode_xml(&vast) {
        Ok(body) => xml_response(body),
        Err(e) => ApiError::from(AdsError::from(e)).into_response(),
    }
}

/// Fetch and normalize a VMAP document
#[utoipa::path(
    get,
    path = "/api/v1/vmap",
    params(AdQuery),
    responses(
        (status = 200, description = "Normalized VMAP", content_type = "application/xml", body = String),
        (status = 502, description = "Ad server error", body = ApiResponse<String>),
        (status = 500, description = "Invalid ad document", body = ApiResponse<String>)
    ),
    tag = "Ads"
)]
pub async fn get_vmap(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let filler = filler_url(&query);
    let request = upstream_request(query, &headers);

    match AdsService::normalize_vmap(state, request, filler).await {
        Ok(vmap) => match encode_xml(&vmap) {
            Ok(body) => xml_response(body),
            Err(e) => ApiError::from(AdsError::from(e)).into_response(),
        },
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Start transcoding a list of media URLs ahead of time
#[utoipa::path(
    post,
    path = "/api/v1/ingest",
    request_body = PreIngestRequest,
    responses(
        (status = 200, description = "Number of URLs without a rendition", body = PreIngestResponse),
        (status = 400, description = "Malformed body", body = ApiResponse<String>)
    ),
    tag = "Ads"
)]
pub async fn pre_ingest(
    State(state): State<AppState>,
    payload: Result<Json<PreIngestRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    let not_yet_processed = AdsService::pre_ingest(state, payload.media_urls).await;
    Json(PreIngestResponse { not_yet_processed }).into_response()
}
