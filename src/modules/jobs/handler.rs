use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::dto::{EncoreJobProgress, PackagingFailureBody, PackagingSuccessBody, StatusResponse};
use super::service::{JobsError, JobsService};
use crate::common::pagination::PaginationQuery;
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;

impl From<JobsError> for ApiError {
    fn from(err: JobsError) -> Self {
        match err {
            JobsError::JobNotFound(_) | JobsError::MissingExternalId(_) => {
                ApiError::not_found(err.to_string())
            }
            other => {
                error!(error = %other, "Failed to handle job callback");
                ApiError::internal(other.to_string())
            }
        }
    }
}

/// List transcode jobs, most recently updated first
#[utoipa::path(
    get,
    path = "/api/v1/status",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of transcode jobs", body = StatusResponse),
        (status = 400, description = "Invalid pagination parameters", body = ApiResponse<String>),
        (status = 500, description = "Store unavailable", body = ApiResponse<String>)
    ),
    tag = "Jobs"
)]
pub async fn list_status(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Response {
    let page = match query
        .map_err(ApiError::from)
        .and_then(|Query(q)| q.into_page().map_err(ApiError::bad_request))
    {
        Ok(page) => page,
        Err(e) => return e.into_response(),
    };

    match JobsService::list(state, page).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Transcode progress webhook
#[utoipa::path(
    post,
    path = "/encoreCallback",
    request_body = EncoreJobProgress,
    responses(
        (status = 200, description = "Progress handled"),
        (status = 400, description = "Malformed body", body = ApiResponse<String>),
        (status = 500, description = "Progress could not be applied", body = ApiResponse<String>)
    ),
    tag = "Callbacks"
)]
pub async fn encore_callback(
    State(state): State<AppState>,
    payload: Result<Json<EncoreJobProgress>, JsonRejection>,
) -> Response {
    let Json(progress) = match payload {
        Ok(p) => p,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match JobsService::handle_progress(state, progress).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Packaging finished
#[utoipa::path(
    post,
    path = "/packagerCallback/success",
    request_body = PackagingSuccessBody,
    responses(
        (status = 200, description = "Job marked completed"),
        (status = 400, description = "Malformed body", body = ApiResponse<String>),
        (status = 404, description = "Unknown job", body = ApiResponse<String>)
    ),
    tag = "Callbacks"
)]
pub async fn packaging_success(
    State(state): State<AppState>,
    payload: Result<Json<PackagingSuccessBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(b) => b,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match JobsService::packaging_succeeded(state, body).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Packaging failed
#[utoipa::path(
    post,
    path = "/packagerCallback/failure",
    request_body = PackagingFailureBody,
    responses(
        (status = 200, description = "Job entry removed"),
        (status = 400, description = "Malformed body", body = ApiResponse<String>),
        (status = 404, description = "Unknown job", body = ApiResponse<String>)
    ),
    tag = "Callbacks"
)]
pub async fn packaging_failure(
    State(state): State<AppState>,
    payload: Result<Json<PackagingFailureBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(b) => b,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match JobsService::packaging_failed(state, body).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
