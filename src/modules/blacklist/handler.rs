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

use super::dto::{BlacklistRequest, BlacklistResponse};
use super::service::BlacklistService;
use crate::common::pagination::PaginationQuery;
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;

fn media_url(payload: Result<Json<BlacklistRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(body) = payload?;
    if body.media_url.trim().is_empty() {
        return Err(ApiError::bad_request("mediaUrl must not be empty"));
    }
    Ok(body.media_url)
}

/// Blacklist a media URL
#[utoipa::path(
    post,
    path = "/api/v1/blacklist",
    request_body = BlacklistRequest,
    responses(
        (status = 204, description = "URL blacklisted"),
        (status = 400, description = "Malformed body", body = ApiResponse<String>),
        (status = 500, description = "Store unavailable", body = ApiResponse<String>)
    ),
    tag = "Blacklist"
)]
pub async fn add_to_blacklist(
    State(state): State<AppState>,
    payload: Result<Json<BlacklistRequest>, JsonRejection>,
) -> Response {
    let url = match media_url(payload) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };
    match BlacklistService::add(state, &url).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(media_url = %url, error = %e, "Failed to blacklist media URL");
            ApiError::internal("Failed to blacklist media URL").into_response()
        }
    }
}

/// Remove a media URL from the blacklist
#[utoipa::path(
    delete,
    path = "/api/v1/blacklist",
    request_body = BlacklistRequest,
    responses(
        (status = 204, description = "URL removed"),
        (status = 400, description = "Malformed body", body = ApiResponse<String>),
        (status = 500, description = "Store unavailable", body = ApiResponse<String>)
    ),
    tag = "Blacklist"
)]
pub async fn remove_from_blacklist(
    State(state): State<AppState>,
    payload: Result<Json<BlacklistRequest>, JsonRejection>,
) -> Response {
    let url = match media_url(payload) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };
    match BlacklistService::remove(state, &url).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(media_url = %url, error = %e, "Failed to remove media URL from blacklist");
            ApiError::internal("Failed to remove media URL from blacklist").into_response()
        }
    }
}

/// List blacklisted media URLs, most recent first
#[utoipa::path(
    get,
    path = "/api/v1/blacklist",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of blacklisted URLs", body = BlacklistResponse),
        (status = 400, description = "Invalid pagination parameters", body = ApiResponse<String>)
    ),
    tag = "Blacklist"
)]
pub async fn list_blacklist(
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
    match BlacklistService::list(state, page).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list blacklist");
            ApiError::internal("Failed to list blacklist").into_response()
        }
    }
}
