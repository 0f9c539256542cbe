use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(handler::list_status))
}

/// Webhooks called by the transcode and packaging services. Mounted at the root.
pub fn callback_router() -> Router<AppState> {
    Router::new()
        .route("/encoreCallback", post(handler::encore_callback))
        .route("/packagerCallback/success", post(handler::packaging_success))
        .route("/packagerCallback/failure", post(handler::packaging_failure))
}
