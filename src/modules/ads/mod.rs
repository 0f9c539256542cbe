use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod creative;
pub mod dispatch;
pub mod dto;
pub mod handler;
pub mod model;
pub mod partition;
pub mod rewrite;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vast", get(handler::get_vast))
        .route("/vmap", get(handler::get_vmap))
        .route("/ingest", post(handler::pre_ingest))
}
