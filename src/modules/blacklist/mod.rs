use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/blacklist",
        get(handler::list_blacklist)
            .post(handler::add_to_blacklist)
            .delete(handler::remove_from_blacklist),
    )
}
