use axum::Router;
use axum::http::Method;
use axum::routing::get;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::state::AppState;

pub fn configure_routes() -> Router<AppState> {
    // Mirror the caller's origin so credentialed requests from players work.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/ping", get(|| async { "pong" }))
        .nest("/api/v1", api_routes())
        .merge(crate::modules::jobs::callback_router())
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(crate::modules::ads::router())
        .merge(crate::modules::blacklist::router())
        .merge(crate::modules::jobs::router())
}
