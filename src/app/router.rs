//! 路由

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::product::{handler, upload::UPLOAD_URL_PREFIX};
use crate::config::Config;
use crate::core::middleware::request_logging_middleware;

pub use super::product::handler::AppState;

pub fn create_router(state: AppState, config: &Config) -> Router {
    // data URL 是 base64，比原文件大约三分之一
    let body_limit = config.uploads.max_bytes.saturating_mul(2);
    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health_check))
        .route(
            "/products",
            get(handler::list_products).post(handler::create_product),
        )
        .route(
            "/products/:id",
            get(handler::get_product)
                .put(handler::update_product)
                .patch(handler::update_product)
                .delete(handler::delete_product),
        )
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
