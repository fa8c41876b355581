use axum::http::{header, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::api::handlers::{self, AppState};
use crate::config::Settings;

/// Create the router with the webhook and health endpoints
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    let webhook_routes = Router::new()
        .route("/github/webhook", post(handlers::github_webhook))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/saas", webhook_routes)
        .layer(
            // Webhook bodies are small; reject oversized payloads early
            RequestBodyLimitLayer::new(settings.server.max_request_body_size),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(TraceLayer::new_for_http())
}
