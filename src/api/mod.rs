pub mod error;
mod settings;
mod webhooks;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/settings/pending-order-email",
            get(settings::get_settings),
        )
        .route(
            "/settings/pending-order-email",
            put(settings::update_settings),
        );

    let webhook_routes = Router::new().route("/orders", post(webhooks::order_created));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
