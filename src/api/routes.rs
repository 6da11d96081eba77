use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::analytics::AnalyticsService;
use crate::storage::Storage;

use super::analytics::{get_shared_analytics, get_sponsor_analytics};
use super::handlers::{health_check, ingest_metrics, AppState};

pub fn create_api_router(storage: Arc<dyn Storage>, analytics: AnalyticsService) -> Router {
    let state = Arc::new(AppState { storage, analytics });

    let api_routes = Router::new()
        .route("/analytics/shared", get(get_shared_analytics))
        .route("/analytics/sponsor", get(get_sponsor_analytics))
        .route("/metrics", post(ingest_metrics))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
