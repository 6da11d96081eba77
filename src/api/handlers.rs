use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::analytics::{AnalyticsError, AnalyticsService, Envelope};
use crate::models::RawMetricEvent;
use crate::storage::{Storage, StorageError};

use super::analytics::{rejected, status_for};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub analytics: AnalyticsService,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub brand_id: Option<String>,
    #[serde(default)]
    pub events: Vec<RawMetricEvent>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: u64,
}

/// Append raw metric events to a brand's log
pub async fn ingest_metrics(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> impl IntoResponse {
    let result = match payload {
        Ok(Json(payload)) => ingest(&state, payload).await,
        Err(rejection) => Err(rejected(rejection)),
    };

    let status = match &result {
        Ok(_) => StatusCode::CREATED,
        Err(e) => status_for(e),
    };

    (status, Json(Envelope::from(result)))
}

async fn ingest(state: &AppState, payload: IngestRequest) -> Result<IngestResponse, AnalyticsError> {
    let brand_id = payload.brand_id.as_deref().map(str::trim).unwrap_or("");

    match state.storage.append_events(brand_id, &payload.events).await {
        Ok(accepted) => {
            info!(brand_id, accepted, "appended metric events");
            Ok(IngestResponse { accepted })
        }
        Err(StorageError::EmptyBrand) => {
            Err(AnalyticsError::BadInput("brandId is required".to_string()))
        }
        Err(StorageError::Other(e)) => Err(AnalyticsError::internal(e)),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
