//! Analytics API handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::analytics::{
    AnalyticsError, Envelope, ErrorKind, SharedAnalyticsRequest, SponsorAnalyticsRequest,
};
use crate::models::SharedAnalyticsView;

use super::handlers::AppState;

pub(crate) fn status_for(err: &AnalyticsError) -> StatusCode {
    match err.kind() {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(result: Result<SharedAnalyticsView, AnalyticsError>) -> Response {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };

    (status, Json(Envelope::from(result))).into_response()
}

pub(crate) fn rejected(rejection: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::BadInput(rejection.to_string())
}

/// Organizer or sponsor view of a brand's analytics
pub async fn get_shared_analytics(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SharedAnalyticsRequest>, QueryRejection>,
) -> Response {
    let result = match params {
        Ok(Query(params)) => state.analytics.get_shared_analytics(&params).await,
        Err(rejection) => Err(rejected(rejection)),
    };
    respond(result)
}

/// Sponsor-scoped view of a brand's analytics
pub async fn get_sponsor_analytics(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SponsorAnalyticsRequest>, QueryRejection>,
) -> Response {
    let result = match params {
        Ok(Query(params)) => state.analytics.get_sponsor_analytics(&params).await,
        Err(rejection) => Err(rejected(rejection)),
    };
    respond(result)
}
