//! Error kinds and the result envelope returned to analytics callers

use rand::RngExt;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Stable error code exposed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{0}")]
    BadInput(String),
    #[error("{0}")]
    NotFound(String),
    /// Details are logged server-side under `corr_id`; only the id is returned
    #[error("Internal error while building analytics (corrId: {corr_id})")]
    Internal { corr_id: String },
}

impl AnalyticsError {
    /// Log an unexpected failure under a fresh correlation id
    pub fn internal(err: anyhow::Error) -> Self {
        let corr_id = new_correlation_id();
        error!(corr_id = %corr_id, error = ?err, "analytics request failed");
        AnalyticsError::Internal { corr_id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::BadInput(_) => ErrorKind::BadInput,
            AnalyticsError::NotFound(_) => ErrorKind::NotFound,
            AnalyticsError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn corr_id(&self) -> Option<&str> {
        match self {
            AnalyticsError::Internal { corr_id } => Some(corr_id),
            _ => None,
        }
    }
}

fn new_correlation_id() -> String {
    format!("{:016x}", rand::rng().random::<u64>())
}

/// Result envelope: `{"ok":true,"value":..}` or `{"ok":false,"code":..,"message":..}`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Ok {
        ok: bool,
        value: T,
    },
    Err {
        ok: bool,
        code: ErrorKind,
        message: String,
        #[serde(rename = "corrId", skip_serializing_if = "Option::is_none")]
        corr_id: Option<String>,
    },
}

impl<T> Envelope<T> {
    pub fn ok(value: T) -> Self {
        Envelope::Ok { ok: true, value }
    }

    pub fn err(err: &AnalyticsError) -> Self {
        Envelope::Err {
            ok: false,
            code: err.kind(),
            message: err.to_string(),
            corr_id: err.corr_id().map(str::to_string),
        }
    }
}

impl<T> From<Result<T, AnalyticsError>> for Envelope<T> {
    fn from(result: Result<T, AnalyticsError>) -> Self {
        match result {
            Ok(value) => Envelope::ok(value),
            Err(err) => Envelope::err(&err),
        }
    }
}
