//! `/status`: classifier counters and last error.
//!
//! The classifier's own error is reported in the body, never as an HTTP
//! failure. Only a failure to encode the body yields a 500.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::classifier::Stats;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::protocol::{CodecError, MIME_JSON};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(rename = "Stats")]
    pub stats: Stats,
    /// Empty when the classifier reports no error.
    #[serde(rename = "Error")]
    pub error: String,
}

pub async fn serve_status(State(state): State<AppState>) -> Result<Response, ApiError> {
    let (stats, error) = state.classifier.status();
    let report = StatusReport {
        stats,
        error: error.map(|e| e.to_string()).unwrap_or_default(),
    };
    let body = serde_json::to_vec(&report).map_err(|e| ApiError::Encode(CodecError::Json(e)))?;
    Ok(([(header::CONTENT_TYPE, MIME_JSON)], body).into_response())
}
