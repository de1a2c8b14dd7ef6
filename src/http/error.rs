//! Endpoint error type.
//!
//! Every failure is turned into a plain-text response here; nothing reaches
//! the router unhandled.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::protocol::{CodecError, NegotiationError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid method")]
    InvalidMethod,

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// Request body could not be decoded.
    #[error("{0}")]
    MalformedBody(CodecError),

    #[error("only ThreatEntry.Url may be set")]
    InvalidThreatEntry,

    #[error("{0}")]
    Classifier(#[from] ClassifierError),

    /// Response body could not be encoded.
    #[error("{0}")]
    Encode(CodecError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidMethod
            | ApiError::Negotiation(_)
            | ApiError::MalformedBody(_)
            | ApiError::InvalidThreatEntry => StatusCode::BAD_REQUEST,
            ApiError::Classifier(_) | ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "Rejected request");
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
