//! Content negotiation between the two wire encodings.
//!
//! # Rules
//! ```text
//! inbound  : Content-Type header only; unrecognized → body left undecoded
//! outbound : ?alt=  ("json" | "proto" | full MIME)
//!            else Content-Type header (full MIME)
//!            else → "invalid interchange format"
//! listing  : ?alt=  ("" | "json" | "proto" | full MIME), no body to inspect
//! ```

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use thiserror::Error;

use crate::protocol::codec::{Encoding, MIME_JSON, MIME_PROTO};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid interchange format")]
pub struct NegotiationError;

impl Encoding {
    /// Parse an explicit `alt` selector. Values compare exactly.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "json" | MIME_JSON => Some(Encoding::Json),
            "proto" | MIME_PROTO => Some(Encoding::Proto),
            _ => None,
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
}

/// Encoding of the request body, if the declared Content-Type names one.
pub fn request_encoding(headers: &HeaderMap) -> Option<Encoding> {
    content_type(headers).and_then(Encoding::from_mime)
}

/// Encoding for a response to a body-bearing request.
pub fn response_encoding(alt: Option<&str>, headers: &HeaderMap) -> Result<Encoding, NegotiationError> {
    let encoding = match alt.filter(|alt| !alt.is_empty()) {
        Some(alt) => Encoding::from_selector(alt),
        None => content_type(headers).and_then(Encoding::from_mime),
    };
    encoding.ok_or(NegotiationError)
}

/// Encoding for a response to a body-less request; JSON unless overridden.
pub fn listing_encoding(alt: Option<&str>) -> Result<Encoding, NegotiationError> {
    match alt.unwrap_or_default() {
        "" => Ok(Encoding::Json),
        alt => Encoding::from_selector(alt).ok_or(NegotiationError),
    }
}
