//! Wire codec: one message schema, two encodings.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const MIME_JSON: &str = "application/json";
pub const MIME_PROTO: &str = "application/x-protobuf";

/// Errors produced while encoding or decoding a message body.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Proto(#[from] prost::DecodeError),
}

/// A message that can travel in either encoding.
pub trait WireMessage: prost::Message + Default + Serialize + DeserializeOwned {}

impl<T> WireMessage for T where T: prost::Message + Default + Serialize + DeserializeOwned {}

/// Wire encoding of a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Field-name based JSON (protobuf JSON mapping).
    Json,
    /// Positional protobuf binary.
    Proto,
}

impl Encoding {
    pub fn mime(self) -> &'static str {
        match self {
            Encoding::Json => MIME_JSON,
            Encoding::Proto => MIME_PROTO,
        }
    }

    /// Encoding named by a full MIME type, ignoring parameters and case.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(MIME_JSON) {
            Some(Encoding::Json)
        } else if essence.eq_ignore_ascii_case(MIME_PROTO) {
            Some(Encoding::Proto)
        } else {
            None
        }
    }

    pub fn encode<M: WireMessage>(self, message: &M) -> Result<Vec<u8>, CodecError> {
        match self {
            Encoding::Json => Ok(serde_json::to_vec(message)?),
            Encoding::Proto => Ok(message.encode_to_vec()),
        }
    }

    pub fn decode<M: WireMessage>(self, bytes: &[u8]) -> Result<M, CodecError> {
        match self {
            Encoding::Json => Ok(serde_json::from_slice(bytes)?),
            Encoding::Proto => Ok(M::decode(bytes)?),
        }
    }
}
