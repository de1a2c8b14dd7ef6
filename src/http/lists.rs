//! `/v4/threatLists`: the threat lists this gateway subscribes to.

use axum::{
    extract::{RawQuery, State},
    http::Method,
    response::Response,
};

use crate::http::error::ApiError;
use crate::http::server::{alt_param, encoded, AppState};
use crate::protocol::negotiate;
use crate::protocol::ListThreatListsResponse;

/// Echo the subscribed lists in configuration order. No classifier call.
pub async fn list_threat_lists(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let encoding = negotiate::listing_encoding(alt_param(query.as_deref()).as_deref())?;
    if method != Method::GET {
        return Err(ApiError::InvalidMethod);
    }

    let response = ListThreatListsResponse {
        threat_lists: state.threat_lists.iter().copied().map(Into::into).collect(),
    };
    encoded(encoding, &response)
}
