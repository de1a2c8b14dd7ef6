//! `/v4/threatMatches:find`: look up a batch of URLs.
//!
//! # Steps
//! 1. POST only
//! 2. Negotiate the response encoding, decode the body
//! 3. Reject the batch if any entry is not a pure URL entry
//! 4. One classifier call for the whole batch, bounded by the lookup timeout
//! 5. One match per distinct descriptor per URL, URLs in input order

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method},
    response::Response,
};
use std::collections::HashSet;

use crate::classifier::{ClassifierError, UrlThreat};
use crate::http::error::ApiError;
use crate::http::server::{alt_param, encoded, AppState};
use crate::observability::metrics;
use crate::protocol::negotiate;
use crate::protocol::{FindThreatMatchesRequest, FindThreatMatchesResponse, ThreatMatch};

pub async fn find_threat_matches(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method != Method::POST {
        return Err(ApiError::InvalidMethod);
    }

    let alt = alt_param(query.as_deref());
    let encoding = negotiate::response_encoding(alt.as_deref(), &headers)?;
    let request: FindThreatMatchesRequest = match negotiate::request_encoding(&headers) {
        Some(inbound) => inbound.decode(&body).map_err(ApiError::MalformedBody)?,
        None => FindThreatMatchesRequest::default(),
    };

    let urls = requested_urls(&request)?;
    tracing::debug!(urls = urls.len(), encoding = ?encoding, "Looking up URLs");

    let lookup = state.classifier.lookup_urls(&urls);
    let results = match tokio::time::timeout(state.lookup_timeout, lookup).await {
        Ok(results) => results?,
        Err(_) => return Err(ClassifierError::Timeout(state.lookup_timeout.as_secs()).into()),
    };

    let response = compose_matches(&urls, results)?;
    metrics::record_lookup(urls.len(), response.matches.len());
    encoded(encoding, &response)
}

/// URLs of the request's entries, in order. Any entry that is not a pure
/// URL entry rejects the whole batch.
pub fn requested_urls(request: &FindThreatMatchesRequest) -> Result<Vec<String>, ApiError> {
    request
        .threat_entries()
        .iter()
        .map(|entry| {
            if entry.url.is_empty() || !entry.hash.is_empty() {
                Err(ApiError::InvalidThreatEntry)
            } else {
                Ok(entry.url.clone())
            }
        })
        .collect()
}

/// Shape classifier results into a response, collapsing repeated
/// descriptors per URL. Emission order is input URL order, then first
/// occurrence within each URL.
pub fn compose_matches(
    urls: &[String],
    results: Vec<Vec<UrlThreat>>,
) -> Result<FindThreatMatchesResponse, ClassifierError> {
    if results.len() != urls.len() {
        return Err(ClassifierError::ResultCount {
            expected: urls.len(),
            actual: results.len(),
        });
    }

    let mut response = FindThreatMatchesResponse::default();
    for (url, threats) in urls.iter().zip(results) {
        let mut seen = HashSet::new();
        for threat in threats {
            if seen.insert(threat.descriptor) {
                response.matches.push(ThreatMatch::new(url, threat.descriptor));
            }
        }
    }
    Ok(response)
}
