//! Router-level tests driving every endpoint in-process.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use threat_gateway::classifier::{ClassifierError, Stats};
use threat_gateway::protocol::{
    Encoding, FindThreatMatchesRequest, FindThreatMatchesResponse, ListThreatListsResponse,
    PlatformType, ThreatDescriptor, ThreatEntry, ThreatEntryType, ThreatInfo, ThreatType,
    DEFAULT_THREAT_LISTS, MIME_JSON, MIME_PROTO,
};

mod common;

use common::{gateway, test_config, ScriptedClassifier};

const FIND: &str = "/v4/threatMatches:find";
const LISTS: &str = "/v4/threatLists";

fn malware() -> ThreatDescriptor {
    DEFAULT_THREAT_LISTS[0]
}

fn social() -> ThreatDescriptor {
    DEFAULT_THREAT_LISTS[1]
}

fn router_with(classifier: Arc<ScriptedClassifier>) -> Router {
    gateway(test_config(), classifier)
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_lookup_reports_each_distinct_triple_once() {
    let classifier = Arc::new(
        ScriptedClassifier::new().with_threats("bad1url.org", &[malware(), social(), malware()]),
    );
    let router = router_with(classifier.clone());

    let body = r#"{"threatInfo":{"threatEntries":[{"url":"google.com"},{"url":"bad1url.org"}]}}"#;
    let response = send(router, post(FIND, MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_JSON);
    let decoded: FindThreatMatchesResponse = Encoding::Json.decode(&body_bytes(response).await).unwrap();

    assert_eq!(decoded.matches.len(), 2);
    assert!(decoded.matches.iter().all(|m| m.url() == Some("bad1url.org")));
    let triples: Vec<_> = decoded.matches.iter().map(|m| m.descriptor()).collect();
    assert_eq!(triples, vec![malware(), social()]);

    assert_eq!(classifier.calls(), 1);
    assert_eq!(classifier.batches()[0], vec!["google.com", "bad1url.org"]);
}

#[tokio::test]
async fn test_lookup_json_field_names() {
    let classifier = Arc::new(ScriptedClassifier::new().with_threats("bad1url.org", &[malware()]));
    let router = router_with(classifier);

    let body = r#"{"threatInfo":{"threatEntries":[{"url":"bad1url.org"}]}}"#;
    let response = send(router, post(FIND, MIME_JSON, body)).await;
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "matches": [{
                "threatType": "MALWARE",
                "platformType": "ANY_PLATFORM",
                "threat": {"url": "bad1url.org"},
                "threatEntryType": "URL"
            }]
        })
    );
}

#[tokio::test]
async fn test_lookup_rejects_hash_entry_without_classifier_call() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let router = router_with(classifier.clone());

    let body = r#"{"threatInfo":{"threatEntries":[{"url":"google.com"},{"url":"bad1url.org","hash":"abcd"}]}}"#;
    let response = send(router, post(FIND, MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "only ThreatEntry.Url may be set");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_rejects_empty_url() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let router = router_with(classifier.clone());

    let body = r#"{"threatInfo":{"threatEntries":[{"url":""}]}}"#;
    let response = send(router, post(FIND, MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_wrong_method() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let response = send(router_with(classifier.clone()), get(FIND)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid method");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_unrecognized_content_type() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let response = send(
        router_with(classifier.clone()),
        post(FIND, "text/plain", "url=google.com"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid interchange format");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_unrecognized_content_type_with_alt_skips_decoding() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let router = router_with(classifier.clone());

    let response = send(router, post(&format!("{FIND}?alt=json"), "text/plain", "garbage")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "{}");
    assert_eq!(classifier.batches(), vec![Vec::<String>::new()]);
}

#[tokio::test]
async fn test_lookup_malformed_body() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let response = send(
        router_with(classifier.clone()),
        post(FIND, MIME_JSON, r#"{"threatInfo":"#),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_text(response).await.is_empty());
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_binary_round_trip() {
    let classifier = Arc::new(ScriptedClassifier::new().with_threats("evil.example", &[social()]));
    let router = router_with(classifier);

    let request = FindThreatMatchesRequest {
        client: None,
        threat_info: Some(ThreatInfo {
            threat_entries: vec![ThreatEntry::url("evil.example"), ThreatEntry::url("fine.example")],
            ..ThreatInfo::default()
        }),
    };
    let body = Encoding::Proto.encode(&request).unwrap();
    let response = send(router, post(FIND, MIME_PROTO, body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_PROTO);
    let decoded: FindThreatMatchesResponse = Encoding::Proto.decode(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.matches.len(), 1);
    assert_eq!(decoded.matches[0].url(), Some("evil.example"));
    assert_eq!(decoded.matches[0].descriptor(), social());
}

#[tokio::test]
async fn test_lookup_alt_overrides_content_type() {
    let classifier = Arc::new(ScriptedClassifier::new().with_threats("evil.example", &[malware()]));
    let router = router_with(classifier);

    let body = r#"{"threatInfo":{"threatEntries":[{"url":"evil.example"}]}}"#;
    let response = send(router, post(&format!("{FIND}?alt=proto"), MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_PROTO);
    let decoded: FindThreatMatchesResponse = Encoding::Proto.decode(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.matches[0].descriptor(), malware());
}

#[tokio::test]
async fn test_lookup_invalid_alt() {
    let classifier = Arc::new(ScriptedClassifier::new());
    let body = r#"{"threatInfo":{"threatEntries":[{"url":"a.org"}]}}"#;
    let response = send(
        router_with(classifier.clone()),
        post(&format!("{FIND}?alt=xml"), MIME_JSON, body),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid interchange format");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lookup_classifier_failure() {
    let classifier = Arc::new(
        ScriptedClassifier::new().failing(ClassifierError::Upstream("connection refused".into())),
    );
    let body = r#"{"threatInfo":{"threatEntries":[{"url":"a.org"}]}}"#;
    let response = send(router_with(classifier), post(FIND, MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type(&response), "text/plain; charset=utf-8");
    assert_eq!(body_text(response).await, "upstream request failed: connection refused");
}

#[tokio::test]
async fn test_lookup_timeout() {
    let classifier = Arc::new(ScriptedClassifier::new().with_delay(Duration::from_secs(3)));
    let body = r#"{"threatInfo":{"threatEntries":[{"url":"slow.example"}]}}"#;
    let response = send(router_with(classifier), post(FIND, MIME_JSON, body)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "classifier lookup timed out after 1 seconds");
}

#[tokio::test]
async fn test_lookup_body_limit() {
    let mut config = test_config();
    config.security.max_body_size = 64;
    let router = gateway(config, Arc::new(ScriptedClassifier::new()));

    let response = send(router, post(FIND, MIME_JSON, vec![b' '; 1024])).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_lists_default_set_binary() {
    let response = send(
        router_with(Arc::new(ScriptedClassifier::new())),
        get(&format!("{LISTS}?alt=proto")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_PROTO);
    let decoded: ListThreatListsResponse = Encoding::Proto.decode(&body_bytes(response).await).unwrap();
    let expected: Vec<_> = DEFAULT_THREAT_LISTS.iter().copied().map(Into::into).collect();
    assert_eq!(decoded.threat_lists, expected);
}

#[tokio::test]
async fn test_lists_default_encoding_is_json() {
    let response = send(router_with(Arc::new(ScriptedClassifier::new())), get(LISTS)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_JSON);
    let decoded: ListThreatListsResponse = Encoding::Json.decode(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.threat_lists.len(), 3);
}

#[tokio::test]
async fn test_lists_configured_order() {
    let configured = vec![
        ThreatDescriptor::new(ThreatType::UnwantedSoftware, PlatformType::Windows, ThreatEntryType::Url),
        ThreatDescriptor::new(ThreatType::Malware, PlatformType::Linux, ThreatEntryType::Executable),
    ];
    let mut config = test_config();
    config.classifier.threat_lists = configured.clone();
    let classifier = Arc::new(ScriptedClassifier::new());
    let router = gateway(config, classifier.clone());

    let response = send(router, get(&format!("{LISTS}?alt={MIME_JSON}"))).await;
    let decoded: ListThreatListsResponse = Encoding::Json.decode(&body_bytes(response).await).unwrap();
    let expected: Vec<_> = configured.into_iter().map(Into::into).collect();
    assert_eq!(decoded.threat_lists, expected);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_lists_wrong_method_and_invalid_alt() {
    let router = router_with(Arc::new(ScriptedClassifier::new()));

    let response = send(router.clone(), post(LISTS, MIME_JSON, "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid method");

    let response = send(router, get(&format!("{LISTS}?alt=yaml"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid interchange format");
}

#[tokio::test]
async fn test_status_reports_error_with_200() {
    let stats = Stats {
        queries_by_database: 132,
        queries_by_cache: 31,
        queries_by_api: 6,
        queries_fail: 2,
    };
    let classifier = Arc::new(
        ScriptedClassifier::new()
            .with_stats(stats)
            .with_last_error(ClassifierError::UpstreamStatus {
                status: 503,
                body: "unavailable".into(),
            }),
    );

    for method in [Method::GET, Method::POST, Method::DELETE] {
        let request = Request::builder()
            .method(method)
            .uri("/status")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::empty())
            .unwrap();
        let response = send(router_with(classifier.clone()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), MIME_JSON);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["Stats"]["QueriesByDatabase"], 132);
        assert_eq!(json["Stats"]["QueriesByAPI"], 6);
        assert_eq!(json["Error"], "upstream returned status 503: unavailable");
    }
}

#[tokio::test]
async fn test_status_without_error() {
    let response = send(router_with(Arc::new(ScriptedClassifier::new())), get("/status")).await;
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["Error"], "");
    assert_eq!(json["Stats"]["QueriesFail"], 0);
}

#[tokio::test]
async fn test_health_any_method() {
    for method in [Method::GET, Method::POST, Method::PUT] {
        let request = Request::builder()
            .method(method)
            .uri("/_ah/health")
            .body(Body::empty())
            .unwrap();
        let response = send(router_with(Arc::new(ScriptedClassifier::new())), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }
}

#[tokio::test]
async fn test_static_assets() {
    let router = router_with(Arc::new(ScriptedClassifier::new()));

    let response = send(router.clone(), get("/public/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/html; charset=utf-8");
    let index = body_bytes(response).await;

    let response = send(router.clone(), get("/public/index.html")).await;
    assert_eq!(body_bytes(response).await, index);

    let response = send(router.clone(), get("/public/style.css")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/css; charset=utf-8");

    let response = send(router.clone(), get("/public")).await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/public/");

    let response = send(router.clone(), get("/public/missing.js")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(router.clone(), get("/public/../Cargo.toml")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(router, post("/public/app.js", MIME_JSON, "{}")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_response_headers() {
    let response = send(router_with(Arc::new(ScriptedClassifier::new())), get("/_ah/health")).await;
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let mut config = test_config();
    config.security.enable_headers = false;
    let response = send(gateway(config, Arc::new(ScriptedClassifier::new())), get("/_ah/health")).await;
    assert!(!response.headers().contains_key("x-content-type-options"));
}

#[tokio::test]
async fn test_unknown_path() {
    let response = send(router_with(Arc::new(ScriptedClassifier::new())), get("/v4/fullHashes:find")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repeated_alt_uses_first_value() {
    let classifier = Arc::new(ScriptedClassifier::new().with_threats("evil.example", &[malware()]));
    let router = router_with(classifier.clone());

    let response = send(router.clone(), get(&format!("{LISTS}?alt=json&alt=json"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_JSON);

    let response = send(router.clone(), get(&format!("{LISTS}?alt=proto&alt=xml"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_PROTO);

    let body = r#"{"threatInfo":{"threatEntries":[{"url":"evil.example"}]}}"#;
    let response = send(router.clone(), post(&format!("{FIND}?alt=proto&alt=json"), MIME_JSON, body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), MIME_PROTO);
    let decoded: FindThreatMatchesResponse = Encoding::Proto.decode(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.matches[0].url(), Some("evil.example"));

    let response = send(router, get(&format!("{FIND}?alt=proto&alt=json"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid method");
}

#[tokio::test]
async fn test_lists_checks_alt_before_method() {
    let router = router_with(Arc::new(ScriptedClassifier::new()));

    let response = send(router.clone(), post(&format!("{LISTS}?alt=xml&alt=json"), MIME_JSON, "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid interchange format");

    let response = send(router, post(&format!("{LISTS}?alt=json&alt=xml"), MIME_JSON, "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid method");
}
