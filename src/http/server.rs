//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all endpoints
//! - Wire up middleware (tracing, limits, request ID, timeouts, headers)
//! - Bind the router to a listener and drain on shutdown
//!
//! # Routes
//! ```text
//! /v4/threatMatches:find   any method, POST accepted
//! /v4/threatLists          any method, GET accepted
//! /status                  stats + last classifier error
//! /_ah/health              liveness
//! /public, /public/*       bundled static files
//! ```

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::classifier::ThreatClassifier;
use crate::config::GatewayConfig;
use crate::http::assets::{redirect_to_index, serve_asset, serve_index};
use crate::http::error::ApiError;
use crate::http::health::serve_health;
use crate::http::lists::list_threat_lists;
use crate::http::lookup::find_threat_matches;
use crate::http::status::serve_status;
use crate::observability::metrics;
use crate::protocol::{Encoding, ThreatDescriptor, WireMessage};

pub const FIND_THREAT_MATCHES_PATH: &str = "/v4/threatMatches:find";
pub const THREAT_LISTS_PATH: &str = "/v4/threatLists";
pub const STATUS_PATH: &str = "/status";
pub const HEALTH_PATH: &str = "/_ah/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn ThreatClassifier>,
    pub threat_lists: Arc<[ThreatDescriptor]>,
    pub lookup_timeout: Duration,
}

/// First `alt` value of a raw query string. Later repeats are ignored.
pub fn alt_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(name, _)| name == "alt")
        .map(|(_, value)| value.into_owned())
}

/// Encode `message` as a full response carrying the encoding's Content-Type.
pub fn encoded<M: WireMessage>(encoding: Encoding, message: &M) -> Result<Response, ApiError> {
    let body = encoding.encode(message).map_err(ApiError::Encode)?;
    Ok(([(header::CONTENT_TYPE, encoding.mime())], body).into_response())
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a server answering lookups through `classifier`.
    pub fn new(config: GatewayConfig, classifier: Arc<dyn ThreatClassifier>) -> Self {
        let state = AppState {
            classifier,
            threat_lists: config.classifier.subscribed_lists().into(),
            lookup_timeout: Duration::from_secs(config.timeouts.lookup_secs),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let router = Router::new()
            .route(FIND_THREAT_MATCHES_PATH, any(find_threat_matches))
            .route(THREAT_LISTS_PATH, any(list_threat_lists))
            .route(STATUS_PATH, any(serve_status))
            .route(HEALTH_PATH, any(serve_health))
            .route("/public", get(redirect_to_index))
            .route("/public/", get(serve_index))
            .route("/public/{*path}", get(serve_asset))
            .route_layer(middleware::from_fn(metrics::track_metrics))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.security.enable_headers {
            router.layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
        } else {
            router
        }
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
