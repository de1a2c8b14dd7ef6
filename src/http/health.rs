//! `/_ah/health`: liveness check.

pub async fn serve_health() -> &'static str {
    "ok"
}
