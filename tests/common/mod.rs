//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use axum::Router;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use threat_gateway::classifier::{ClassifierError, Stats, ThreatClassifier, UrlThreat};
use threat_gateway::lifecycle::Shutdown;
use threat_gateway::protocol::ThreatDescriptor;
use threat_gateway::{GatewayConfig, GatewayServer};

/// In-memory classifier answering from a fixed table and recording every batch.
#[derive(Default)]
pub struct ScriptedClassifier {
    results: HashMap<String, Vec<UrlThreat>>,
    failure: Option<ClassifierError>,
    last_error: Option<ClassifierError>,
    delay: Option<Duration>,
    stats: Stats,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `descriptors` (duplicates kept) for `url`.
    pub fn with_threats(mut self, url: &str, descriptors: &[ThreatDescriptor]) -> Self {
        let threats = descriptors
            .iter()
            .map(|d| UrlThreat {
                pattern: url.to_string(),
                descriptor: *d,
            })
            .collect();
        self.results.insert(url.to_string(), threats);
        self
    }

    /// Fail every lookup with `error`.
    pub fn failing(mut self, error: ClassifierError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Report `error` from `status()`.
    pub fn with_last_error(mut self, error: ClassifierError) -> Self {
        self.last_error = Some(error);
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    /// Sleep before answering each lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl ThreatClassifier for ScriptedClassifier {
    fn lookup_urls<'a>(
        &'a self,
        urls: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<UrlThreat>>, ClassifierError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(urls.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            Ok(urls
                .iter()
                .map(|url| self.results.get(url).cloned().unwrap_or_default())
                .collect())
        }
        .boxed()
    }

    fn status(&self) -> (Stats, Option<ClassifierError>) {
        (self.stats.clone(), self.last_error.clone())
    }
}

/// Config with short timeouts suitable for tests.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.classifier.api_key = "test-key".into();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.lookup_secs = 1;
    config.timeouts.request_secs = 5;
    config
}

/// Fully layered router over `classifier`.
pub fn gateway(config: GatewayConfig, classifier: Arc<dyn ThreatClassifier>) -> Router {
    GatewayServer::new(config, classifier).router()
}

/// Serve the gateway on an ephemeral port. Trigger the returned
/// [`Shutdown`] to stop it.
pub async fn spawn_gateway(
    config: GatewayConfig,
    classifier: Arc<dyn ThreatClassifier>,
) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, classifier);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

/// One request seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

/// Start a programmable mock upstream on an ephemeral port. `f` receives
/// each request and returns the status code and body to answer with.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            403 => "403 Forbidden",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        head,
        body: buf[header_end..].to_vec(),
    })
}
