//! Threat-lookup gateway.
//!
//! Serves a Lookup-API compatible HTTP interface in front of a URL threat
//! classifier.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ GatewayServer ──▶ lookup / lists / status / health / public
//!                     │                 │
//!                     │                 ▼
//!                     │          ThreatClassifier (ApiClassifier)
//!                     │                 │          │
//!                     │           VerdictStore   Lookup API (upstream)
//!                     ▼
//!          tracing · metrics · request-id · timeouts · body limits
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use threat_gateway::config::{load_config, validate_config, GatewayConfig};
use threat_gateway::lifecycle::{signals, Shutdown};
use threat_gateway::observability::{logging, metrics};
use threat_gateway::{ApiClassifier, GatewayServer};

#[derive(Parser, Debug)]
#[command(name = "threat-gateway", version)]
#[command(about = "Lookup-API compatible gateway in front of a URL threat classifier")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lookup API key. Overrides classifier.api_key.
    #[arg(long)]
    apikey: Option<String>,

    /// Address to listen on. Overrides listener.bind_address.
    #[arg(long)]
    srvaddr: Option<String>,

    /// Verdict database path. Overrides classifier.db_path.
    #[arg(long)]
    db: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(key) = self.apikey {
            config.classifier.api_key = key;
        }
        if let Some(addr) = self.srvaddr {
            config.listener.bind_address = addr;
        }
        if let Some(db) = self.db {
            config.classifier.db_path = Some(db);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("threat-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match cli.config.take() {
        Some(path) => load_config(&path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "threat-gateway starting");

    validate_config(&config).map_err(threat_gateway::config::ConfigError::Validation)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        lookup_timeout_secs = config.timeouts.lookup_secs,
        db_path = ?config.classifier.db_path,
        "Configuration loaded"
    );

    let classifier = Arc::new(ApiClassifier::new(&config.classifier)?);

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    let purger = tokio::spawn(classifier.clone().run_purger(
        Duration::from_secs(config.classifier.purge_interval_secs),
        shutdown.subscribe(),
    ));

    let server = GatewayServer::new(config, classifier.clone());
    server.run(listener, shutdown.subscribe()).await?;
    shutdown.trigger();
    let _ = purger.await;

    if let Err(e) = classifier.persist() {
        tracing::error!(error = %e, "Failed to persist verdict database");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
