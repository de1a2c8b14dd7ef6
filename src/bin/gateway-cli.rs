use clap::{Parser, Subcommand};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use threat_gateway::protocol::{
    Encoding, FindThreatMatchesRequest, FindThreatMatchesResponse, ThreatEntry, ThreatInfo,
};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the threat-lookup gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check URLs for threats
    Lookup {
        urls: Vec<String>,
        /// Use the binary wire encoding instead of JSON
        #[arg(long)]
        proto: bool,
    },
    /// Show subscribed threat lists
    Lists,
    /// Show classifier statistics and last error
    Status,
    /// Liveness check
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Lookup { urls, proto } => {
            let encoding = if proto { Encoding::Proto } else { Encoding::Json };
            let request = FindThreatMatchesRequest {
                client: None,
                threat_info: Some(ThreatInfo {
                    threat_entries: urls.into_iter().map(ThreatEntry::url).collect(),
                    ..ThreatInfo::default()
                }),
            };
            let res = client
                .post(format!("{base}/v4/threatMatches:find"))
                .header(CONTENT_TYPE, encoding.mime())
                .header(ACCEPT, encoding.mime())
                .body(encoding.encode(&request)?)
                .send()
                .await?;

            let status = res.status();
            let body = res.bytes().await?;
            if !status.is_success() {
                eprintln!("Error: gateway returned status {}", status);
                eprintln!("Response: {}", String::from_utf8_lossy(&body));
                return Ok(());
            }
            let response: FindThreatMatchesResponse = encoding.decode(&body)?;
            if response.matches.is_empty() {
                println!("No threats found.");
            }
            for m in &response.matches {
                let d = m.descriptor();
                println!(
                    "{}\t{:?}\t{:?}\t{:?}",
                    m.url().unwrap_or_default(),
                    d.threat_type,
                    d.platform_type,
                    d.threat_entry_type
                );
            }
        }
        Commands::Lists => {
            let res = client.get(format!("{base}/v4/threatLists")).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{base}/status")).send().await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{base}/_ah/health")).send().await?;
            let status = res.status();
            println!("{} {}", status, res.text().await?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
