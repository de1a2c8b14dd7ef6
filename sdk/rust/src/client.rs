use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned error status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatEntry {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreatMatch {
    pub threat_type: String,
    pub platform_type: String,
    pub threat_entry_type: String,
    pub threat: ThreatEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindThreatMatchesResponse {
    #[serde(default)]
    pub matches: Vec<ThreatMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreatListDescriptor {
    pub threat_type: String,
    pub platform_type: String,
    pub threat_entry_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListThreatListsResponse {
    #[serde(default)]
    pub threat_lists: Vec<ThreatListDescriptor>,
}

/// Body of `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(rename = "Stats")]
    pub stats: serde_json::Value,
    #[serde(rename = "Error")]
    pub error: String,
}

pub struct GatewayClient {
    client: Client,
    gateway_url: String,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up `urls`, returning every match the gateway reports.
    pub async fn find_threat_matches(
        &self,
        urls: &[&str],
    ) -> Result<FindThreatMatchesResponse, ClientError> {
        let entries: Vec<_> = urls.iter().map(|url| json!({ "url": url })).collect();
        let resp = self
            .client
            .post(format!("{}/v4/threatMatches:find", self.gateway_url))
            .json(&json!({ "threatInfo": { "threatEntries": entries } }))
            .send()
            .await?;
        parse(resp).await
    }

    /// Threat lists the gateway is subscribed to.
    pub async fn threat_lists(&self) -> Result<ListThreatListsResponse, ClientError> {
        let resp = self
            .client
            .get(format!("{}/v4/threatLists", self.gateway_url))
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        let resp = self
            .client
            .get(format!("{}/status", self.gateway_url))
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn health(&self) -> Result<String, ClientError> {
        let resp = self
            .client
            .get(format!("{}/_ah/health", self.gateway_url))
            .send()
            .await?;
        success_text(resp).await
    }
}

async fn success_text(resp: Response) -> Result<String, ClientError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let text = success_text(resp).await?;
    Ok(serde_json::from_str(&text)?)
}
