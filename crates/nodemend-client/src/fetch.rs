//! Remote node listing.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use nodemend_core::config::ApiConfig;
use nodemend_core::{NodeObservation, RemediationTable};

/// Boxed future returned by [`NodeSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Vec<NodeObservation>> + Send + 'a>>;

/// Lists the current observations for nodes matching `filter_key`.
///
/// Implementations return an empty listing on any failure and log it
/// themselves.
pub trait NodeSource: Send + Sync {
    fn fetch<'a>(&'a self, filter_key: &'a str) -> FetchFuture<'a>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

// ── Wire format ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    nodes: Vec<ApiNode>,
}

#[derive(Debug, Deserialize)]
struct ApiNode {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: ApiSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSource {
    #[serde(default)]
    last_check: i64,
    #[serde(default = "default_eligible")]
    eligible: bool,
    eligibility_cause_str: Option<String>,
    ip_and_dns: Option<IpAndDns>,
}

#[derive(Debug, Deserialize)]
struct IpAndDns {
    port: Option<i64>,
}

fn default_eligible() -> bool {
    true
}

impl ApiNode {
    fn into_observation(self) -> NodeObservation {
        NodeObservation {
            id: self.id,
            last_check_timestamp: self.source.last_check,
            eligible: self.source.eligible,
            eligibility_cause: self.source.eligibility_cause_str,
            port: self.source.ip_and_dns.and_then(|ip| ip.port),
            remediated: false,
        }
    }
}

/// Decode a listing body, dropping nodes whose port is outside `table`.
///
/// Nodes that report no port are kept so the eligibility filter can flag
/// them.
pub fn parse_listing(body: &[u8], table: &RemediationTable) -> Result<Vec<NodeObservation>, FetchError> {
    let response: ApiResponse = serde_json::from_slice(body)?;
    let total = response.nodes.len();
    let nodes: Vec<NodeObservation> = response
        .nodes
        .into_iter()
        .map(ApiNode::into_observation)
        .filter(|node| match node.port {
            Some(port) if !table.contains(port) => {
                debug!(node_id = %node.id, port, "dropping node on inert port");
                false
            }
            _ => true,
        })
        .collect();
    debug!(total, kept = nodes.len(), "listing decoded");
    Ok(nodes)
}

// ── HTTP source ────────────────────────────────────────────────────

/// [`NodeSource`] that queries the node listing API over HTTPS.
pub struct HttpNodeSource {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
    table: RemediationTable,
}

impl HttpNodeSource {
    pub fn new(
        config: &ApiConfig,
        timeout: std::time::Duration,
        table: RemediationTable,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Config(format!("header {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Config(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("nodemend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            page_size: config.page_size,
            table,
        })
    }

    /// Fetch and decode, surfacing the failure cause.
    pub async fn try_fetch(&self, filter_key: &str) -> Result<Vec<NodeObservation>, FetchError> {
        info!(endpoint = %self.endpoint, filter = filter_key, "requesting node listing");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("page", "1".to_string()),
                ("size", self.page_size.to_string()),
                ("search", filter_key.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        parse_listing(&body, &self.table)
    }
}

impl NodeSource for HttpNodeSource {
    fn fetch<'a>(&'a self, filter_key: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match self.try_fetch(filter_key).await {
                Ok(nodes) => {
                    info!(count = nodes.len(), "retrieved nodes from API");
                    nodes
                }
                Err(FetchError::Status(status)) => {
                    warn!(%status, "node listing returned non-success status");
                    Vec::new()
                }
                Err(e) => {
                    error!(error = %e, "node listing failed");
                    Vec::new()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const LISTING: &str = r#"{
        "nodes": [
            {"_id": "a", "_source": {"id": "a", "lastCheck": 1000, "eligible": false,
              "eligibilityCauseStr": "low-uptime", "ipAndDns": {"ip": "10.0.0.1", "port": 3002}}},
            {"_id": "b", "_source": {"lastCheck": 2000, "eligible": true, "ipAndDns": {"port": 9000}}},
            {"_id": "c", "_source": {"lastCheck": 3000, "eligible": false, "ipAndDns": {"port": 3008}}},
            {"_id": "d", "_source": {"lastCheck": 4000}}
        ],
        "total": 4
    }"#;

    #[test]
    fn parses_listing_and_drops_inert_ports() {
        let nodes = parse_listing(LISTING.as_bytes(), &RemediationTable::default()).unwrap();
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "d"]);

        let a = &nodes[0];
        assert_eq!(a.last_check_timestamp, 1000);
        assert!(!a.eligible);
        assert_eq!(a.eligibility_cause.as_deref(), Some("low-uptime"));
        assert_eq!(a.port, Some(3002));
        assert!(!a.remediated);
    }

    #[test]
    fn missing_fields_take_source_defaults() {
        let nodes = parse_listing(LISTING.as_bytes(), &RemediationTable::default()).unwrap();
        let d = &nodes[2];
        assert!(d.eligible);
        assert_eq!(d.port, None);
        assert_eq!(d.eligibility_cause, None);
    }

    #[test]
    fn empty_or_missing_nodes_key_is_empty() {
        let table = RemediationTable::default();
        assert!(parse_listing(b"{}", &table).unwrap().is_empty());
        assert!(parse_listing(br#"{"nodes": []}"#, &table).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = parse_listing(b"<html>", &RemediationTable::default()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn invalid_header_is_rejected() {
        let mut config = ApiConfig::default();
        config.headers.insert("bad header".to_string(), "x".to_string());
        let result = HttpNodeSource::new(&config, Duration::from_secs(1), RemediationTable::default());
        assert!(matches!(result, Err(FetchError::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_empty() {
        let config = ApiConfig {
            endpoint: "http://127.0.0.1:1/nodes".to_string(),
            ..ApiConfig::default()
        };
        let source =
            HttpNodeSource::new(&config, Duration::from_millis(500), RemediationTable::default())
                .unwrap();
        assert!(source.fetch("10.0.0.1").await.is_empty());
    }
}
