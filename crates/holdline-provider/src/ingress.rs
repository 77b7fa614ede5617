//! Public-ingress seam: exposing the locally bound webhook listener to the
//! telephony provider.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// Makes a locally bound port reachable from the public internet and returns
/// the public base URL the provider should call back on.
#[async_trait]
pub trait Ingress: Send + Sync {
    async fn expose(&self, local_port: u16) -> Result<String, ProviderError>;
}

/// Ingress for deployments already reachable at a fixed address (reverse
/// proxy, port forward). Returns the configured URL as-is.
#[derive(Debug, Clone)]
pub struct StaticIngress {
    public_url: String,
}

impl StaticIngress {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Ingress for StaticIngress {
    async fn expose(&self, _local_port: u16) -> Result<String, ProviderError> {
        Ok(self.public_url.clone())
    }
}

/// Ingress backed by a locally running ngrok agent, driven over its HTTP API.
#[derive(Debug)]
pub struct NgrokIngress {
    agent_api: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TunnelResource {
    public_url: String,
}

impl NgrokIngress {
    pub fn new(agent_api: impl Into<String>) -> Self {
        Self {
            agent_api: agent_api.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Ingress for NgrokIngress {
    async fn expose(&self, local_port: u16) -> Result<String, ProviderError> {
        info!(local_port, "requesting ngrok tunnel");
        let response = self
            .http
            .post(format!("{}/api/tunnels", self.agent_api))
            .json(&serde_json::json!({
                "name": "holdline",
                "proto": "http",
                "addr": local_port.to_string(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Ingress(format!(
                "ngrok agent rejected tunnel request ({status}): {body}"
            )));
        }

        let tunnel: TunnelResource = response.json().await?;
        info!(public_url = %tunnel.public_url, "tunnel established");
        Ok(tunnel.public_url.trim_end_matches('/').to_string())
    }
}
