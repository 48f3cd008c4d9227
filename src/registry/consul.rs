//! Consul agent registration
//!
//! Uses `PUT /v1/agent/service/register`, which replaces any service with
//! the same `ID` on that agent.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::{CheckProtocol, HealthCheck, Registry, RegistrationRequest};
use crate::error::{BeaconError, Result};

pub const DEFAULT_AGENT_PORT: u16 = 8500;

const REGISTER_PATH: &str = "v1/agent/service/register";

/// Which Consul agent receives a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAddress {
    /// The agent running on the registered leader's host
    CoLocated { port: u16 },
    /// One agent for every registration
    Fixed(Url),
}

impl Default for AgentAddress {
    fn default() -> Self {
        Self::CoLocated {
            port: DEFAULT_AGENT_PORT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    tags: &'a [String],
    address: &'a str,
    port: u16,
    check: AgentServiceCheck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck {
    #[serde(rename = "TCP")]
    tcp: String,
    interval: String,
    timeout: String,
}

impl From<&HealthCheck> for AgentServiceCheck {
    fn from(check: &HealthCheck) -> Self {
        let tcp = match check.protocol {
            CheckProtocol::Tcp => check.target.to_string(),
        };
        Self {
            tcp,
            interval: consul_duration(check.interval),
            timeout: consul_duration(check.timeout),
        }
    }
}

/// Consul's Go-style duration strings ("10s", "1500ms")
fn consul_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

pub struct ConsulRegistry {
    http: reqwest::Client,
    agent: AgentAddress,
    token: Option<String>,
}

impl ConsulRegistry {
    pub fn new(
        agent: AgentAddress,
        token: Option<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| BeaconError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, agent, token })
    }

    fn register_url(&self, request: &RegistrationRequest) -> String {
        let base = match &self.agent {
            AgentAddress::CoLocated { port } => {
                let mut agent = request.endpoint.clone();
                agent.port = *port;
                agent.http_base()
            }
            AgentAddress::Fixed(url) => url.as_str().trim_end_matches('/').to_string(),
        };
        format!("{}/{}", base, REGISTER_PATH)
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn publish(&self, request: &RegistrationRequest) -> Result<()> {
        let url = self.register_url(request);
        let body = AgentServiceRegistration {
            id: &request.id,
            name: &request.name,
            tags: &request.tags,
            address: &request.endpoint.host,
            port: request.endpoint.port,
            check: AgentServiceCheck::from(&request.check),
        };

        debug!(id = %request.id, url = %url, "Registering service with Consul");

        let mut builder = self.http.put(&url).json(&body);
        if let Some(ref token) = self.token {
            builder = builder.header("X-Consul-Token", token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BeaconError::PublishFailed {
                id: request.id.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BeaconError::PublishFailed {
                id: request.id.clone(),
                reason: format!("HTTP {}: {}", status, text.trim()),
            });
        }

        Ok(())
    }
}
