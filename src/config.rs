//! Configuration for leader-beacon
//!
//! CLI arguments and environment variable handling using clap.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::warn;
use url::Url;

use crate::error::{BeaconError, Result};
use crate::registry::consul::{AgentAddress, DEFAULT_AGENT_PORT};

/// leader-beacon - publish Mesos master and framework leaders into Consul
#[derive(Parser, Debug, Clone)]
#[command(name = "leader-beacon")]
#[command(about = "Discovers Mesos and framework leaders and registers them in Consul")]
pub struct Args {
    /// Comma-separated list of Mesos master candidates (host:port)
    #[arg(long, env = "BEACON_NODES", default_value = "127.0.0.1:5050")]
    pub nodes: String,

    /// Comma-separated list of frameworks to discover (e.g. "marathon,chronos")
    #[arg(long, env = "BEACON_FRAMEWORKS", default_value = "marathon,chronos")]
    pub frameworks: String,

    /// Interval in seconds at which to check for topology changes
    #[arg(long, env = "BEACON_INTERVAL_SECS", default_value = "10")]
    pub interval_secs: u64,

    /// Listen address of the healthcheck HTTP server
    #[arg(long, env = "BEACON_HEALTHCHECK", default_value = "0.0.0.0:8080")]
    pub healthcheck: SocketAddr,

    /// Service name used for every registration and as the ID prefix
    #[arg(long, env = "BEACON_SERVICE_NAME", default_value = "mesos")]
    pub service_name: String,

    /// Port of the Consul agent running next to each leader
    #[arg(long, env = "BEACON_CONSUL_PORT", default_value_t = DEFAULT_AGENT_PORT)]
    pub consul_port: u16,

    /// Send every registration to this Consul agent instead of the leader's own
    #[arg(long, env = "BEACON_CONSUL_URL")]
    pub consul_url: Option<String>,

    /// Consul ACL token
    #[arg(long, env = "BEACON_CONSUL_TOKEN")]
    pub consul_token: Option<String>,

    /// Per-request HTTP timeout in milliseconds (unset = no timeout)
    #[arg(long, env = "BEACON_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct BeaconConfig {
    /// Base URLs of the master candidates
    pub candidates: Vec<Url>,
    /// Watch targets, deduplicated, in configured order
    pub frameworks: Vec<String>,
    pub interval: Duration,
    pub healthcheck: SocketAddr,
    pub service_name: String,
    pub agent: AgentAddress,
    pub consul_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            candidates: parse_candidates("127.0.0.1:5050"),
            frameworks: split_list("marathon,chronos"),
            interval: Duration::from_secs(10),
            healthcheck: SocketAddr::from(([0, 0, 0, 0], 8080)),
            service_name: "mesos".to_string(),
            agent: AgentAddress::default(),
            consul_token: None,
            request_timeout: None,
        }
    }
}

impl Args {
    /// Validate and convert into a [`BeaconConfig`]
    pub fn into_config(self) -> Result<BeaconConfig> {
        if self.interval_secs == 0 {
            return Err(BeaconError::Config(
                "BEACON_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let service_name = self.service_name.trim().to_string();
        if service_name.is_empty() {
            return Err(BeaconError::Config(
                "BEACON_SERVICE_NAME must not be empty".to_string(),
            ));
        }

        let candidates = parse_candidates(&self.nodes);
        if candidates.is_empty() {
            return Err(BeaconError::Config(format!(
                "No usable Mesos master in BEACON_NODES '{}'",
                self.nodes
            )));
        }

        let agent = match self.consul_url {
            Some(raw) => AgentAddress::Fixed(parse_base_url(&raw).map_err(|e| {
                BeaconError::Config(format!("Invalid BEACON_CONSUL_URL '{}': {}", raw, e))
            })?),
            None => AgentAddress::CoLocated {
                port: self.consul_port,
            },
        };

        Ok(BeaconConfig {
            candidates,
            frameworks: split_list(&self.frameworks),
            interval: Duration::from_secs(self.interval_secs),
            healthcheck: self.healthcheck,
            service_name,
            agent,
            consul_token: self.consul_token.filter(|t| !t.is_empty()),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        })
    }
}

/// Split a comma-separated list, dropping blanks and repeats
pub fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Turn `host:port` entries into base URLs, logging and skipping bad ones
pub fn parse_candidates(raw: &str) -> Vec<Url> {
    split_list(raw)
        .into_iter()
        .filter_map(|node| match parse_base_url(&node) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(node = %node, error = %e, "Ignoring invalid Mesos master address");
                None
            }
        })
        .collect()
}

fn parse_base_url(raw: &str) -> std::result::Result<Url, url::ParseError> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{}", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["leader-beacon"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" marathon, ,chronos,marathon "),
            vec!["marathon".to_string(), "chronos".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_candidates() {
        let urls = parse_candidates("10.0.0.1:5050,10.0.0.2:5050");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "http://10.0.0.1:5050/");
        assert_eq!(urls[1].port(), Some(5050));
    }

    #[test]
    fn test_parse_candidates_skips_invalid() {
        let urls = parse_candidates("10.0.0.1:5050,bad host:5050");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].host_str(), Some("10.0.0.1"));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = args(&["--interval-secs", "0"]).into_config().unwrap_err();
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_nodes() {
        assert!(args(&["--nodes", " , "]).into_config().is_err());
    }

    #[test]
    fn test_consul_url_selects_fixed_agent() {
        let config = args(&["--consul-url", "consul.service:8500"])
            .into_config()
            .unwrap();
        match config.agent {
            AgentAddress::Fixed(url) => assert_eq!(url.as_str(), "http://consul.service:8500/"),
            other => panic!("unexpected agent: {:?}", other),
        }
    }

    #[test]
    fn test_empty_frameworks_allowed() {
        let config = args(&["--frameworks", ""]).into_config().unwrap();
        assert!(config.frameworks.is_empty());
    }
}
