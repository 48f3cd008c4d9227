//! Mesos master HTTP client
//!
//! Every master replica serves `/master/state.json`. Replicas that know the
//! current leader report it as a libprocess pid (`master@host:port`) in the
//! `leader` field, and the leader's document lists the registered
//! frameworks with their web UI URLs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ClusterSnapshot, Coordinator, ServiceDescriptor};
use crate::endpoint::Endpoint;
use crate::error::{BeaconError, Result};

const STATE_PATH: &str = "master/state.json";

/// Subset of the master state document we read
#[derive(Debug, Deserialize)]
struct MasterState {
    #[serde(default)]
    leader: String,
    #[serde(default)]
    frameworks: Vec<ServiceDescriptor>,
}

/// Client over a fixed set of master candidates
pub struct MesosClient {
    http: reqwest::Client,
    candidates: Vec<Url>,
}

impl MesosClient {
    pub fn new(candidates: Vec<Url>, request_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| BeaconError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, candidates })
    }

    async fn get_state(&self, base: &str) -> std::result::Result<MasterState, String> {
        let url = format!("{}/{}", base.trim_end_matches('/'), STATE_PATH);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {}", url, e))?;

        if !response.status().is_success() {
            return Err(format!("{} returned HTTP {}", url, response.status()));
        }

        response
            .json::<MasterState>()
            .await
            .map_err(|e| format!("invalid state document from {}: {}", url, e))
    }
}

#[async_trait]
impl Coordinator for MesosClient {
    async fn resolve_leader(&self) -> Result<Endpoint> {
        let mut failures = Vec::new();

        for candidate in &self.candidates {
            let state = match self.get_state(candidate.as_str()).await {
                Ok(state) => state,
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Master candidate unavailable");
                    failures.push(e);
                    continue;
                }
            };

            if state.leader.is_empty() {
                debug!(candidate = %candidate, "Master candidate does not know the leader");
                failures.push(format!("{} reports no leader", candidate));
                continue;
            }

            match Endpoint::from_pid(&state.leader) {
                Ok(leader) => {
                    debug!(candidate = %candidate, leader = %leader, "Resolved Mesos leader");
                    return Ok(leader);
                }
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Unusable leader pid");
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            return Err(BeaconError::NoLeader("no candidates configured".to_string()));
        }
        Err(BeaconError::NoLeader(failures.join("; ")))
    }

    async fn fetch_state(&self, leader: &Endpoint) -> Result<ClusterSnapshot> {
        let state = self
            .get_state(&leader.http_base())
            .await
            .map_err(|reason| BeaconError::StateUnavailable {
                endpoint: leader.to_string(),
                reason,
            })?;

        Ok(ClusterSnapshot {
            leader: leader.clone(),
            services: state.frameworks,
        })
    }
}
