//! Coordinator client - leader discovery and cluster state
//!
//! The coordinator is the cluster scheduler whose replicas elect a leader
//! among themselves. This module only observes the outcome: which replica
//! currently leads, and which sub-services (frameworks) it knows about.

pub mod mesos;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::endpoint::Endpoint;
use crate::error::{BeaconError, Result};

pub use mesos::MesosClient;

/// A sub-service registered with the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// URL the service advertises for its own UI/API; its leader address
    #[serde(default)]
    pub webui_url: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub id: String,
}

/// Point-in-time view of coordinator state
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    pub leader: Endpoint,
    pub services: Vec<ServiceDescriptor>,
}

/// Access to the coordinator's leader and state
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Ask the candidates which replica currently leads
    async fn resolve_leader(&self) -> Result<Endpoint>;

    /// Fetch the full state document from the given leader
    async fn fetch_state(&self, leader: &Endpoint) -> Result<ClusterSnapshot>;
}

#[async_trait]
impl<T: Coordinator + ?Sized> Coordinator for Arc<T> {
    async fn resolve_leader(&self) -> Result<Endpoint> {
        (**self).resolve_leader().await
    }

    async fn fetch_state(&self, leader: &Endpoint) -> Result<ClusterSnapshot> {
        (**self).fetch_state(leader).await
    }
}

/// Select the first service whose registered name starts with `prefix`.
///
/// Prefix matching because frameworks may register with a runtime suffix
/// (`marathon-1.4.2`, `chronos-2.5`).
pub fn find_service<'a>(
    snapshot: &'a ClusterSnapshot,
    prefix: &str,
) -> Result<&'a ServiceDescriptor> {
    snapshot
        .services
        .iter()
        .find(|s| s.name.starts_with(prefix))
        .ok_or_else(|| BeaconError::NotFound(prefix.to_string()))
}
