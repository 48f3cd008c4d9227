//! Service registry publishing
//!
//! A publish is an upsert keyed by a stable identifier derived from the
//! logical name, so repeating it replaces the existing entry instead of
//! adding a second one.

pub mod consul;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::LeaderKey;
use crate::endpoint::Endpoint;
use crate::error::Result;

pub use consul::{AgentAddress, ConsulRegistry};

/// Tag attached to the coordinator leader's registration
pub const MASTER_TAG: &str = "master";

pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckProtocol {
    Tcp,
}

/// Health check the registry runs against a registered endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub protocol: CheckProtocol,
    pub target: Endpoint,
    pub interval: Duration,
    pub timeout: Duration,
}

impl HealthCheck {
    pub fn tcp(target: Endpoint) -> Self {
        Self {
            protocol: CheckProtocol::Tcp,
            target,
            interval: CHECK_INTERVAL,
            timeout: CHECK_TIMEOUT,
        }
    }
}

/// One upsert sent to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub endpoint: Endpoint,
    pub check: HealthCheck,
}

impl RegistrationRequest {
    /// Build the registration for a discovered leader.
    ///
    /// The coordinator leader registers as `<service>:master` tagged
    /// `master`; a watched service `t` registers as
    /// `<service>:framework:<t>` tagged `t`.
    pub fn for_leader(service: &str, key: &LeaderKey, endpoint: Endpoint) -> Self {
        let (id, tag) = match key {
            LeaderKey::Coordinator => (format!("{}:master", service), MASTER_TAG.to_string()),
            LeaderKey::Service(name) => (format!("{}:framework:{}", service, name), name.clone()),
        };

        Self {
            id,
            name: service.to_string(),
            tags: vec![tag],
            check: HealthCheck::tcp(endpoint.clone()),
            endpoint,
        }
    }
}

/// Registry accepting leader registrations
#[async_trait]
pub trait Registry: Send + Sync {
    /// Upsert `request`; a single attempt, no retries
    async fn publish(&self, request: &RegistrationRequest) -> Result<()>;
}

#[async_trait]
impl<T: Registry + ?Sized> Registry for Arc<T> {
    async fn publish(&self, request: &RegistrationRequest) -> Result<()> {
        (**self).publish(request).await
    }
}
