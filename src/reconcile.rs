//! Reconciliation loop
//!
//! Each tick:
//! 1. Resolve the coordinator leader; without one the tick is skipped.
//! 2. Publish the coordinator leader if it changed, concurrently with
//! 3. fetching the cluster state and, per watch target, deriving its leader
//!    endpoint and publishing it if it changed.
//!
//! A tick finishes only when every unit has finished, so ticks never
//! overlap. Failures stay scoped to the unit that hit them and are retried
//! from scratch on the next tick.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::{AddressCache, LeaderKey};
use crate::config::BeaconConfig;
use crate::coordinator::{find_service, ClusterSnapshot, Coordinator};
use crate::endpoint::Endpoint;
use crate::error::{BeaconError, Result};
use crate::registry::{Registry, RegistrationRequest};

/// What happened to one logical name during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Leader changed and the registry accepted it
    Published(Endpoint),
    /// Leader matches what was last published
    Unchanged,
    Failed(BeaconError),
}

/// Summary of a single tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Coordinator leader resolved this tick
    pub leader: Option<Endpoint>,
    /// Error that cut the tick (or its watch-target half) short
    pub skipped: Option<BeaconError>,
    pub outcomes: Vec<(LeaderKey, SyncOutcome)>,
}

impl TickReport {
    pub fn outcome(&self, key: &LeaderKey) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, outcome)| outcome)
    }

    pub fn published(&self) -> impl Iterator<Item = &LeaderKey> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SyncOutcome::Published(_)))
            .map(|(k, _)| k)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&LeaderKey, &BeaconError)> {
        self.outcomes.iter().filter_map(|(k, o)| match o {
            SyncOutcome::Failed(e) => Some((k, e)),
            _ => None,
        })
    }
}

/// Drives discovery and publishing on a fixed interval
pub struct Reconciler<C, R> {
    coordinator: C,
    registry: R,
    service_name: String,
    targets: Vec<String>,
    interval: Duration,
    cache: RwLock<AddressCache>,
}

impl<C: Coordinator, R: Registry> Reconciler<C, R> {
    pub fn new(coordinator: C, registry: R, config: &BeaconConfig) -> Self {
        Self {
            coordinator,
            registry,
            service_name: config.service_name.clone(),
            targets: config.frameworks.clone(),
            interval: config.interval,
            cache: RwLock::new(AddressCache::new()),
        }
    }

    /// Copy of the last-published addresses
    pub async fn cache(&self) -> AddressCache {
        self.cache.read().await.clone()
    }

    /// Tick every interval until `shutdown` resolves.
    ///
    /// The first tick fires one interval after start. Shutdown is only
    /// observed between ticks; a running tick always completes.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval = ?self.interval,
            targets = ?self.targets,
            "Reconciliation loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("Reconciliation loop stopped");
                    break;
                }
            }

            let report = self.reconcile_once().await;
            debug!(
                leader = ?report.leader,
                published = report.published().count(),
                failed = report.failures().count(),
                "Tick complete"
            );
        }
    }

    /// Run a single tick to completion
    pub async fn reconcile_once(&self) -> TickReport {
        let leader = match self.coordinator.resolve_leader().await {
            Ok(leader) => leader,
            Err(e) => {
                error!(error = %e, "Could not determine coordinator leader");
                return TickReport {
                    skipped: Some(e),
                    ..Default::default()
                };
            }
        };

        let master = self.sync_leader(LeaderKey::Coordinator, leader.clone());
        let services = async {
            match self.coordinator.fetch_state(&leader).await {
                Ok(snapshot) => {
                    let units = self.targets.iter().map(|t| self.sync_target(&snapshot, t));
                    Ok(join_all(units).await)
                }
                Err(e) => {
                    error!(leader = %leader, error = %e, "Could not get cluster state");
                    Err(e)
                }
            }
        };

        let (master, services) = tokio::join!(master, services);

        let mut report = TickReport {
            leader: Some(leader),
            skipped: None,
            outcomes: vec![(LeaderKey::Coordinator, master)],
        };
        match services {
            Ok(outcomes) => report.outcomes.extend(outcomes),
            Err(e) => report.skipped = Some(e),
        }
        report
    }

    async fn sync_target(
        &self,
        snapshot: &ClusterSnapshot,
        target: &str,
    ) -> (LeaderKey, SyncOutcome) {
        let key = LeaderKey::service(target);

        let endpoint = match target_endpoint(snapshot, target) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!(name = %target, error = %e, "Skipping watch target");
                return (key, SyncOutcome::Failed(e));
            }
        };

        let outcome = self.sync_leader(key.clone(), endpoint).await;
        (key, outcome)
    }

    /// Publish `endpoint` for `key` if it differs from the cache, then commit
    async fn sync_leader(&self, key: LeaderKey, endpoint: Endpoint) -> SyncOutcome {
        if !self.cache.read().await.compare_and_stage(&key, &endpoint) {
            return SyncOutcome::Unchanged;
        }

        info!(name = %key, endpoint = %endpoint, "New leader detected");

        let request = RegistrationRequest::for_leader(&self.service_name, &key, endpoint.clone());
        match self.registry.publish(&request).await {
            Ok(()) => {
                self.cache.write().await.commit(key.clone(), endpoint.clone());
                info!(name = %key, id = %request.id, endpoint = %endpoint, "Registered leader");
                SyncOutcome::Published(endpoint)
            }
            Err(e) => {
                error!(name = %key, endpoint = %endpoint, error = %e, "Could not register leader");
                SyncOutcome::Failed(e)
            }
        }
    }
}

/// Leader endpoint a watch target advertises in the snapshot
fn target_endpoint(snapshot: &ClusterSnapshot, target: &str) -> Result<Endpoint> {
    let service = find_service(snapshot, target)?;
    Endpoint::from_url(&service.webui_url)
}
