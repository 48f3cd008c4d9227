//! leader-beacon - Mesos leader discovery for Consul
//!
//! Polls the Mesos masters for the current leader and for the leaders of a
//! configured set of frameworks, and registers each address in Consul
//! whenever it changes.
//!
//! ## Modules
//!
//! - **coordinator**: Mesos master leader resolution and state snapshots
//! - **registry**: Consul agent service registration (upsert)
//! - **cache**: last-published address per logical name
//! - **reconcile**: the interval-driven reconciliation loop
//! - **health**: liveness HTTP endpoint

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod reconcile;
pub mod registry;

pub use cache::{AddressCache, LeaderKey};
pub use config::{Args, BeaconConfig};
pub use endpoint::Endpoint;
pub use error::{BeaconError, Result};
pub use reconcile::{Reconciler, SyncOutcome, TickReport};
