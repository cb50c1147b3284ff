//! Hive Swarm - the swarm intelligence layer
//!
//! Components, leaves first:
//! - **Reputation**: interaction outcomes become a bounded trust score
//! - **Monitor**: last-known link quality per peer
//! - **Routing**: candidate routes per resource, ranked by a composite score
//! - **Topology**: connection graph and connect/prune recommendations
//! - **Resources**: who holds what, feeding routes into the routing table
//!
//! No component performs I/O. Each guards its state with a single lock and
//! hands out copies, so callers never hold a lock across their own work.

pub mod config;
pub mod maintenance;
pub mod monitor;
pub mod reputation;
pub mod resources;
pub mod routing;
pub mod swarm;
pub mod topology;

pub use config::*;
pub use maintenance::*;
pub use monitor::*;
pub use reputation::*;
pub use resources::*;
pub use routing::*;
pub use swarm::*;
pub use topology::*;
