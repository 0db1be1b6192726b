//! Production adapters for the collaborator ports (§1's "out of scope" external systems):
//! Docker Swarm for topology, the MongoDB wire protocol for admin commands.

pub mod mongo_admin;
pub mod swarm_observer;

pub use mongo_admin::MongoAdminClient;
pub use swarm_observer::SwarmTopologyObserver;
