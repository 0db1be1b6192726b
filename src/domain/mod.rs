//! The operator's data model (§3 of the design): the types every service passes around.

mod cluster_state;
mod endpoint;
mod observed;
mod plan;
mod replicaset;
mod topology;

pub use cluster_state::{ClusterState, Observations};
pub use endpoint::NodeEndpoint;
pub use observed::{NodeState, ObservedNodeView};
pub use plan::{Action, Plan};
pub use replicaset::{Member, ReplicaSetConfig};
pub use topology::ExpectedMemberSet;
