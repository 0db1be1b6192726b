//! The Plan Generator's output: what to do, and against which node.

use super::endpoint::NodeEndpoint;
use super::replicaset::ReplicaSetConfig;

/// The action an `Actuator` executes for a given cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `replSetInitiate(config)` against `target`.
    Initiate,
    /// `replSetReconfig(config, force=false)` against `target` (expected to be the primary).
    Reconfigure,
    /// `replSetReconfig(config, force=true)` against `target` (any reachable member).
    ForceReconfigure,
    /// No mutation this cycle.
    NoOp,
}

/// The concrete plan produced from a `ClusterState`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    pub target: Option<NodeEndpoint>,
    pub config: Option<ReplicaSetConfig>,
}

impl Plan {
    pub fn no_op() -> Self {
        Self {
            action: Action::NoOp,
            target: None,
            config: None,
        }
    }

    pub fn mutating(action: Action, target: NodeEndpoint, config: ReplicaSetConfig) -> Self {
        Self {
            action,
            target: Some(target),
            config: Some(config),
        }
    }
}
