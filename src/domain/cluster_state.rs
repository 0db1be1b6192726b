//! The State Classifier's output: one tag, plus the evidence that produced it.

use std::collections::BTreeMap;

use super::endpoint::NodeEndpoint;
use super::observed::ObservedNodeView;

/// The reduced classification of a reconciliation cycle's observations (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterState {
    /// No member reports a config; a majority of candidates are `Uninitialized`; no tasks
    /// are still being scheduled.
    FreshDeploy,
    /// At least one member's configured hosts and the expected set are wholesale disjoint.
    RedeployIpChange { max_observed_version: u64 },
    /// Members agree with each other but not with the expected set, via pure add/remove.
    Scale {
        primary: NodeEndpoint,
        additions: Vec<NodeEndpoint>,
        removals: Vec<String>,
    },
    /// Members disagree on version or membership beyond a minor difference.
    SplitView { max_observed_version: u64 },
    /// Every member agrees and matches the expected set; `primary` is `Some` only when one
    /// was observed.
    SteadyState { primary: Option<NodeEndpoint> },
    /// Too many nodes are transient/unreachable, or the orchestrator observation itself
    /// failed; reconciliation defers.
    Unstable { reason: String },
}

impl ClusterState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FreshDeploy => "FreshDeploy",
            Self::RedeployIpChange { .. } => "Redeploy-IPChange",
            Self::Scale { .. } => "Scale",
            Self::SplitView { .. } => "SplitView",
            Self::SteadyState { .. } => "SteadyState",
            Self::Unstable { .. } => "Unstable",
        }
    }
}

/// Bundles the raw observations alongside derived groupings the classifier and planner
/// both need, so neither has to re-partition the observation map.
#[derive(Debug, Clone)]
pub struct Observations {
    pub by_endpoint: BTreeMap<NodeEndpoint, ObservedNodeView>,
}

impl Observations {
    pub fn new(by_endpoint: BTreeMap<NodeEndpoint, ObservedNodeView>) -> Self {
        Self { by_endpoint }
    }

    pub fn members(&self) -> impl Iterator<Item = &ObservedNodeView> {
        self.by_endpoint
            .values()
            .filter(|v| v.state == super::observed::NodeState::Member)
    }

    pub fn primary(&self) -> Option<NodeEndpoint> {
        self.members().find(|v| v.is_primary).map(|v| v.endpoint)
    }
}
