//! The Cluster Prober's per-node findings.

use std::collections::{BTreeMap, BTreeSet};

use super::endpoint::NodeEndpoint;

/// The classification of a single probed node, in the order the State Classifier
/// expects to reason about escalation (most to least healthy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Responds, but has no replica set config at all.
    Uninitialized,
    /// Returns a replica set config; `ObservedNodeView`'s config fields are populated.
    Member,
    /// Responds but is still starting up (`NotYetInitialized`, startup-in-progress codes).
    Transient,
    /// Connection refused, timed out, or otherwise could not be reached.
    Unreachable,
}

/// One node's self-reported replica-set view, as extracted by the Cluster Prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedNodeView {
    pub endpoint: NodeEndpoint,
    pub state: NodeState,
    pub rs_name: Option<String>,
    /// This node's local config members, keyed by host string (`ip:port`) and mapped to
    /// MongoDB's own `_id` for that member — carried through so the Plan Generator can
    /// reuse real ids instead of re-deriving them (§3: "ids are unique and stable across a
    /// session").
    pub configured_members: Option<BTreeMap<String, u32>>,
    pub is_primary: bool,
    pub config_version: Option<u64>,
    pub error: Option<String>,
}

impl ObservedNodeView {
    pub fn unreachable(endpoint: NodeEndpoint, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            state: NodeState::Unreachable,
            rs_name: None,
            configured_members: None,
            is_primary: false,
            config_version: None,
            error: Some(error.into()),
        }
    }

    pub fn transient(endpoint: NodeEndpoint, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            state: NodeState::Transient,
            rs_name: None,
            configured_members: None,
            is_primary: false,
            config_version: None,
            error: Some(error.into()),
        }
    }

    pub fn uninitialized(endpoint: NodeEndpoint) -> Self {
        Self {
            endpoint,
            state: NodeState::Uninitialized,
            rs_name: None,
            configured_members: None,
            is_primary: false,
            config_version: None,
            error: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn member(
        endpoint: NodeEndpoint,
        rs_name: String,
        configured_members: BTreeMap<String, u32>,
        is_primary: bool,
        config_version: u64,
    ) -> Self {
        Self {
            endpoint,
            state: NodeState::Member,
            rs_name: Some(rs_name),
            configured_members: Some(configured_members),
            is_primary,
            config_version: Some(config_version),
            error: None,
        }
    }

    /// The host strings this node's local config lists as members, discarding the ids —
    /// the shape the State Classifier needs for set comparisons against the expected
    /// membership.
    pub fn configured_hosts(&self) -> BTreeSet<String> {
        self.configured_members
            .as_ref()
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }
}
