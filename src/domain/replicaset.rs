//! `ReplicaSetConfig`: the document the Plan Generator produces and the Actuator submits.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::endpoint::NodeEndpoint;

/// One member entry inside a `ReplicaSetConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: u32,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<u32>,
}

impl Member {
    pub fn new(id: u32, endpoint: NodeEndpoint) -> Self {
        Self {
            id,
            host: endpoint.host(),
            priority: None,
            votes: None,
        }
    }
}

/// The replica set configuration document, `rs.conf()`'s shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    #[serde(rename = "_id")]
    pub name: String,
    pub version: u64,
    pub members: Vec<Member>,
}

impl ReplicaSetConfig {
    pub fn new(name: String, version: u64, members: Vec<Member>) -> Self {
        Self {
            name,
            version,
            members,
        }
    }

    pub fn member_hosts(&self) -> BTreeSet<String> {
        self.members.iter().map(|m| m.host.clone()).collect()
    }

    /// Host string → `_id`, the shape a fresh probe of this config would report back.
    pub fn members_by_host(&self) -> BTreeMap<String, u32> {
        self.members.iter().map(|m| (m.host.clone(), m.id)).collect()
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// `min k >= 0 : k` is not already assigned to a member, per the §4.4 numbering rule.
    pub fn next_free_id(&self) -> u32 {
        let used = self.ids();
        (0..).find(|k| !used.contains(k)).expect("u32 space is not exhausted")
    }

    /// All member ids are pairwise distinct and the host set has no duplicates (invariants in §3/§8).
    pub fn is_well_formed(&self) -> bool {
        let ids = self.ids();
        let hosts = self.member_hosts();
        ids.len() == self.members.len() && hosts.len() == self.members.len()
    }
}
