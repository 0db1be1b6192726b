//! Shared fixtures for the reconciliation-cycle integration tests: in-memory
//! `TopologyObserver`/`MongoAdmin` fakes driven by a scripted cluster state instead of a
//! real Docker/MongoDB deployment.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use async_trait::async_trait;

use rs_replicaset_operator::domain::{ExpectedMemberSet, NodeEndpoint, ReplicaSetConfig};
use rs_replicaset_operator::error::{AdminError, BootstrapError, ObserveError, ProbeError};
use rs_replicaset_operator::ports::{HelloResponse, MongoAdmin, ProbeOutcome, TopologyObserver};

pub fn ep(last: u8) -> NodeEndpoint {
    NodeEndpoint::new(Ipv4Addr::new(10, 0, 0, last), 27017)
}

pub struct FixedObserver {
    pub expected: ExpectedMemberSet,
}

#[async_trait]
impl TopologyObserver for FixedObserver {
    async fn observe(&self) -> Result<ExpectedMemberSet, ObserveError> {
        Ok(self.expected.clone())
    }
}

#[derive(Clone)]
pub enum ScriptedNode {
    Uninitialized,
    Member {
        rs_name: String,
        config_version: u64,
        configured_members: BTreeMap<String, u32>,
        is_primary: bool,
    },
    Unreachable,
}

/// A `MongoAdmin` fake backed by a mutable per-node script, so tests can simulate a
/// cluster converging across several `probe`/apply rounds within one process.
pub struct ScriptedCluster {
    nodes: Mutex<BTreeMap<NodeEndpoint, ScriptedNode>>,
    users_exist: Mutex<bool>,
    initiated: Mutex<Option<ReplicaSetConfig>>,
    reconfigured: Mutex<Vec<ReplicaSetConfig>>,
}

impl ScriptedCluster {
    pub fn new(nodes: BTreeMap<NodeEndpoint, ScriptedNode>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            users_exist: Mutex::new(false),
            initiated: Mutex::new(None),
            reconfigured: Mutex::new(Vec::new()),
        }
    }

    pub fn set_node(&self, endpoint: NodeEndpoint, node: ScriptedNode) {
        self.nodes.lock().unwrap().insert(endpoint, node);
    }

    pub fn initiated_config(&self) -> Option<ReplicaSetConfig> {
        self.initiated.lock().unwrap().clone()
    }

    pub fn reconfigure_count(&self) -> usize {
        self.reconfigured.lock().unwrap().len()
    }
}

#[async_trait]
impl MongoAdmin for ScriptedCluster {
    async fn hello(&self, endpoint: NodeEndpoint) -> Result<HelloResponse, ProbeError> {
        let nodes = self.nodes.lock().unwrap();
        let is_writable_primary = matches!(
            nodes.get(&endpoint),
            Some(ScriptedNode::Member { is_primary: true, .. })
        );
        Ok(HelloResponse { is_writable_primary })
    }

    async fn probe_replica_set(&self, endpoint: NodeEndpoint) -> Result<ProbeOutcome, ProbeError> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&endpoint) {
            Some(ScriptedNode::Uninitialized) => Ok(ProbeOutcome::Uninitialized),
            Some(ScriptedNode::Member {
                rs_name,
                config_version,
                configured_members,
                is_primary,
            }) => Ok(ProbeOutcome::Member {
                rs_name: rs_name.clone(),
                config_version: *config_version,
                configured_members: configured_members.clone(),
                is_primary: *is_primary,
            }),
            Some(ScriptedNode::Unreachable) | None => Err(ProbeError::ConnectionFailed {
                endpoint,
                reason: "refused".into(),
            }),
        }
    }

    async fn repl_set_initiate(&self, target: NodeEndpoint, config: &ReplicaSetConfig) -> Result<(), AdminError> {
        *self.initiated.lock().unwrap() = Some(config.clone());
        let mut nodes = self.nodes.lock().unwrap();
        for member in &config.members {
            if let Some(endpoint) = NodeEndpoint::parse_host(&member.host) {
                nodes.insert(
                    endpoint,
                    ScriptedNode::Member {
                        rs_name: config.name.clone(),
                        config_version: config.version,
                        configured_members: config.members_by_host(),
                        is_primary: endpoint == target,
                    },
                );
            }
        }
        Ok(())
    }

    async fn repl_set_reconfig(&self, _target: NodeEndpoint, config: &ReplicaSetConfig, _force: bool) -> Result<(), AdminError> {
        self.reconfigured.lock().unwrap().push(config.clone());
        let mut nodes = self.nodes.lock().unwrap();
        let primary = nodes.iter().find_map(|(ep, n)| match n {
            ScriptedNode::Member { is_primary: true, .. } => Some(*ep),
            _ => None,
        });
        nodes.retain(|ep, _| config.member_hosts().contains(&ep.host()));
        for member in &config.members {
            if let Some(endpoint) = NodeEndpoint::parse_host(&member.host) {
                nodes.insert(
                    endpoint,
                    ScriptedNode::Member {
                        rs_name: config.name.clone(),
                        config_version: config.version,
                        configured_members: config.members_by_host(),
                        is_primary: Some(endpoint) == primary,
                    },
                );
            }
        }
        Ok(())
    }

    async fn admin_users_exist(&self, _endpoint: NodeEndpoint) -> Result<bool, BootstrapError> {
        Ok(*self.users_exist.lock().unwrap())
    }

    async fn create_root_user(&self, _endpoint: NodeEndpoint, _username: &str, _password: &str) -> Result<(), BootstrapError> {
        *self.users_exist.lock().unwrap() = true;
        Ok(())
    }

    async fn create_application_account(&self, _endpoint: NodeEndpoint, _database: &str, _username: &str, _password: &str) -> Result<(), BootstrapError> {
        Ok(())
    }
}
