//! The MongoDB admin collaborator interface (§4.2/§4.5/§4.6/§6): only the replica-set
//! admin operations the operator actually issues are modeled, as the tagged-variant
//! responses §9 calls for — unknown keys in the real wire responses are ignored.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{NodeEndpoint, ReplicaSetConfig};
use crate::error::{AdminError, BootstrapError, ProbeError};

/// Result of `hello`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloResponse {
    pub is_writable_primary: bool,
}

/// The Cluster Prober's view of `replSetGetConfig` (+ `replSetGetStatus` for primary-ness),
/// collapsed into the three in-band outcomes the protocol in §4.2 distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The node holds a replica set config.
    Member {
        rs_name: String,
        config_version: u64,
        /// Host string (`ip:port`) → MongoDB's own `_id` for that member.
        configured_members: BTreeMap<String, u32>,
        is_primary: bool,
    },
    /// "no replica set config found on this node".
    Uninitialized,
    /// `NotYetInitialized` / `NodeNotFound` / startup-in-progress.
    Transient(String),
}

/// The MongoDB admin operations the operator issues against a single endpoint.
#[async_trait]
pub trait MongoAdmin: Send + Sync {
    /// `hello`. A connection/timeout failure is a `ProbeError`, not an `Err` variant of
    /// a successful-but-unusable response — those are folded into `ProbeOutcome`.
    async fn hello(&self, endpoint: NodeEndpoint) -> Result<HelloResponse, ProbeError>;

    /// `replSetGetStatus` + `replSetGetConfig`, classified per §4.2 step 4.
    async fn probe_replica_set(&self, endpoint: NodeEndpoint) -> Result<ProbeOutcome, ProbeError>;

    /// `replSetInitiate(config)`.
    async fn repl_set_initiate(
        &self,
        endpoint: NodeEndpoint,
        config: &ReplicaSetConfig,
    ) -> Result<(), AdminError>;

    /// `replSetReconfig(config, force)`.
    async fn repl_set_reconfig(
        &self,
        endpoint: NodeEndpoint,
        config: &ReplicaSetConfig,
        force: bool,
    ) -> Result<(), AdminError>;

    /// Whether any user exists in the `admin` database (the bootstrap-once detector, §4.6).
    async fn admin_users_exist(&self, endpoint: NodeEndpoint) -> Result<bool, BootstrapError>;

    /// `createUser` with `roles: ["root"]`, using the localhost exception.
    async fn create_root_user(
        &self,
        endpoint: NodeEndpoint,
        username: &str,
        password: &str,
    ) -> Result<(), BootstrapError>;

    /// Ensures the application database exists and creates the application user with
    /// `readWrite` on it, authenticated as root.
    async fn create_application_account(
        &self,
        endpoint: NodeEndpoint,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<(), BootstrapError>;
}
