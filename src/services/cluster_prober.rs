//! Cluster Prober (§4.2): contacts each candidate node concurrently, with a per-probe
//! timeout, and reclassifies `Transient` up to `probe_retries` times with exponential
//! backoff before it becomes the node's final classification for the cycle.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::{ExpectedMemberSet, NodeEndpoint, ObservedNodeView};
use crate::ports::{MongoAdmin, ProbeOutcome};
use crate::retry::RetryPolicy;

pub struct ClusterProber {
    probe_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ClusterProber {
    pub fn new(probe_timeout: Duration, probe_retries: u32) -> Self {
        Self {
            probe_timeout,
            // Probe reclassification backs off fast: it is racing a node's own startup,
            // not a remote service's rate limiter.
            retry_policy: RetryPolicy::new(probe_retries, 250, 2, 2_000),
        }
    }

    /// Probes every expected member concurrently and returns one `ObservedNodeView` per
    /// endpoint. Parallelism is bounded by `members.len()` (§5).
    pub async fn probe(
        &self,
        members: &ExpectedMemberSet,
        admin: &dyn MongoAdmin,
    ) -> BTreeMap<NodeEndpoint, ObservedNodeView> {
        let futures = members
            .members
            .iter()
            .map(|&endpoint| self.probe_one(endpoint, admin));
        join_all(futures)
            .await
            .into_iter()
            .map(|view| (view.endpoint, view))
            .collect()
    }

    async fn probe_one(&self, endpoint: NodeEndpoint, admin: &dyn MongoAdmin) -> ObservedNodeView {
        let mut attempt = 0;
        loop {
            let outcome = tokio::time::timeout(self.probe_timeout, admin.probe_replica_set(endpoint)).await;

            let outcome = match outcome {
                Err(_) => return ObservedNodeView::unreachable(endpoint, "probe timed out"),
                Ok(Err(err)) => return ObservedNodeView::unreachable(endpoint, err.to_string()),
                Ok(Ok(outcome)) => outcome,
            };

            match outcome {
                ProbeOutcome::Transient(reason) => {
                    if attempt >= self.retry_policy.max_retries {
                        return ObservedNodeView::transient(endpoint, reason);
                    }
                    tokio::time::sleep(self.retry_policy.backoff_for(attempt)).await;
                    attempt += 1;
                }
                ProbeOutcome::Uninitialized => return ObservedNodeView::uninitialized(endpoint),
                ProbeOutcome::Member {
                    rs_name,
                    config_version,
                    configured_members,
                    is_primary,
                } => {
                    let is_primary = is_primary || self.confirm_primary(endpoint, admin).await;
                    return ObservedNodeView::member(
                        endpoint,
                        rs_name,
                        configured_members,
                        is_primary,
                        config_version,
                    );
                }
            }
        }
    }

    /// `hello` corroborates `isWritablePrimary` (§4.2 step 2) independent of the
    /// `replSetGetStatus`-derived flag already on the outcome.
    async fn confirm_primary(&self, endpoint: NodeEndpoint, admin: &dyn MongoAdmin) -> bool {
        match tokio::time::timeout(self.probe_timeout, admin.hello(endpoint)).await {
            Ok(Ok(hello)) => hello.is_writable_primary,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeState;
    use crate::error::ProbeError;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn ep(last: u8) -> NodeEndpoint {
        NodeEndpoint::new(Ipv4Addr::new(10, 0, 0, last), 27017)
    }

    struct ScriptedAdmin {
        /// One scripted outcome sequence per endpoint; each probe call pops the front.
        scripts: Mutex<BTreeMap<NodeEndpoint, Vec<Result<ProbeOutcome, ProbeError>>>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MongoAdmin for ScriptedAdmin {
        async fn hello(&self, _endpoint: NodeEndpoint) -> Result<crate::ports::HelloResponse, ProbeError> {
            Ok(crate::ports::HelloResponse { is_writable_primary: false })
        }

        async fn probe_replica_set(&self, endpoint: NodeEndpoint) -> Result<ProbeOutcome, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(&endpoint).expect("scripted endpoint");
            assert!(!script.is_empty(), "script exhausted for {endpoint}");
            script.remove(0)
        }

        async fn repl_set_initiate(
            &self,
            _endpoint: NodeEndpoint,
            _config: &crate::domain::ReplicaSetConfig,
        ) -> Result<(), crate::error::AdminError> {
            unimplemented!()
        }

        async fn repl_set_reconfig(
            &self,
            _endpoint: NodeEndpoint,
            _config: &crate::domain::ReplicaSetConfig,
            _force: bool,
        ) -> Result<(), crate::error::AdminError> {
            unimplemented!()
        }

        async fn admin_users_exist(&self, _endpoint: NodeEndpoint) -> Result<bool, crate::error::BootstrapError> {
            unimplemented!()
        }

        async fn create_root_user(
            &self,
            _endpoint: NodeEndpoint,
            _username: &str,
            _password: &str,
        ) -> Result<(), crate::error::BootstrapError> {
            unimplemented!()
        }

        async fn create_application_account(
            &self,
            _endpoint: NodeEndpoint,
            _database: &str,
            _username: &str,
            _password: &str,
        ) -> Result<(), crate::error::BootstrapError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn transient_promotes_to_final_classification_after_retries() {
        let endpoint = ep(2);
        let admin = ScriptedAdmin {
            scripts: Mutex::new(BTreeMap::from([(
                endpoint,
                vec![
                    Ok(ProbeOutcome::Transient("NotYetInitialized".into())),
                    Ok(ProbeOutcome::Transient("NotYetInitialized".into())),
                    Ok(ProbeOutcome::Uninitialized),
                ],
            )])),
            calls: AtomicU32::new(0),
        };
        let prober = ClusterProber::new(Duration::from_millis(100), 3);
        let members = ExpectedMemberSet::new(BTreeSet::from([endpoint]), 1);

        let observations = prober.probe(&members, &admin).await;

        assert_eq!(observations[&endpoint].state, NodeState::Uninitialized);
        assert_eq!(admin.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_exhausting_retries_stays_transient() {
        let endpoint = ep(2);
        let admin = ScriptedAdmin {
            scripts: Mutex::new(BTreeMap::from([(
                endpoint,
                vec![
                    Ok(ProbeOutcome::Transient("still starting".into())),
                    Ok(ProbeOutcome::Transient("still starting".into())),
                ],
            )])),
            calls: AtomicU32::new(0),
        };
        let prober = ClusterProber::new(Duration::from_millis(100), 1);
        let members = ExpectedMemberSet::new(BTreeSet::from([endpoint]), 1);

        let observations = prober.probe(&members, &admin).await;

        assert_eq!(observations[&endpoint].state, NodeState::Transient);
    }

    #[tokio::test]
    async fn probe_error_is_unreachable() {
        let endpoint = ep(2);
        let admin = ScriptedAdmin {
            scripts: Mutex::new(BTreeMap::from([(
                endpoint,
                vec![Err(ProbeError::ConnectionFailed {
                    endpoint,
                    reason: "refused".into(),
                })],
            )])),
            calls: AtomicU32::new(0),
        };
        let prober = ClusterProber::new(Duration::from_millis(100), 3);
        let members = ExpectedMemberSet::new(BTreeSet::from([endpoint]), 1);

        let observations = prober.probe(&members, &admin).await;

        assert_eq!(observations[&endpoint].state, NodeState::Unreachable);
    }
}
