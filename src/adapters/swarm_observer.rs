//! Docker Swarm adapter for the Topology Observer port (§4.1/§6): lists the configured
//! service's running tasks, filters by node availability, and resolves each task's
//! overlay-network IP.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use bollard::query_parameters::{ListNodesOptionsBuilder, ListTasksOptionsBuilder};
use bollard::Docker;
use tracing::{debug, warn};

use crate::domain::{ExpectedMemberSet, NodeEndpoint};
use crate::error::ObserveError;
use crate::ports::TopologyObserver;

pub struct SwarmTopologyObserver {
    docker: Docker,
    service_name: String,
    overlay_network_name: String,
    mongo_port: u16,
}

impl SwarmTopologyObserver {
    pub fn new(docker: Docker, service_name: String, overlay_network_name: String, mongo_port: u16) -> Self {
        Self {
            docker,
            service_name,
            overlay_network_name,
            mongo_port,
        }
    }

    async fn unavailable_node_ids(&self) -> Result<BTreeSet<String>, ObserveError> {
        let opts = ListNodesOptionsBuilder::default().build();
        let nodes = self
            .docker
            .list_nodes(Some(opts))
            .await
            .map_err(|e| ObserveError::Unreachable(e.to_string()))?;

        Ok(nodes
            .into_iter()
            .filter(|node| {
                let availability = node
                    .spec
                    .as_ref()
                    .and_then(|s| s.availability)
                    .map(|a| format!("{a:?}").to_lowercase());
                let status = node
                    .status
                    .as_ref()
                    .and_then(|s| s.state)
                    .map(|s| format!("{s:?}").to_lowercase());
                availability.as_deref() != Some("active") || status.as_deref() != Some("ready")
            })
            .filter_map(|node| node.id)
            .collect())
    }

    fn resolve_ip(&self, task: &bollard::models::Task) -> Option<NodeEndpoint> {
        task.network_attachments
            .as_ref()?
            .iter()
            .filter(|attachment| {
                attachment
                    .network
                    .as_ref()
                    .and_then(|n| n.spec.as_ref())
                    .and_then(|s| s.name.as_ref())
                    .is_some_and(|name| name == &self.overlay_network_name)
            })
            .find_map(|attachment| attachment.addresses.as_ref()?.first())
            .and_then(|cidr| cidr.split('/').next())
            .and_then(|ip| ip.parse().ok())
            .map(|ip| NodeEndpoint::new(ip, self.mongo_port))
    }
}

#[async_trait]
impl TopologyObserver for SwarmTopologyObserver {
    async fn observe(&self) -> Result<ExpectedMemberSet, ObserveError> {
        let unavailable = self.unavailable_node_ids().await?;

        let filters: HashMap<String, Vec<String>> = HashMap::from([
            ("service".to_string(), vec![self.service_name.clone()]),
            ("desired-state".to_string(), vec!["running".to_string()]),
        ]);
        let opts = ListTasksOptionsBuilder::default().filters(&filters).build();
        let tasks = self
            .docker
            .list_tasks(Some(opts))
            .await
            .map_err(|e| ObserveError::Unreachable(e.to_string()))?;

        let mut members = BTreeSet::new();
        let mut candidate_count = 0u32;

        for task in &tasks {
            if task
                .node_id
                .as_ref()
                .is_some_and(|id| unavailable.contains(id))
            {
                continue;
            }
            candidate_count += 1;

            let running = task
                .status
                .as_ref()
                .and_then(|s| s.state)
                .map(|s| format!("{s:?}").to_lowercase())
                == Some("running".to_string());

            if !running {
                continue;
            }

            match self.resolve_ip(task) {
                Some(endpoint) => {
                    members.insert(endpoint);
                }
                None => {
                    debug!(task = ?task.id, "task has no overlay network address yet");
                }
            }
        }

        if tasks.is_empty() {
            warn!(service = %self.service_name, "no tasks found for service");
        }

        Ok(ExpectedMemberSet::new(members, candidate_count))
    }
}
