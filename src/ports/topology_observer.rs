//! The Topology Observer's collaborator interface (§4.1): the orchestrator is the
//! authority on *expected* membership. The production implementation talks to Docker
//! Swarm; tests substitute an in-memory fake.

use async_trait::async_trait;

use crate::domain::ExpectedMemberSet;
use crate::error::ObserveError;

/// Enumerates the orchestrator's view of which MongoDB tasks are running and reachable.
#[async_trait]
pub trait TopologyObserver: Send + Sync {
    async fn observe(&self) -> Result<ExpectedMemberSet, ObserveError>;
}
