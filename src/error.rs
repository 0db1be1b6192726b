//! Error taxonomy (§7): the propagation policy is encoded in how each variant is *used*,
//! not in the type itself — only `ConfigError` is ever allowed to terminate the process.

use thiserror::Error;

use crate::domain::NodeEndpoint;

/// The orchestrator API could not be reached or returned an unusable response. Non-fatal:
/// the cycle is abandoned and retried next cycle.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("orchestrator API unreachable: {0}")]
    Unreachable(String),

    #[error("orchestrator returned an unusable response: {0}")]
    Malformed(String),
}

/// A single node's probe failed. Reflected in `ObservedNodeView::state`; never propagated
/// as a hard error out of the Cluster Prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: NodeEndpoint, reason: String },

    #[error("probe of {endpoint} timed out")]
    Timeout { endpoint: NodeEndpoint },
}

/// An admin command failed. `Retryable` is healed by the backoff policy within the same
/// cycle; `Fatal` ends the cycle immediately and the next cycle re-plans from scratch.
#[derive(Debug, Error, Clone)]
pub enum AdminError {
    #[error("not primary: {0}")]
    NotPrimary(String),

    #[error("election in progress: {0}")]
    ElectionInProgress(String),

    #[error("transient network error: {0}")]
    Transient(String),

    #[error("rejected by MongoDB: {0}")]
    Rejected(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl AdminError {
    /// Whether the backoff policy (§4.5) should retry this error within the current cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotPrimary(_) | Self::ElectionInProgress(_) | Self::Transient(_)
        )
    }

    /// Authentication failures before bootstrap completes are expected, not errors (§4.5).
    pub fn is_expected_pre_bootstrap(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

/// Account Bootstrapper failures. Never fatal to replica-set health; retried on
/// subsequent cycles until it succeeds.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to connect to primary for bootstrap: {0}")]
    ConnectionFailed(String),

    #[error("failed to create root user: {0}")]
    RootUserCreationFailed(String),

    #[error("failed to create application user or database: {0}")]
    ApplicationSeedFailed(String),
}
