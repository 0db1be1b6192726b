//! Actuator (§4.5): applies a `Plan` against a chosen node, with retry/backoff and an
//! election-wait after mutations that can trigger one.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::{Action, ExpectedMemberSet, Plan};
use crate::error::AdminError;
use crate::ports::MongoAdmin;
use crate::retry::RetryPolicy;

/// The Actuator's outcome for a cycle, per §4.5's contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorResult {
    Applied,
    RetryableFailure(String),
    FatalFailure(String),
}

pub struct Actuator {
    retry_policy: RetryPolicy,
    election_timeout: Duration,
}

impl Actuator {
    pub fn new(retry_policy: RetryPolicy, election_timeout: Duration) -> Self {
        Self {
            retry_policy,
            election_timeout,
        }
    }

    /// Applies `plan` via `admin`. `bootstrap_needed` is set to `true` exactly when an
    /// `Initiate` succeeds, telling the caller to run the Account Bootstrapper (§4.6).
    pub async fn apply(
        &self,
        plan: &Plan,
        admin: &dyn MongoAdmin,
        expected: &ExpectedMemberSet,
        bootstrap_needed: &mut bool,
    ) -> ActuatorResult {
        match plan.action {
            Action::NoOp => ActuatorResult::Applied,
            Action::Initiate => self.apply_initiate(plan, admin, expected, bootstrap_needed).await,
            Action::Reconfigure => self.apply_reconfigure(plan, admin, expected).await,
            Action::ForceReconfigure => self.apply_force_reconfigure(plan, admin, expected).await,
        }
    }

    async fn apply_initiate(
        &self,
        plan: &Plan,
        admin: &dyn MongoAdmin,
        expected: &ExpectedMemberSet,
        bootstrap_needed: &mut bool,
    ) -> ActuatorResult {
        let (target, config) = match (plan.target, &plan.config) {
            (Some(t), Some(c)) => (t, c),
            _ => return ActuatorResult::FatalFailure("Initiate plan missing target/config".into()),
        };

        let result = self
            .retry_policy
            .execute(
                || admin.repl_set_initiate(target, config),
                |err: &AdminError| err.is_retryable() || err.is_expected_pre_bootstrap(),
            )
            .await;

        if let Err(err) = result {
            if err.is_expected_pre_bootstrap() {
                info!(%target, "authentication rejected initiate before bootstrap, as expected");
            } else {
                warn!(%target, error = %err, "replSetInitiate failed");
                return classify_admin_failure(&err);
            }
        }

        if self.wait_for_primary(admin, expected).await {
            *bootstrap_needed = true;
            ActuatorResult::Applied
        } else {
            ActuatorResult::RetryableFailure("no primary elected within election_timeout".into())
        }
    }

    async fn apply_reconfigure(&self, plan: &Plan, admin: &dyn MongoAdmin, expected: &ExpectedMemberSet) -> ActuatorResult {
        let (target, config) = match (plan.target, &plan.config) {
            (Some(t), Some(c)) => (t, c),
            _ => return ActuatorResult::FatalFailure("Reconfigure plan missing target/config".into()),
        };

        let mut attempts = 0;
        loop {
            match admin.repl_set_reconfig(target, config, false).await {
                Ok(()) => return ActuatorResult::Applied,
                Err(err) if matches!(err, AdminError::NotPrimary(_) | AdminError::ElectionInProgress(_)) && attempts < 3 => {
                    attempts += 1;
                    tokio::time::sleep(self.retry_policy.backoff_for(attempts)).await;
                }
                Err(err) if matches!(err, AdminError::NotPrimary(_) | AdminError::ElectionInProgress(_)) => {
                    warn!(%target, error = %err, "reconfigure retries exhausted, falling back to force");
                    return self.force_reconfigure(target, config, admin, expected).await;
                }
                Err(err) => {
                    warn!(%target, error = %err, "replSetReconfig rejected");
                    return classify_admin_failure(&err);
                }
            }
        }
    }

    async fn apply_force_reconfigure(&self, plan: &Plan, admin: &dyn MongoAdmin, expected: &ExpectedMemberSet) -> ActuatorResult {
        let (target, config) = match (plan.target, &plan.config) {
            (Some(t), Some(c)) => (t, c),
            _ => return ActuatorResult::FatalFailure("ForceReconfigure plan missing target/config".into()),
        };
        self.force_reconfigure(target, config, admin, expected).await
    }

    async fn force_reconfigure(
        &self,
        target: crate::domain::NodeEndpoint,
        config: &crate::domain::ReplicaSetConfig,
        admin: &dyn MongoAdmin,
        expected: &ExpectedMemberSet,
    ) -> ActuatorResult {
        let result = self
            .retry_policy
            .execute(
                || admin.repl_set_reconfig(target, config, true),
                AdminError::is_retryable,
            )
            .await;

        match result {
            Ok(()) => {
                if self.wait_for_primary(admin, expected).await {
                    ActuatorResult::Applied
                } else {
                    ActuatorResult::RetryableFailure("no primary elected after force reconfigure".into())
                }
            }
            Err(err) => {
                warn!(%target, error = %err, "force replSetReconfig failed");
                classify_admin_failure(&err)
            }
        }
    }

    /// Polls `hello` across `expected` until a writable primary emerges or
    /// `election_timeout` elapses.
    async fn wait_for_primary(&self, admin: &dyn MongoAdmin, expected: &ExpectedMemberSet) -> bool {
        let deadline = Instant::now() + self.election_timeout;
        loop {
            for &endpoint in &expected.members {
                if let Ok(hello) = admin.hello(endpoint).await {
                    if hello.is_writable_primary {
                        info!(%endpoint, "primary elected");
                        return true;
                    }
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

fn classify_admin_failure(err: &AdminError) -> ActuatorResult {
    if err.is_retryable() {
        ActuatorResult::RetryableFailure(err.to_string())
    } else {
        ActuatorResult::FatalFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_map_to_retryable_result() {
        let err = AdminError::Transient("net blip".into());
        assert_eq!(classify_admin_failure(&err), ActuatorResult::RetryableFailure(err.to_string()));
    }

    #[test]
    fn rejected_config_maps_to_fatal_result() {
        let err = AdminError::Rejected("bad config".into());
        assert_eq!(classify_admin_failure(&err), ActuatorResult::FatalFailure(err.to_string()));
    }
}
