//! Supervisor Loop (§4.7): drives the Reconciliation Cycle at a fixed cadence, owns the
//! process-lifetime state no other component is allowed to carry, and is the only place
//! the scale-down hysteresis decision (§9) is enforced — the classifier and planner stay
//! pure and stateless.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::{Action, ClusterState, NodeEndpoint};
use crate::ports::{MongoAdmin, TopologyObserver};
use crate::retry::RetryPolicy;
use crate::services::account_bootstrapper::AccountBootstrapper;
use crate::services::actuator::{Actuator, ActuatorResult};
use crate::services::cluster_prober::ClusterProber;
use crate::services::plan_generator;
use crate::services::state_classifier;

/// One pass of Observe → Classify → Plan → Apply → (maybe) Bootstrap, returned to the
/// caller instead of only logged so `check` can render it and tests can assert on it.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub state_label: &'static str,
    pub action: Action,
    pub actuator_result: Option<ActuatorResult>,
    pub bootstrap_ran: bool,
    /// The primary observed this cycle, if any (§3 Lifecycle: advisory only, never fed
    /// back into the classifier/planner).
    pub primary: Option<NodeEndpoint>,
}

/// Process-lifetime state that must survive across cycles but never leaks into the pure
/// classifier/planner (§9's decision on the scale-down hysteresis open question).
struct SupervisorState {
    cycle: u64,
    bootstrap_done: bool,
    pending_removal_hosts: Vec<String>,
    pending_removal_cycles: u32,
    /// Last primary observed, advisory only (§3 Lifecycle item (c)) — never consulted by
    /// the classifier or planner, only surfaced in logs/reports.
    last_known_primary: Option<NodeEndpoint>,
    /// Consecutive cycles classified `SteadyState { primary: None }`, used to escalate a
    /// stuck election to a forced reconfigure (§8 scenario 5).
    cycles_without_primary: u32,
}

impl SupervisorState {
    fn new() -> Self {
        Self {
            cycle: 0,
            bootstrap_done: false,
            pending_removal_hosts: Vec::new(),
            pending_removal_cycles: 0,
            last_known_primary: None,
            cycles_without_primary: 0,
        }
    }
}

pub struct Supervisor {
    config: Config,
    observer: Box<dyn TopologyObserver>,
    admin: Box<dyn MongoAdmin>,
    prober: ClusterProber,
    actuator: Actuator,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(config: Config, observer: Box<dyn TopologyObserver>, admin: Box<dyn MongoAdmin>) -> Self {
        let prober = ClusterProber::new(
            Duration::from_secs(config.probe_timeout_sec),
            config.probe_retries,
        );
        let retry_policy = RetryPolicy::new(
            config.admin_max_retries,
            config.admin_backoff_base_ms,
            2,
            config.admin_backoff_cap_ms,
        );
        let actuator = Actuator::new(retry_policy, Duration::from_secs(config.election_timeout_sec));
        Self {
            config,
            observer,
            admin,
            prober,
            actuator,
            state: SupervisorState::new(),
        }
    }

    /// `while not shutting_down: run_cycle(); sleep(cycle_interval)` (§4.7), exiting
    /// cleanly on Ctrl-C/SIGTERM once the in-flight cycle completes.
    pub async fn run(mut self) {
        let interval = Duration::from_secs(self.config.cycle_interval_sec);
        loop {
            let report = self.run_cycle().await;
            info!(
                cycle = report.cycle,
                state = report.state_label,
                action = ?report.action,
                primary = ?report.primary,
                "reconciliation cycle complete"
            );

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, exiting after in-flight cycle");
                    return;
                }
            }
        }
    }

    /// Runs exactly one cycle, bounded by `cycle_deadline_sec` (§5), and returns a report
    /// for logging or `check`-subcommand rendering.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.state.cycle += 1;
        let deadline = Duration::from_secs(self.config.cycle_deadline_sec);

        match tokio::time::timeout(deadline, self.run_cycle_inner()).await {
            Ok(report) => report,
            Err(_) => {
                warn!(cycle = self.state.cycle, "cycle deadline exceeded, abandoning");
                CycleReport {
                    cycle: self.state.cycle,
                    state_label: "Unstable",
                    action: Action::NoOp,
                    actuator_result: None,
                    bootstrap_ran: false,
                    primary: self.state.last_known_primary,
                }
            }
        }
    }

    async fn run_cycle_inner(&mut self) -> CycleReport {
        let expected = match self.observer.observe().await {
            Ok(expected) => expected,
            Err(err) => {
                error!(cycle = self.state.cycle, error = %err, "topology observation failed");
                return CycleReport {
                    cycle: self.state.cycle,
                    state_label: "Unstable",
                    action: Action::NoOp,
                    actuator_result: None,
                    bootstrap_ran: false,
                    primary: self.state.last_known_primary,
                };
            }
        };

        let by_endpoint = self.prober.probe(&expected, self.admin.as_ref()).await;
        let observations = crate::domain::Observations::new(by_endpoint);

        let primary = observations.primary();
        if let Some(primary) = primary {
            self.state.last_known_primary = Some(primary);
            info!(cycle = self.state.cycle, %primary, "ReplicaSet Primary is: {primary}");
        }

        let mut state = state_classifier::classify(&expected, &observations);
        self.apply_scale_down_hysteresis(&mut state);
        self.track_primary_loss(&state);

        let plan = if self.primary_loss_escalation_due() {
            warn!(
                cycle = self.state.cycle,
                cycles_without_primary = self.state.cycles_without_primary,
                "no primary observed for {} cycles spanning the election timeout, forcing reconfigure",
                self.state.cycles_without_primary
            );
            plan_generator::primary_loss_plan(&self.config.replicaset_name, &expected, &observations)
        } else {
            plan_generator::generate(&self.config.replicaset_name, &expected, &observations, &state)
        };

        let mut bootstrap_needed = false;
        let actuator_result = self.actuator.apply(&plan, self.admin.as_ref(), &expected, &mut bootstrap_needed).await;

        let mut bootstrap_ran = false;
        if bootstrap_needed || (!self.state.bootstrap_done && observations.primary().is_some()) {
            if let Some(primary) = observations.primary().or(plan.target) {
                bootstrap_ran = AccountBootstrapper::run_best_effort(primary, self.admin.as_ref(), &self.config).await;
                self.state.bootstrap_done = self.state.bootstrap_done || bootstrap_ran;
            }
        }

        CycleReport {
            cycle: self.state.cycle,
            state_label: state.label(),
            action: plan.action,
            actuator_result: Some(actuator_result),
            bootstrap_ran,
            primary,
        }
    }

    /// Tracks consecutive `SteadyState { primary: None }` classifications (§8 scenario 5);
    /// any other classification — including a healthy primary — resets the counter.
    fn track_primary_loss(&mut self, state: &ClusterState) {
        if matches!(state, ClusterState::SteadyState { primary: None }) {
            self.state.cycles_without_primary += 1;
        } else {
            self.state.cycles_without_primary = 0;
        }
    }

    /// True once no primary has been observed for at least two consecutive cycles whose
    /// combined duration covers `election_timeout_sec` (§8 scenario 5) — two cycles alone
    /// isn't enough if the cycle interval is much shorter than the election timeout.
    fn primary_loss_escalation_due(&self) -> bool {
        self.state.cycles_without_primary >= 2
            && u64::from(self.state.cycles_without_primary) * self.config.cycle_interval_sec
                >= self.config.election_timeout_sec
    }

    /// Defers a `Scale` decision with non-empty `removals` until it has recurred for
    /// `scale_down_hysteresis_cycles` consecutive cycles against the same host set,
    /// downgrading it to a no-op classification in the meantime (§9 decision: downscale
    /// hysteresis lives in the Supervisor, not the classifier, so the classifier stays
    /// stateless).
    fn apply_scale_down_hysteresis(&mut self, state: &mut ClusterState) {
        let ClusterState::Scale { removals, .. } = state else {
            self.state.pending_removal_hosts.clear();
            self.state.pending_removal_cycles = 0;
            return;
        };
        if removals.is_empty() {
            self.state.pending_removal_hosts.clear();
            self.state.pending_removal_cycles = 0;
            return;
        }

        if self.state.pending_removal_hosts == *removals {
            self.state.pending_removal_cycles += 1;
        } else {
            self.state.pending_removal_hosts = removals.clone();
            self.state.pending_removal_cycles = 1;
        }

        if self.state.pending_removal_cycles < self.config.scale_down_hysteresis_cycles {
            *state = ClusterState::Unstable {
                reason: format!(
                    "awaiting scale-down confirmation ({}/{} cycles)",
                    self.state.pending_removal_cycles, self.config.scale_down_hysteresis_cycles
                ),
            };
        }
    }
}
