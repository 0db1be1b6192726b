//! State Classifier (§4.3): reduces two sources of truth — the orchestrator's expected
//! membership and each node's self-reported replica-set view — to one `ClusterState`.
//! Pure and stateless: every decision is recomputed from this cycle's observations, per
//! the singleton-process design note in §9.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::domain::{ClusterState, ExpectedMemberSet, NodeEndpoint, NodeState, ObservedNodeView, Observations};

/// Classifies one cycle's observations against the expected membership (§4.3 rules,
/// evaluated in order; first match wins).
pub fn classify(expected: &ExpectedMemberSet, observations: &Observations) -> ClusterState {
    let total = expected.members.len();
    let transient = count(observations, NodeState::Transient);
    let unreachable = count(observations, NodeState::Unreachable);
    let uninitialized = count(observations, NodeState::Uninitialized);
    let member_count = observations.members().count();

    // Rule 1: Unstable.
    if total > 0 && (transient + unreachable) * 2 > total {
        return ClusterState::Unstable {
            reason: format!(
                "{}/{} expected members are transient or unreachable",
                transient + unreachable,
                total
            ),
        };
    }

    // Rule 2: FreshDeploy.
    let majority_uninitialized = uninitialized * 2 >= total;
    if member_count == 0 && majority_uninitialized && expected.pending_count == 0 {
        return ClusterState::FreshDeploy;
    }

    let expected_ips: BTreeSet<Ipv4Addr> = expected.members.iter().map(|e| e.ip).collect();
    let configured_hosts: BTreeSet<String> = observations
        .members()
        .flat_map(ObservedNodeView::configured_hosts)
        .collect();
    let configured_ips: BTreeSet<Ipv4Addr> = configured_hosts
        .iter()
        .filter_map(|h| NodeEndpoint::parse_host(h))
        .map(|e| e.ip)
        .collect();

    let max_observed_version = observations
        .members()
        .filter_map(|v| v.config_version)
        .max()
        .unwrap_or(0);

    // Rule 3: Redeploy-IPChange — total IP turnover: nothing configured is still expected,
    // nothing expected is configured anywhere (decision recorded in DESIGN.md for the
    // open question on distinguishing this from Scale).
    if member_count > 0 && !configured_ips.is_empty() && configured_ips.is_disjoint(&expected_ips) {
        return ClusterState::RedeployIpChange { max_observed_version };
    }

    if member_count > 0 {
        let configs_agree = members_agree(observations);

        if configs_agree {
            let expected_hosts: BTreeSet<String> = expected.members.iter().map(|e| e.host()).collect();
            if configured_hosts == expected_hosts {
                // Rule 6: SteadyState.
                return ClusterState::SteadyState {
                    primary: observations.primary(),
                };
            }

            // Rule 4: Scale — pure add/remove, partial overlap (not wholesale turnover).
            let additions: Vec<NodeEndpoint> = expected
                .members
                .iter()
                .filter(|e| !configured_hosts.contains(&e.host()))
                .copied()
                .collect();
            let removals: Vec<String> = configured_hosts
                .iter()
                .filter(|h| !expected_hosts.contains(*h))
                .cloned()
                .collect();
            let primary = observations
                .primary()
                .or_else(|| observations.members().map(|v| v.endpoint).next())
                .expect("member_count > 0 implies at least one observed member");
            return ClusterState::Scale {
                primary,
                additions,
                removals,
            };
        }

        // Rule 5: SplitView — members disagree on version or membership.
        return ClusterState::SplitView { max_observed_version };
    }

    // No members observed, not enough uninitialized nodes for FreshDeploy, not unstable:
    // defer without mutating (e.g. a minority of uninitialized nodes while the rest are
    // still being scheduled).
    ClusterState::Unstable {
        reason: "no replica set members observed and fresh-deploy threshold not met".to_string(),
    }
}

fn count(observations: &Observations, state: NodeState) -> usize {
    observations.by_endpoint.values().filter(|v| v.state == state).count()
}

/// Whether every observed member's config version and member set match each other.
fn members_agree(observations: &Observations) -> bool {
    let mut versions = observations.members().filter_map(|v| v.config_version);
    let mut member_sets = observations.members().map(|v| &v.configured_members);

    let first_version = versions.next();
    if versions.any(|v| Some(v) != first_version) {
        return false;
    }

    let first_set = member_sets.next();
    member_sets.all(|s| s == first_set.unwrap_or(&None))
}
