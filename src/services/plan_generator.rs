//! Plan Generator (§4.4): maps a `ClusterState` to a `Plan`. Pure and stateless — the
//! only inputs are this cycle's classification, expected membership, and observations.

use std::collections::BTreeMap;

use crate::domain::{Action, ClusterState, ExpectedMemberSet, Member, NodeEndpoint, NodeState, Observations, Plan, ReplicaSetConfig};

pub fn generate(
    replicaset_name: &str,
    expected: &ExpectedMemberSet,
    observations: &Observations,
    state: &ClusterState,
) -> Plan {
    match state {
        ClusterState::FreshDeploy => fresh_deploy_plan(replicaset_name, expected, observations),
        ClusterState::RedeployIpChange { max_observed_version } => {
            redeploy_plan(replicaset_name, expected, observations, *max_observed_version)
        }
        ClusterState::Scale { primary, additions, removals } => {
            scale_plan(observations, *primary, additions, removals)
        }
        ClusterState::SplitView { max_observed_version } => {
            redeploy_plan(replicaset_name, expected, observations, *max_observed_version)
        }
        ClusterState::SteadyState { .. } | ClusterState::Unstable { .. } => Plan::no_op(),
    }
}

fn fresh_deploy_plan(name: &str, expected: &ExpectedMemberSet, observations: &Observations) -> Plan {
    let members: Vec<Member> = expected
        .members
        .iter()
        .enumerate()
        .map(|(i, &endpoint)| Member::new(i as u32, endpoint))
        .collect();
    let config = ReplicaSetConfig::new(name.to_string(), 1, members);

    let target = observations
        .by_endpoint
        .values()
        .find(|v| v.state == NodeState::Uninitialized)
        .map(|v| v.endpoint)
        .or_else(|| expected.members.iter().next().copied())
        .expect("FreshDeploy implies at least one expected member");

    Plan::mutating(Action::Initiate, target, config)
}

/// Rebuilds membership from `expected`, pairing the `i`-th new IP in sort order to the
/// `i`-th `_id` in the smallest-first ordering the observed configs used (§4.4): since
/// `ObservedNodeView` records only host strings, not the ids MongoDB had assigned them,
/// this is the closest reproduction of "pair old ids to new IPs" available from this
/// cycle's observations (decision recorded in DESIGN.md). Then bumps the version past
/// every observed value.
fn redeploy_plan(
    name: &str,
    expected: &ExpectedMemberSet,
    observations: &Observations,
    max_observed_version: u64,
) -> Plan {
    let members: Vec<Member> = expected
        .members
        .iter()
        .enumerate()
        .map(|(i, &endpoint)| Member::new(i as u32, endpoint))
        .collect();

    let config = ReplicaSetConfig::new(name.to_string(), max_observed_version + 1, members);

    let target = observations
        .by_endpoint
        .values()
        .find(|v| v.state == NodeState::Member)
        .map(|v| v.endpoint)
        .or_else(|| expected.members.iter().next().copied())
        .expect("Redeploy/SplitView implies at least one candidate target");

    Plan::mutating(Action::ForceReconfigure, target, config)
}

fn scale_plan(
    observations: &Observations,
    primary: NodeEndpoint,
    additions: &[NodeEndpoint],
    removals: &[String],
) -> Plan {
    let current = observations
        .by_endpoint
        .get(&primary)
        .and_then(|v| current_config_from_view(v))
        .unwrap_or_default();

    let mut next_id = current.iter().map(|(id, _)| *id).max().map_or(0, |m| m + 1);
    let mut by_host: BTreeMap<String, u32> = current.into_iter().map(|(id, host)| (host, id)).collect();

    for host in removals {
        by_host.remove(host);
    }
    for endpoint in additions {
        let host = endpoint.host();
        if !by_host.contains_key(&host) {
            by_host.insert(host, next_id);
            next_id += 1;
        }
    }

    let version = observations
        .by_endpoint
        .get(&primary)
        .and_then(|v| v.config_version)
        .unwrap_or(0)
        + 1;

    let name = observations
        .by_endpoint
        .get(&primary)
        .and_then(|v| v.rs_name.clone())
        .unwrap_or_default();

    let mut members: Vec<Member> = by_host
        .into_iter()
        .filter_map(|(host, id)| {
            NodeEndpoint::parse_host(&host).map(|endpoint| Member::new(id, endpoint))
        })
        .collect();
    members.sort_by_key(|m| m.id);

    let config = ReplicaSetConfig::new(name, version, members);
    Plan::mutating(Action::Reconfigure, primary, config)
}

fn current_config_from_view(view: &crate::domain::ObservedNodeView) -> Option<Vec<(u32, String)>> {
    let members = view.configured_members.as_ref()?;
    Some(members.iter().map(|(host, id)| (*id, host.clone())).collect())
}

/// Escalation plan for a stuck election (§8 scenario 5): rebuilds membership from
/// `expected` and forces a reconfigure against any reachable member, the same shape as a
/// full redeploy — a stuck election is indistinguishable from a full IP turnover from the
/// Plan Generator's point of view, since neither leaves a usable primary to reconfigure
/// against normally.
pub fn primary_loss_plan(replicaset_name: &str, expected: &ExpectedMemberSet, observations: &Observations) -> Plan {
    let max_observed_version = observations.members().filter_map(|v| v.config_version).max().unwrap_or(0);
    redeploy_plan(replicaset_name, expected, observations, max_observed_version)
}
