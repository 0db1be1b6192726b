//! Literal end-to-end scenarios from the reconciliation design (fresh bootstrap, steady
//! state, redeploy, scale-up, startup race) run against the in-memory fakes in
//! `tests/common`.

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use common::{ep, FixedObserver, ScriptedCluster, ScriptedNode};
use rs_replicaset_operator::domain::{Action, ClusterState, ExpectedMemberSet};
use rs_replicaset_operator::services::cluster_prober::ClusterProber;
use rs_replicaset_operator::services::{plan_generator, state_classifier};
use rs_replicaset_operator::{Config, Supervisor};

fn hosts(last: &[u8]) -> BTreeSet<String> {
    last.iter().map(|&l| ep(l).host()).collect()
}

fn members_map(last: &[u8]) -> BTreeMap<String, u32> {
    last.iter().enumerate().map(|(id, &l)| (ep(l).host(), id as u32)).collect()
}

#[tokio::test]
async fn fresh_three_node_bootstrap() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(2), ep(3), ep(4)]), 3);
    let cluster = ScriptedCluster::new(BTreeMap::from([
        (ep(2), ScriptedNode::Uninitialized),
        (ep(3), ScriptedNode::Uninitialized),
        (ep(4), ScriptedNode::Uninitialized),
    ]));

    let prober = ClusterProber::new(Duration::from_millis(100), 1);
    let observations = prober.probe(&expected, &cluster).await;
    let observations = rs_replicaset_operator::domain::Observations::new(observations);

    let state = state_classifier::classify(&expected, &observations);
    assert_eq!(state, ClusterState::FreshDeploy);

    let plan = plan_generator::generate("rs0", &expected, &observations, &state);
    assert_eq!(plan.action, Action::Initiate);
    let config = plan.config.unwrap();
    assert_eq!(config.version, 1);
    assert_eq!(
        config.members.iter().map(|m| (m.id, m.host.clone())).collect::<Vec<_>>(),
        vec![(0, ep(2).host()), (1, ep(3).host()), (2, ep(4).host())]
    );
}

#[tokio::test]
async fn steady_state_reports_primary_and_applies_nothing() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(2), ep(3), ep(4)]), 3);
    let members = members_map(&[2, 3, 4]);
    let cluster = ScriptedCluster::new(BTreeMap::from([
        (
            ep(2),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: true },
        ),
        (
            ep(3),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: false },
        ),
        (
            ep(4),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members, is_primary: false },
        ),
    ]));

    let prober = ClusterProber::new(Duration::from_millis(100), 1);
    let observations = prober.probe(&expected, &cluster).await;
    let observations = rs_replicaset_operator::domain::Observations::new(observations);

    let state = state_classifier::classify(&expected, &observations);
    assert_eq!(state, ClusterState::SteadyState { primary: Some(ep(2)) });

    let plan = plan_generator::generate("rs0", &expected, &observations, &state);
    assert_eq!(plan.action, Action::NoOp);
}

#[tokio::test]
async fn full_redeploy_converges_after_force_reconfigure() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(52), ep(53), ep(54)]), 3);
    let old_hosts: BTreeMap<String, u32> = ["10.0.0.2:27017", "10.0.0.3:27017", "10.0.0.4:27017"]
        .iter()
        .enumerate()
        .map(|(i, s)| (s.to_string(), i as u32))
        .collect();
    let cluster = ScriptedCluster::new(BTreeMap::from([(
        ep(52),
        ScriptedNode::Member { rs_name: "rs0".into(), config_version: 3, configured_members: old_hosts, is_primary: false },
    )]));

    let prober = ClusterProber::new(Duration::from_millis(100), 1);
    let observations = prober.probe(&expected, &cluster).await;
    let observations = rs_replicaset_operator::domain::Observations::new(observations);

    let state = state_classifier::classify(&expected, &observations);
    assert_eq!(state, ClusterState::RedeployIpChange { max_observed_version: 3 });

    let plan = plan_generator::generate("rs0", &expected, &observations, &state);
    assert_eq!(plan.action, Action::ForceReconfigure);
    let config = plan.config.unwrap();
    assert_eq!(config.version, 4);
    assert_eq!(config.member_hosts(), hosts(&[52, 53, 54]));
}

#[tokio::test]
async fn scale_up_from_three_to_four_adds_member_on_primary() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(2), ep(3), ep(4), ep(5)]), 4);
    let members = members_map(&[2, 3, 4]);
    let cluster = ScriptedCluster::new(BTreeMap::from([
        (
            ep(2),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: true },
        ),
        (
            ep(3),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: false },
        ),
        (
            ep(4),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members, is_primary: false },
        ),
    ]));

    let prober = ClusterProber::new(Duration::from_millis(100), 1);
    let observations = prober.probe(&expected, &cluster).await;
    let observations = rs_replicaset_operator::domain::Observations::new(observations);

    let state = state_classifier::classify(&expected, &observations);
    match &state {
        ClusterState::Scale { primary, additions, removals } => {
            assert_eq!(*primary, ep(2));
            assert_eq!(additions, &vec![ep(5)]);
            assert!(removals.is_empty());
        }
        other => panic!("expected Scale, got {other:?}"),
    }

    let plan = plan_generator::generate("rs0", &expected, &observations, &state);
    assert_eq!(plan.action, Action::Reconfigure);
    assert_eq!(plan.target, Some(ep(2)));
    let config = plan.config.unwrap();
    let new_member = config.members.iter().find(|m| m.host == ep(5).host()).unwrap();
    assert_eq!(new_member.id, 3);
}

#[tokio::test]
async fn startup_race_retries_transient_nodes_before_classifying() {
    let mut expected = ExpectedMemberSet::new(BTreeSet::from([ep(2), ep(3), ep(4)]), 3);
    expected.pending_count = 1;
    let cluster = ScriptedCluster::new(BTreeMap::from([
        (ep(2), ScriptedNode::Uninitialized),
        (ep(3), ScriptedNode::Uninitialized),
        (ep(4), ScriptedNode::Unreachable),
    ]));

    let prober = ClusterProber::new(Duration::from_millis(100), 2);
    let observations = prober.probe(&expected, &cluster).await;
    let observations = rs_replicaset_operator::domain::Observations::new(observations);

    let state = state_classifier::classify(&expected, &observations);
    assert_ne!(state, ClusterState::FreshDeploy);
}

#[tokio::test]
async fn primary_loss_escalates_to_force_reconfigure_after_election_timeout() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(2), ep(3), ep(4)]), 3);
    let members = members_map(&[2, 3, 4]);
    let cluster = ScriptedCluster::new(BTreeMap::from([
        (
            ep(2),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: false },
        ),
        (
            ep(3),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members.clone(), is_primary: false },
        ),
        (
            ep(4),
            ScriptedNode::Member { rs_name: "rs0".into(), config_version: 1, configured_members: members, is_primary: false },
        ),
    ]));

    let config = Config {
        cycle_interval_sec: 1,
        election_timeout_sec: 1,
        ..Config::default()
    };
    let mut supervisor = Supervisor::new(config, Box::new(FixedObserver { expected }), Box::new(cluster));

    let first = supervisor.run_cycle().await;
    assert_eq!(first.state_label, "SteadyState");
    assert_eq!(first.action, Action::NoOp);

    let second = supervisor.run_cycle().await;
    assert_eq!(second.action, Action::ForceReconfigure);
}

#[tokio::test]
async fn observer_is_consulted_every_cycle() {
    let expected = ExpectedMemberSet::new(BTreeSet::from([ep(2)]), 1);
    let observer = FixedObserver { expected: expected.clone() };
    assert_eq!(
        rs_replicaset_operator::ports::TopologyObserver::observe(&observer).await.unwrap(),
        expected
    );
}
