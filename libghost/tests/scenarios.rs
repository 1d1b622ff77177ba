//! End-to-end injection cycles against the in-memory cluster.

use std::sync::Arc;
use std::time::Duration;

use libghost::backend::memory::Operation;
use libghost::{
    Claim, ClusterClient, InjectionOutcome, InjectionPath, LifecycleController, MemoryCluster,
    RandomSource, ScriptedSource, SeededSource, SelectionPolicy, Step, TerminalState, Volume,
};

async fn run<R: RandomSource>(
    cluster: &Arc<MemoryCluster>,
    rng: R,
    wait: Option<Duration>,
) -> InjectionOutcome {
    LifecycleController::new(
        Arc::clone(cluster) as Arc<dyn ClusterClient>,
        SelectionPolicy::new(rng),
        wait,
    )
    .run()
    .await
}

fn scenario_a_cluster() -> Arc<MemoryCluster> {
    Arc::new(
        MemoryCluster::new()
            .with_volume("pv-a")
            .with_volume("pv-b")
            .with_claim("pv-a-claim", "ns1"),
    )
}

#[tokio::test]
async fn scenario_a_matching_claim_is_deleted() {
    let cluster = scenario_a_cluster();

    let outcome = run(&cluster, ScriptedSource::new([0]), None).await;

    assert_eq!(outcome.target, Some(Volume::new("pv-a")));
    assert_eq!(outcome.path, Some(InjectionPath::Delete));
    assert_eq!(
        outcome.state,
        TerminalState::ClaimDeleted {
            volume: Volume::new("pv-a"),
            claim: Claim::new("pv-a-claim", "ns1"),
        }
    );
    assert!(cluster.volume("pv-a").is_none());
    assert!(cluster.claims().is_empty());
}

#[tokio::test]
async fn scenario_a_unmatched_volume_reports_no_matching_claim() {
    let cluster = scenario_a_cluster();

    let outcome = run(&cluster, ScriptedSource::new([1]), None).await;

    assert_eq!(outcome.target, Some(Volume::new("pv-b")));
    assert_eq!(
        outcome.state,
        TerminalState::NoMatchingClaim {
            volume: Volume::new("pv-b")
        }
    );
    assert_eq!(
        outcome.state.message(),
        "No matching persistent volume claims found for volume 'pv-b'"
    );
    assert!(!outcome.attempted(Step::DeleteClaim));
    assert_eq!(cluster.claims(), vec![Claim::new("pv-a-claim", "ns1")]);
}

#[tokio::test]
async fn scenario_a_any_seed_ends_in_one_of_two_states() {
    for seed in 0..32 {
        let cluster = scenario_a_cluster();
        let outcome = run(&cluster, SeededSource::new(Some(seed)), None).await;
        match outcome.target.as_ref().map(|v| v.name.as_str()) {
            Some("pv-a") => {
                assert!(matches!(outcome.state, TerminalState::ClaimDeleted { .. }))
            }
            Some("pv-b") => {
                assert!(matches!(outcome.state, TerminalState::NoMatchingClaim { .. }))
            }
            other => panic!("unexpected target {other:?}"),
        }
    }
}

#[tokio::test]
async fn scenario_b_no_volumes_means_no_mutations() {
    for wait in [None, Some(Duration::from_secs(5))] {
        let cluster = Arc::new(MemoryCluster::new().with_claim("pv-a-claim", "ns1"));

        let outcome = run(&cluster, ScriptedSource::default(), wait).await;

        assert_eq!(outcome.state, TerminalState::NoTargets);
        assert_eq!(outcome.target, None);
        assert_eq!(outcome.path, None);
        assert_eq!(cluster.calls(), vec![Operation::ListVolumes]);
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_c_detached_volume_without_claims() {
    let cluster = Arc::new(
        MemoryCluster::new().with_bound_volume("pv-x", Claim::new("gone", "ns1")),
    );

    let outcome = run(
        &cluster,
        ScriptedSource::default(),
        Some(Duration::from_secs(5)),
    )
    .await;

    assert_eq!(
        outcome.state,
        TerminalState::ReattachSkipped {
            volume: Volume::new("pv-x")
        }
    );
    assert_eq!(outcome.step(Step::DetachVolume), Some(true));
    assert!(!outcome.attempted(Step::AttachVolume));
    assert_eq!(
        cluster.calls(),
        vec![
            Operation::ListVolumes,
            Operation::DetachVolume,
            Operation::ListClaims,
        ]
    );
    assert_eq!(cluster.volume("pv-x").unwrap().claim_ref, None);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_detach_failure_skips_wait_and_reattach() {
    let cluster = Arc::new(
        MemoryCluster::new()
            .with_volume("pv-x")
            .with_claim("pv-x-claim", "ns1")
            .failing(Operation::DetachVolume),
    );
    let start = tokio::time::Instant::now();

    let outcome = run(
        &cluster,
        ScriptedSource::default(),
        Some(Duration::from_secs(600)),
    )
    .await;

    assert_eq!(
        outcome.state,
        TerminalState::DetachFailed {
            volume: Volume::new("pv-x")
        }
    );
    assert!(outcome.is_failure());
    assert!(!outcome.attempted(Step::Wait));
    assert!(start.elapsed() < Duration::from_secs(600));
    assert_eq!(
        cluster.calls(),
        vec![Operation::ListVolumes, Operation::DetachVolume]
    );
}

#[tokio::test]
async fn claim_deletion_only_follows_successful_volume_deletion() {
    for seed in 0..32 {
        for fail_delete in [false, true] {
            let mut cluster = MemoryCluster::new()
                .with_volume("pv-a")
                .with_volume("pv-b")
                .with_volume("pv-c")
                .with_claim("pv-a-data", "ns1")
                .with_claim("pv-c-data", "ns2")
                .with_claim("pv-c-logs", "ns2");
            if fail_delete {
                cluster = cluster.failing(Operation::DeleteVolume);
            }
            let cluster = Arc::new(cluster);

            let outcome = run(&cluster, SeededSource::new(Some(seed)), None).await;
            let calls = cluster.calls();

            if let Some(pos) = calls.iter().position(|op| *op == Operation::DeleteClaim) {
                assert!(!fail_delete);
                assert_eq!(calls[..pos].last(), Some(&Operation::ListClaims));
                assert_eq!(outcome.step(Step::DeleteVolume), Some(true));
                let target = outcome.target.as_ref().unwrap();
                match &outcome.state {
                    TerminalState::ClaimDeleted { claim, .. } => {
                        assert!(claim.name.contains(&target.name))
                    }
                    other => panic!("unexpected state {other:?}"),
                }
            } else if fail_delete {
                assert!(matches!(outcome.state, TerminalState::DeleteFailed { .. }));
                assert!(!calls.contains(&Operation::ListClaims));
            } else {
                assert_eq!(outcome.target, Some(Volume::new("pv-b")));
            }
        }
    }
}
