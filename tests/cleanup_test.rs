//! Registry reconciliation and live listing.

mod common;

use common::Harness;
use tunnel_manager::kube::PodPhase;

#[tokio::test]
async fn cleanup_removes_exactly_the_missing_pods() {
    let harness = Harness::new();
    let manager = harness.manager();

    let targets = [
        ("db", "dev"),
        ("redis", "dev"),
        ("kafka", "dev"),
        ("opensearch", "dev"),
        ("db", "staging"),
        ("redis", "prod"),
    ];
    let records: Vec<_> = targets
        .iter()
        .map(|(service, env)| harness.seed(&manager, service, env, PodPhase::Running))
        .collect();

    // k = 2 of N = 6 pods disappear
    harness.pods.vanish(&records[1].pod_name);
    harness.pods.vanish(&records[4].pod_name);

    let report = manager.cleanup_stale().await.expect("cleanup");

    let mut removed: Vec<_> = report.removed.iter().map(|r| r.id.clone()).collect();
    removed.sort();
    assert_eq!(removed, vec!["db-staging".to_string(), "redis-dev".to_string()]);
    assert_eq!(report.kept, 4);
    assert!(report.warnings.is_empty());
    assert_eq!(manager.registry().len(), 4);

    // Cleanup never deletes pods
    assert!(harness.pods.deleted().is_empty());
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let harness = Harness::new();
    let manager = harness.manager();
    let record = harness.seed(&manager, "db", "dev", PodPhase::Running);
    harness.pods.vanish(&record.pod_name);

    assert_eq!(manager.cleanup_stale().await.unwrap().removed.len(), 1);
    let second = manager.cleanup_stale().await.unwrap();
    assert!(second.removed.is_empty());
    assert_eq!(second.kept, 0);
}

#[tokio::test]
async fn unresolvable_records_are_removed_with_a_warning() {
    let harness = Harness::new();
    let manager = harness.manager();
    let unprobeable = harness.seed(&manager, "db", "dev", PodPhase::Running);
    harness.seed(&manager, "redis", "prod", PodPhase::Running);
    let no_context = harness.seed(&manager, "kafka", "staging", PodPhase::Running);

    harness.pods.make_unprobeable(&unprobeable.pod_name);
    harness.contexts.fail_for("staging");

    let report = manager.cleanup_stale().await.expect("cleanup");

    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.kept, 1);
    let warned: Vec<_> = report.warnings.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(warned, vec!["db-dev", "kafka-staging"]);
    assert!(manager.registry().get(&no_context.id).is_none());
    assert!(manager.registry().get("redis-prod").is_some());
}

#[tokio::test]
async fn pending_and_failed_pods_are_kept() {
    let harness = Harness::new();
    let manager = harness.manager();
    harness.seed(&manager, "db", "dev", PodPhase::Pending);
    harness.seed(&manager, "redis", "dev", PodPhase::Failed);

    let report = manager.cleanup_stale().await.expect("cleanup");
    assert!(report.removed.is_empty());
    assert_eq!(report.kept, 2);
}

#[tokio::test]
async fn list_probes_each_record_live() {
    let harness = Harness::new();
    let manager = harness.manager();
    harness.seed(&manager, "db", "dev", PodPhase::Running);
    let gone = harness.seed(&manager, "redis", "dev", PodPhase::Running);
    let broken = harness.seed(&manager, "kafka", "dev", PodPhase::Running);
    harness.pods.vanish(&gone.pod_name);
    harness.pods.make_unprobeable(&broken.pod_name);

    let entries = manager.list_entries().await;
    let phases: Vec<_> = entries
        .iter()
        .map(|e| (e.record.id.as_str(), e.phase))
        .collect();
    assert_eq!(
        phases,
        vec![
            ("db-dev", PodPhase::Running),
            ("kafka-dev", PodPhase::Unknown),
            ("redis-dev", PodPhase::Missing),
        ]
    );

    let table = manager.list().await.expect("list");
    assert_eq!(table.lines().count(), 4);
    assert!(table.contains("missing"));

    // Listing never changes the registry
    assert_eq!(manager.registry().len(), 3);
}

#[tokio::test]
async fn list_reports_session_liveness() {
    let harness = Harness::new();
    let manager = harness.manager();
    let record = harness.seed(&manager, "db", "dev", PodPhase::Running);
    manager
        .registry()
        .add(record.with_pid(std::process::id()))
        .unwrap();

    let entries = manager.list_entries().await;
    assert_eq!(entries[0].session_alive, Some(true));
}

#[tokio::test]
async fn empty_list_says_so() {
    let harness = Harness::new();
    let manager = harness.manager();
    assert_eq!(manager.list().await.unwrap(), "No active tunnels");
    assert!(manager.list_entries().await.is_empty());
}
