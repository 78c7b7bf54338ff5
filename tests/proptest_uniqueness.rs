/// Property-based tests for the one-tunnel-per-key invariant
///
/// Random sequences of start/stop/seed operations, with service names given
/// in canonical or alias spelling, must never leave two records for the same
/// `(service, environment)`, and the persisted registry must always match
/// what the manager sees in memory.
mod common;

use common::Harness;
use proptest::prelude::*;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tunnel_manager::kube::PodPhase;
use tunnel_manager::tunnel::{tunnel_id, ServiceKind};
use tunnel_manager::{Error, StartOptions};

const ENVIRONMENTS: [&str; 3] = ["dev", "staging", "prod"];

#[derive(Debug, Clone)]
enum Operation {
    /// Another invocation persisted a record
    Seed(ServiceKind, &'static str),
    /// Start (and immediately close) a tunnel, spelled canonically or by alias
    Start(ServiceKind, &'static str, bool),
    Stop(ServiceKind, &'static str),
}

fn kind_strategy() -> impl Strategy<Value = ServiceKind> {
    prop::sample::select(ServiceKind::ALL.to_vec())
}

fn env_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ENVIRONMENTS.to_vec())
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (kind_strategy(), env_strategy()).prop_map(|(k, e)| Operation::Seed(k, e)),
        (kind_strategy(), env_strategy(), any::<bool>())
            .prop_map(|(k, e, alias)| Operation::Start(k, e, alias)),
        (kind_strategy(), env_strategy()).prop_map(|(k, e)| Operation::Stop(k, e)),
    ]
}

fn spelling(kind: ServiceKind, alias: bool) -> &'static str {
    if alias {
        kind.aliases()[0]
    } else {
        kind.name()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn at_most_one_record_per_key(ops in prop::collection::vec(operation_strategy(), 1..25)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let harness = Harness::new();
            let manager = harness.manager();
            let mut model: BTreeSet<(String, String)> = BTreeSet::new();

            for op in ops {
                match op {
                    Operation::Seed(kind, env) => {
                        harness.seed(&manager, kind.name(), env, PodPhase::Running);
                        model.insert((kind.name().to_string(), env.to_string()));
                    }
                    Operation::Start(kind, env, alias) => {
                        let cancel = CancellationToken::new();
                        let hook = cancel.clone();
                        let result = manager
                            .start_with_cancel(
                                spelling(kind, alias),
                                env,
                                StartOptions::default().on_ready(move |_| hook.cancel()),
                                cancel,
                            )
                            .await;
                        let exists = model.contains(&(kind.name().to_string(), env.to_string()));
                        match result {
                            Err(Error::Conflict { .. }) => prop_assert!(exists),
                            Ok(_) => prop_assert!(!exists),
                            Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                        }
                    }
                    Operation::Stop(kind, env) => {
                        let outcome = manager.stop(kind.name(), env).await.unwrap();
                        let existed = model.remove(&(kind.name().to_string(), env.to_string()));
                        prop_assert_eq!(outcome.is_stopped(), existed);
                    }
                }

                let records = manager.registry().list();
                let keys: BTreeSet<(String, String)> = records
                    .iter()
                    .map(|r| (r.service.clone(), r.environment.clone()))
                    .collect();
                prop_assert_eq!(keys.len(), records.len());
                prop_assert_eq!(&keys, &model);
                for record in &records {
                    prop_assert_eq!(&record.id, &tunnel_id(&record.service, &record.environment));
                }

                // A fresh invocation sees exactly the same registry
                let reloaded = harness.manager();
                prop_assert_eq!(reloaded.registry().list(), records);
            }
            Ok(())
        })?;
    }
}
