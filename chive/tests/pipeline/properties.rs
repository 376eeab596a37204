//! Memoization, dependency filtering, save-once and resume guarantees across run instances.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chive::{
    CheckpointKey, CheckpointState, CheckpointStore, FileStore, NodeError, Outcome,
    ParamBinding, PipelineBuilder, PolicyDescriptor, PolicyOverride, Recompute, RecordId,
    RunError, Runner, SessionContext, SetupError, StoreError,
};
use serde_json::json;

use crate::common::{count, counter, hello_pipeline, CountingStore, UnreachableStore};

/// **Scenario**: A parameter outside a checkpoint's closure does not split its records.
///
/// Given: output depends on `k` and `node_2`; `node_2` depends only on `dataset`
/// When: two datasets times two values of `k` run
/// Then: four instances, two records, `node_2` computed and saved once per dataset
#[test]
fn unrelated_param_shares_records() {
    let calls = counter();
    let c = calls.clone();
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x", "y"])
        .add_param("k", [1, 2])
        .add_checkpoint("node_2", &["dataset"], PolicyDescriptor::new(), move |args| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(json!(args.parse::<String>("dataset")?.to_uppercase()))
        })
        .add_output("score", &["node_2", "k"], |args| {
            Ok(json!(format!("{}{}", args.parse::<String>("node_2")?, args.parse::<i64>("k")?)))
        });
    let pipeline = b.compile().unwrap();
    let mut session = SessionContext::new();
    pipeline.register_params(&mut session);
    let store = Arc::new(CountingStore::default());

    let report = Runner::new(&pipeline, &session, store.clone()).run();

    let ids: Vec<_> = report.instances.iter().map(|i| i.id()).collect();
    assert_eq!(
        ids,
        vec![
            "score[dataset=x, k=1]",
            "score[dataset=x, k=2]",
            "score[dataset=y, k=1]",
            "score[dataset=y, k=2]",
        ]
    );
    assert!(report.is_success());
    assert_eq!(count(&calls), 2);
    assert_eq!(store.saves(), 2);
    assert_eq!(
        store.records().unwrap(),
        vec![
            RecordId::new(CheckpointKey::from("dataset=x"), "node_2"),
            RecordId::new(CheckpointKey::from("dataset=y"), "node_2"),
        ]
    );
    assert_eq!(
        report.instances[1].checkpoint_state("node_2"),
        Some(CheckpointState::CacheHit)
    );
    match &report.instances[3].outcome {
        Outcome::Passed(v) => assert_eq!(v, &json!("Y2")),
        other => panic!("expected Passed, got {:?}", other),
    }
}

/// **Scenario**: A second runner over the same store resumes from checkpoints; a cache hit
/// leaves everything upstream unevaluated.
#[test]
fn resume_from_store_skips_upstream() {
    let store = Arc::new(CountingStore::default());
    let (b, node_1_calls, node_2_calls) = hello_pipeline(&["x"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let first = Runner::new(&pipeline, &session, store.clone()).run();
    assert_eq!(
        first.instances[0].checkpoint_state("node_2"),
        Some(CheckpointState::Persisted)
    );
    let second = Runner::new(&pipeline, &session, store.clone()).run();

    assert!(second.is_success());
    assert_eq!(
        second.instances[0].checkpoint_state("node_2"),
        Some(CheckpointState::CacheHit)
    );
    assert_eq!(count(&node_1_calls), 1);
    assert_eq!(count(&node_2_calls), 1);
    assert_eq!(store.saves(), 1);
    match &second.instances[0].outcome {
        Outcome::Passed(v) => assert_eq!(v, &json!("x:1")),
        other => panic!("expected Passed, got {:?}", other),
    }
}

/// **Scenario**: An always-recompute policy ignores stored records on every instance.
#[test]
fn always_policy_recomputes_each_run() {
    let store = Arc::new(CountingStore::default());
    let (b, _, node_2_calls) =
        hello_pipeline(&["x"], PolicyDescriptor::new().recompute(Recompute::Always));
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    for _ in 0..3 {
        let report = Runner::new(&pipeline, &session, store.clone()).run();
        assert_eq!(
            report.instances[0].checkpoint_state("node_2"),
            Some(CheckpointState::Persisted)
        );
    }
    assert_eq!(count(&node_2_calls), 3);
    assert_eq!(store.saves(), 3);
    assert_eq!(store.loads(), 0);
}

/// **Scenario**: A configured override replaces the declared policy and record name.
#[test]
fn session_override_applies() {
    let store = Arc::new(CountingStore::default());
    let record = RecordId::new(CheckpointKey::from("dataset=x"), "node_2");
    store.inner.save(&record, &json!("stored")).unwrap();

    let (b, _, node_2_calls) = hello_pipeline(&["x"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let mut session = SessionContext::new();
    session.override_policy(
        "node_2",
        PolicyOverride {
            recompute: Some(Recompute::Always),
            save_name: Some("renamed".into()),
        },
    );

    let report = Runner::new(&pipeline, &session, store.clone()).run();
    assert!(report.is_success());
    assert_eq!(count(&node_2_calls), 1);
    let renamed = RecordId::new(CheckpointKey::from("dataset=x"), "renamed");
    assert_eq!(store.inner.load(&renamed).unwrap(), json!("x:1"));
    assert_eq!(store.inner.load(&record).unwrap(), json!("stored"));
}

/// **Scenario**: Session parameter values replace the declared defaults.
#[test]
fn session_params_take_precedence() {
    let store = Arc::new(CountingStore::default());
    let (b, _, _) = hello_pipeline(&["x", "y"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let mut session = SessionContext::new();
    session.load_param("dataset", vec![json!("z")], true);
    pipeline.register_params(&mut session);

    let report = Runner::new(&pipeline, &session, store.clone()).run();
    assert_eq!(report.instances.len(), 1);
    assert_eq!(report.instances[0].id(), "other_function[dataset=z]");
}

/// **Scenario**: The save_path node yields the unfiltered key of the instance.
#[test]
fn save_path_node_reports_full_key() {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x"])
        .add_param("k", [3])
        .add_save_path_node()
        .add_output("where", &["save_path", "dataset", "k"], |args| {
            Ok(args.get("save_path").cloned().unwrap_or_default())
        });
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let report = Runner::new(&pipeline, &session, Arc::new(CountingStore::default())).run();
    match &report.instances[0].outcome {
        Outcome::Passed(v) => assert_eq!(v, &json!("dataset=x/k=3")),
        other => panic!("expected Passed, got {:?}", other),
    }
}

/// **Scenario**: A failed save surfaces once as a persistence error; the output fails and
/// nothing is recorded.
#[test]
fn failed_save_fails_the_instance() {
    let (b, _, node_2_calls) = hello_pipeline(&["x"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let report = Runner::new(&pipeline, &session, Arc::new(UnreachableStore)).run();
    let instance = &report.instances[0];
    match &instance.outcome {
        Outcome::Failed(e @ NodeError::Persistence { .. }) => assert_eq!(e.node(), "node_2"),
        other => panic!("expected persistence failure, got {:?}", other),
    }
    assert_eq!(
        instance.checkpoint_state("node_2"),
        Some(CheckpointState::Computed)
    );
    assert_eq!(count(&node_2_calls), 1);
}

/// **Scenario**: Every checkpointed step is restored after teardown.
#[test]
fn teardown_restores_all_steps() {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x"])
        .add_checkpoint("a", &["dataset"], PolicyDescriptor::new(), |_| Ok(json!(1)))
        .add_checkpoint("b", &["a"], PolicyDescriptor::new(), |_| Ok(json!(2)))
        .add_output("out", &["b"], |_| Ok(json!(3)));
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();
    let runner = Runner::new(&pipeline, &session, Arc::new(CountingStore::default()));

    let report = runner.run();
    assert_eq!(
        report.instances[0].checkpoints,
        vec![
            ("a".to_string(), CheckpointState::Persisted),
            ("b".to_string(), CheckpointState::Persisted),
        ]
    );
    assert_eq!(runner.controller().state("a"), Some(CheckpointState::Restored));
    assert_eq!(runner.controller().state("b"), Some(CheckpointState::Restored));
}

/// **Scenario**: Explicit instances are checked against the output's closure.
#[test]
fn run_instance_validates_binding() {
    let (b, _, _) = hello_pipeline(&["x"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();
    let runner = Runner::new(&pipeline, &session, Arc::new(CountingStore::default()));

    assert!(matches!(
        runner.run_instance("node_2", &ParamBinding::new()),
        Err(RunError::UnknownOutput(_))
    ));
    assert!(matches!(
        runner.run_instance("other_function", &ParamBinding::new()),
        Err(RunError::MissingParameter { .. })
    ));

    let binding: ParamBinding = [("dataset".to_string(), json!("w"))].into_iter().collect();
    let instance = runner.run_instance("other_function", &binding).unwrap();
    assert!(instance.outcome.is_passed());
    assert_eq!(runner.run_output("other_function").unwrap().len(), 1);
}

/// **Scenario**: Plain nodes run once per value of their own parameters, not once per
/// instance; nodes reading the run context still run per instance.
///
/// Given: `prep` depends on `dataset`, `seed` is an input without parameters, `where` reads
/// the save path; the output depends on all three and `k`
/// When: two datasets times three values of `k` run
/// Then: `prep` runs twice, `seed` once, `where` six times
#[test]
fn plain_nodes_shared_across_instances() {
    let prep_calls = counter();
    let seed_calls = counter();
    let where_calls = counter();
    let (p, s, w) = (prep_calls.clone(), seed_calls.clone(), where_calls.clone());
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x", "y"])
        .add_param("k", [1, 2, 3])
        .add_save_path_node()
        .add_input("seed", &[], move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(json!(7))
        })
        .add_node("prep", &["dataset"], move |args| {
            p.fetch_add(1, Ordering::SeqCst);
            Ok(json!(args.parse::<String>("dataset")?.to_uppercase()))
        })
        .add_node("where", &["save_path"], move |args| {
            w.fetch_add(1, Ordering::SeqCst);
            Ok(args.get("save_path").cloned().unwrap_or_default())
        })
        .add_output("fit", &["prep", "k", "seed", "where"], |args| {
            Ok(json!(format!(
                "{}{}+{}@{}",
                args.parse::<String>("prep")?,
                args.parse::<i64>("k")?,
                args.parse::<i64>("seed")?,
                args.parse::<String>("where")?
            )))
        });
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let report = Runner::new(&pipeline, &session, Arc::new(CountingStore::default())).run();

    assert_eq!(report.instances.len(), 6);
    assert!(report.is_success());
    assert_eq!(count(&prep_calls), 2);
    assert_eq!(count(&seed_calls), 1);
    assert_eq!(count(&where_calls), 6);
    match &report.instances[5].outcome {
        Outcome::Passed(v) => assert_eq!(v, &json!("Y3+7@dataset=y/k=3")),
        other => panic!("expected Passed, got {:?}", other),
    }
}

/// **Scenario**: Parameter values shaped like paths neither share records nor write outside
/// the store root.
///
/// Given: a file store under `<tmp>/store` and datasets `x/..`, `y/..`, `a/../../escape`
/// When: the pipeline runs twice
/// Then: the second run hits three distinct records, each holding its own dataset, and
/// nothing is written to `<tmp>/escape`
#[test]
fn path_like_params_keep_records_apart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("store")));
    let datasets = ["x/..", "y/..", "a/../../escape"];
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", datasets)
        .add_checkpoint("node_2", &["dataset"], PolicyDescriptor::new(), |args| {
            Ok(args.get("dataset").cloned().unwrap_or_default())
        })
        .add_output("out", &["node_2"], |args| {
            Ok(args.get("node_2").cloned().unwrap_or_default())
        });
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let first = Runner::new(&pipeline, &session, store.clone()).run();
    assert!(first.is_success());
    let second = Runner::new(&pipeline, &session, store.clone()).run();

    for (instance, dataset) in second.instances.iter().zip(datasets) {
        assert_eq!(
            instance.checkpoint_state("node_2"),
            Some(CheckpointState::CacheHit)
        );
        match &instance.outcome {
            Outcome::Passed(v) => assert_eq!(v, &json!(dataset)),
            other => panic!("expected Passed, got {:?}", other),
        }
    }
    assert!(!dir.path().join("escape").exists());
    let keys: Vec<String> = store
        .records()
        .unwrap()
        .into_iter()
        .map(|r| r.key.to_string())
        .collect();
    assert_eq!(
        keys,
        vec![
            "dataset=a%2F..%2F..%2Fescape",
            "dataset=x%2F..",
            "dataset=y%2F..",
        ]
    );
}

/// **Scenario**: A record that cannot be decoded is a cache miss: the node is recomputed and
/// the record overwritten.
#[test]
fn corrupt_record_is_recomputed() {
    let store = Arc::new(CountingStore::default());
    let record = RecordId::new(CheckpointKey::from("dataset=x"), "node_2");
    store.inner.insert_raw(record.clone(), b"junk".to_vec());
    let (b, _, node_2_calls) = hello_pipeline(&["x"], PolicyDescriptor::new());
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let report = Runner::new(&pipeline, &session, store.clone()).run();

    assert!(report.is_success());
    assert_eq!(
        report.instances[0].checkpoint_state("node_2"),
        Some(CheckpointState::Persisted)
    );
    assert_eq!(count(&node_2_calls), 1);
    assert_eq!(store.inner.load(&record).unwrap(), json!("x:1"));
}

/// **Scenario**: With error-on-miss, a record that cannot be decoded aborts setup.
#[test]
fn corrupt_record_with_error_on_miss_is_fatal() {
    let store = Arc::new(CountingStore::default());
    let record = RecordId::new(CheckpointKey::from("dataset=x"), "node_2");
    store.inner.insert_raw(record, b"junk".to_vec());
    let (b, _, node_2_calls) =
        hello_pipeline(&["x"], PolicyDescriptor::new().recompute(Recompute::ErrorOnMiss));
    let pipeline = b.compile().unwrap();
    let session = SessionContext::new();

    let report = Runner::new(&pipeline, &session, store.clone()).run();
    let instance = &report.instances[0];

    match &instance.outcome {
        Outcome::SetupFailed(SetupError::MissingCheckpoint { source, .. }) => {
            assert!(matches!(source, StoreError::Deserialization(_)))
        }
        other => panic!("expected missing checkpoint, got {:?}", other),
    }
    assert_eq!(instance.checkpoint_state("node_2"), Some(CheckpointState::Fatal));
    assert_eq!(count(&node_2_calls), 0);
    assert_eq!(store.saves(), 0);
}
