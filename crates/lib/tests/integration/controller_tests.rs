//! Build controller integration tests.

use std::sync::Arc;

use devloop_lib::engine::{BuildController, BuildControllerConfig, BuildError};
use devloop_lib::logstore::SpanId;
use devloop_lib::model::{BuildReason, BuildReasonFlag, ManifestName, TargetId, ValidateError};
use devloop_lib::store::{Action, MemoryStore, Store, Subscriber};

use super::common::{
  SpyBuilder, at, completions, finished_build, k8s_manifest, local_manifest, pick, span_logs, store_with,
  wait_for_completions,
};

fn build_started(actions: &[Action]) -> Vec<devloop_lib::buildcontrol::BuildStartedAction> {
  actions
    .iter()
    .filter_map(|a| match a {
      Action::BuildStarted(s) => Some(s.clone()),
      _ => None,
    })
    .collect()
}

#[tokio::test]
async fn first_build_logs_initial_build() {
  let store = store_with(vec![k8s_manifest("myapp", &["gcr.io/myapp"])]);
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), pick("myapp"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  let actions = store.actions();
  let started = build_started(&actions);
  assert_eq!(started.len(), 1);
  assert!(started[0].reason.has(BuildReasonFlag::Init));

  let span = SpanId("build:1".to_string());
  let logs = span_logs(&actions, &span);
  assert_eq!(logs[0], "Initial Build • myapp\n");
  assert_eq!(logs[1], "building 2 targets\n");

  assert!(matches!(actions.first(), Some(Action::BuildStarted(_))));
  assert!(matches!(actions.last(), Some(Action::BuildComplete(_))));

  let calls = builder.calls();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].targets, vec![TargetId::image("gcr.io/myapp"), TargetId::k8s("myapp")]);
}

#[tokio::test]
async fn pending_changes_drive_incremental_build() {
  let store = store_with(vec![k8s_manifest("myapp", &["gcr.io/myapp"])]);
  let id = TargetId::image("gcr.io/myapp");
  store.mutate_state(|s| {
    let ms = s.manifest_state_mut(&ManifestName::from("myapp")).unwrap();
    ms.build_history.push(finished_build(1, 100));
    ms.add_pending_file_change(&id, "z.go", at(110));
    ms.add_pending_file_change(&id, "a.go", at(120));
  });
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), pick("myapp"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  let actions = store.actions();
  let started = build_started(&actions);
  assert_eq!(started[0].files_changed, vec!["a.go", "z.go"]);

  let logs = span_logs(&actions, &started[0].span_id);
  assert_eq!(logs[0], "2 Files Changed: [a.go z.go] • myapp\n");

  let call = &builder.calls()[0];
  let state = call.state_set.get(&id).unwrap();
  assert_eq!(state.files_changed(), ["a.go", "z.go"]);
  assert!(!state.needs_force_update());
}

#[tokio::test]
async fn manual_trigger_without_changes_forces_rebuild() {
  let store = store_with(vec![k8s_manifest("myapp", &["gcr.io/a", "gcr.io/b"])]);
  store.mutate_state(|s| {
    let ms = s.manifest_state_mut(&ManifestName::from("myapp")).unwrap();
    ms.build_history.push(finished_build(1, 100));
    ms.trigger_reason = BuildReason::from(BuildReasonFlag::TriggerManual);
  });
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), pick("myapp"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  let actions = store.actions();
  let started = build_started(&actions);
  let logs = span_logs(&actions, &started[0].span_id);
  assert_eq!(logs[0], "triggered manually • myapp\n");

  let call = &builder.calls()[0];
  assert_eq!(call.state_set.len(), 2);
  assert!(call.state_set.iter().all(|(_, s)| s.needs_force_update()));
}

#[tokio::test]
async fn invalid_target_skips_build_engine() {
  let mut manifest = local_manifest("lint");
  manifest.deploy_target = devloop_lib::model::DeployTarget::Local(devloop_lib::model::LocalTarget {
    name: "lint".into(),
    update_cmd: None,
    serve_cmd: None,
    deps: vec![],
  });
  let store = store_with(vec![manifest]);
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), pick("lint"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  assert!(builder.calls().is_empty());
  let complete = &completions(&store.actions())[0];
  assert!(complete.result.is_empty());
  assert!(matches!(
    complete.error,
    Some(BuildError::Validation(ValidateError::MissingLocalCmd { .. }))
  ));
}

#[tokio::test]
async fn no_build_slots_dispatches_nothing() {
  let store = store_with(vec![local_manifest("lint")]);
  store.mutate_state(|s| s.max_parallel_builds = 0);
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), pick("lint"));

  controller.on_change(&store);
  controller.on_change(&store);

  assert!(store.actions().is_empty());
  assert!(builder.calls().is_empty());
  assert_eq!(controller.builds_started_count(), 0);
}

#[tokio::test]
async fn engine_failure_is_reported_in_completion() {
  let store = store_with(vec![local_manifest("lint")]);
  let builder = SpyBuilder::failing("exit status 2");
  let mut controller = BuildController::new(builder.clone(), pick("lint"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  let complete = &completions(&store.actions())[0];
  assert_eq!(complete.error, Some(BuildError::engine("exit status 2")));
  let last = store.read_state(|s| {
    s.manifest_target(&ManifestName::from("lint"))
      .and_then(|mt| mt.state.last_build().cloned())
  });
  assert_eq!(last.unwrap().error.as_deref(), Some("build failed: exit status 2"));
}

#[tokio::test]
async fn parallel_builds_get_consecutive_spans() {
  let store = store_with(vec![local_manifest("a"), local_manifest("b")]);
  store.mutate_state(|s| s.max_parallel_builds = 2);

  // Pick any idle manifest, in name order.
  let selector = |state: &devloop_lib::store::EngineState| {
    state
      .manifest_targets
      .values()
      .find(|mt| mt.state.current_build.is_none())
      .cloned()
  };
  let builder = SpyBuilder::default();
  let mut controller = BuildController::new(builder.clone(), selector);

  controller.on_change(&store);
  controller.on_change(&store);
  wait_for_completions(&store, 2).await;

  let started = build_started(&store.actions());
  assert_eq!(started.len(), 2);
  assert_eq!(started[0].manifest_name, ManifestName::from("a"));
  assert_eq!(started[0].span_id, SpanId("build:1".to_string()));
  assert_eq!(started[1].manifest_name, ManifestName::from("b"));
  assert_eq!(started[1].span_id, SpanId("build:2".to_string()));
  assert_eq!(controller.builds_started_count(), 2);
}

#[tokio::test]
async fn stale_store_count_blocks_admission() {
  let store = Arc::new(MemoryStore::default());
  store.mutate_state(|s| {
    s.upsert_manifest(local_manifest("lint"));
    s.started_build_count = 3;
  });
  let mut controller = BuildController::new(SpyBuilder::default(), pick("lint"));

  controller.on_change(&store);
  assert!(store.actions().is_empty());
}

#[tokio::test]
async fn summary_truncation_follows_config() {
  let store = store_with(vec![local_manifest("lint")]);
  let id = TargetId::local("lint");
  store.mutate_state(|s| {
    let ms = s.manifest_state_mut(&ManifestName::from("lint")).unwrap();
    ms.build_history.push(finished_build(1, 100));
    for f in ["a.go", "b.go", "c.go"] {
      ms.add_pending_file_change(&id, f, at(200));
    }
  });
  let mut controller = BuildController::new(SpyBuilder::default(), pick("lint")).with_config(BuildControllerConfig {
    max_changed_files_to_print: 2,
  });

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  let log = store.read_state(|s| s.logs.span_log(&SpanId("build:1".to_string())));
  assert!(log.starts_with("3 Files Changed: [a.go b.go ...] • lint\n"));
}

#[tokio::test]
async fn completed_build_updates_store_history() {
  let store = store_with(vec![local_manifest("lint")]);
  let mut controller = BuildController::new(SpyBuilder::default(), pick("lint"));

  controller.on_change(&store);
  wait_for_completions(&store, 1).await;

  store.read_state(|s| {
    assert_eq!(s.started_build_count, 1);
    assert_eq!(s.completed_build_count, 1);
    let ms = &s.manifest_target(&ManifestName::from("lint")).unwrap().state;
    assert!(ms.started_first_build());
    assert!(ms.current_build.is_none());
    assert!(ms.build_status(&TargetId::local("lint")).last_result.is_some());
  });

  // Nothing changed since, but the selector still offers it: the next build
  // is a forced rebuild.
  controller.on_change(&store);
  wait_for_completions(&store, 2).await;
  let started = build_started(&store.actions());
  assert_eq!(started.len(), 2);
  assert!(!started[1].reason.has(BuildReasonFlag::Init));
}
