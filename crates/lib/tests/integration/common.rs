//! Shared helpers for controller integration tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use devloop_lib::buildcontrol::BuildCompleteAction;
use devloop_lib::engine::{BuildAndDeployer, BuildContext, BuildError};
use devloop_lib::logstore::SpanId;
use devloop_lib::model::{
  BuildDetails, BuildReason, DeployTarget, ImageTarget, K8sTarget, LocalTarget, Manifest, ManifestName, TargetId,
  TargetSpec,
};
use devloop_lib::store::{
  Action, BuildRecord, BuildResult, BuildResultSet, BuildStateSet, EngineState, ManifestTarget, MemoryStore,
};

pub fn at(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn docker_image(image_ref: &str) -> ImageTarget {
  ImageTarget::new(
    image_ref,
    BuildDetails::DockerBuild {
      context: PathBuf::from("."),
      dockerfile: "Dockerfile".to_string(),
    },
  )
}

pub fn k8s_manifest(name: &str, images: &[&str]) -> Manifest {
  let image_targets: Vec<ImageTarget> = images.iter().map(|i| docker_image(i)).collect();
  let mut manifest = Manifest::new(
    name,
    DeployTarget::K8s(K8sTarget {
      name: name.into(),
      yaml: format!("kind: Deployment\nmetadata:\n  name: {name}\n"),
      image_deps: image_targets.iter().map(|t| t.id()).collect(),
    }),
  );
  manifest.image_targets = image_targets;
  manifest
}

pub fn local_manifest(name: &str) -> Manifest {
  Manifest::new(
    name,
    DeployTarget::Local(LocalTarget {
      name: name.into(),
      update_cmd: Some("make".to_string()),
      serve_cmd: None,
      deps: vec![PathBuf::from(".")],
    }),
  )
}

pub fn finished_build(count: u64, start: i64) -> BuildRecord {
  BuildRecord {
    span_id: SpanId(format!("build:{count}")),
    reason: BuildReason::empty(),
    edits: vec![],
    start_time: at(start),
    finish_time: Some(at(start + 1)),
    error: None,
  }
}

/// Store holding the given manifests, with one build slot.
pub fn store_with(manifests: Vec<Manifest>) -> Arc<MemoryStore> {
  let mut state = EngineState::new();
  for manifest in manifests {
    state.upsert_manifest(manifest);
  }
  Arc::new(MemoryStore::new(state))
}

/// Selector that always offers the named manifest while it is idle.
pub fn pick(name: &str) -> impl Fn(&EngineState) -> Option<ManifestTarget> + Send + Sync + use<> {
  let name = ManifestName::from(name);
  move |state: &EngineState| {
    state
      .manifest_target(&name)
      .filter(|mt| mt.state.current_build.is_none())
      .cloned()
  }
}

/// One recorded call into the build engine.
#[derive(Debug, Clone)]
pub struct BuildCall {
  pub span_id: SpanId,
  pub targets: Vec<TargetId>,
  pub state_set: BuildStateSet,
}

/// Build engine double that records every call and succeeds.
#[derive(Clone, Default)]
pub struct SpyBuilder {
  calls: Arc<Mutex<Vec<BuildCall>>>,
  fail_with: Option<String>,
}

impl SpyBuilder {
  pub fn failing(message: &str) -> Self {
    Self {
      calls: Arc::default(),
      fail_with: Some(message.to_string()),
    }
  }

  pub fn calls(&self) -> Vec<BuildCall> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl BuildAndDeployer for SpyBuilder {
  async fn build_and_deploy(
    &self,
    ctx: &BuildContext,
    specs: &[TargetSpec],
    state_set: &BuildStateSet,
  ) -> Result<BuildResultSet, BuildError> {
    self.calls.lock().unwrap().push(BuildCall {
      span_id: ctx.span_id.clone(),
      targets: specs.iter().map(|s| s.id()).collect(),
      state_set: state_set.clone(),
    });
    ctx.logger.info(format!("building {} targets", specs.len()));

    if let Some(message) = &self.fail_with {
      return Err(BuildError::engine(message));
    }
    Ok(specs.iter().map(|s| BuildResult::new(s.id())).collect())
  }
}

/// Wait until `count` builds have completed.
pub async fn wait_for_completions(store: &MemoryStore, count: usize) {
  tokio::time::timeout(
    Duration::from_secs(5),
    store.wait_for(|actions| completions(actions).len() >= count),
  )
  .await
  .expect("timed out waiting for build completion");
}

pub fn completions(actions: &[Action]) -> Vec<BuildCompleteAction> {
  actions
    .iter()
    .filter_map(|a| match a {
      Action::BuildComplete(c) => Some(c.clone()),
      _ => None,
    })
    .collect()
}

/// Text of every log action written under `span_id`, in order.
pub fn span_logs(actions: &[Action], span_id: &SpanId) -> Vec<String> {
  actions
    .iter()
    .filter_map(|a| match a {
      Action::LogWritten(l) if &l.span_id == span_id => Some(l.text()),
      _ => None,
    })
    .collect()
}
