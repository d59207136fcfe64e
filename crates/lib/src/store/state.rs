//! Engine state: the shared view every subscriber reads.
//!
//! Nothing outside the store's reducer mutates these types once the store
//! owns them. Subscribers read them under the store's read lock and request
//! changes by dispatching actions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use super::build_state::BuildResult;
use super::runtime::{DockerComposeRuntimeState, K8sRuntimeState, RuntimeState};
use crate::logstore::{LogStore, SpanId};
use crate::model::{BuildReason, BuildReasonFlag, Manifest, ManifestName, TargetId};

/// Number of finished builds kept per manifest.
pub const BUILD_HISTORY_LIMIT: usize = 2;

/// Build bookkeeping for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStatus {
  /// Changed file path -> time the change was observed.
  pub pending_file_changes: HashMap<String, DateTime<Utc>>,
  pub last_result: Option<BuildResult>,
}

/// One build of a manifest, running or finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
  pub span_id: SpanId,
  pub reason: BuildReason,
  pub edits: Vec<String>,
  pub start_time: DateTime<Utc>,
  pub finish_time: Option<DateTime<Utc>>,
  pub error: Option<String>,
}

impl BuildRecord {
  pub fn is_finished(&self) -> bool {
    self.finish_time.is_some()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestState {
  pub name: ManifestName,
  pub build_statuses: HashMap<TargetId, BuildStatus>,
  /// Finished builds, most recent first.
  pub build_history: Vec<BuildRecord>,
  pub current_build: Option<BuildRecord>,
  pub needs_rebuild_from_crash: bool,
  pub config_files_that_caused_change: Vec<String>,
  /// Reasons recorded by triggers outside of file watching (e.g. a manual trigger).
  pub trigger_reason: BuildReason,
  pub runtime_state: RuntimeState,
}

impl ManifestState {
  pub fn new(name: ManifestName) -> Self {
    Self {
      name,
      ..Self::default()
    }
  }

  pub fn started_first_build(&self) -> bool {
    self.current_build.is_some() || !self.build_history.is_empty()
  }

  /// Most recent finished build.
  pub fn last_build(&self) -> Option<&BuildRecord> {
    self.build_history.first()
  }

  /// Status for `id`, or an empty one if the target has never been seen.
  pub fn build_status(&self, id: &TargetId) -> BuildStatus {
    self.build_statuses.get(id).cloned().unwrap_or_default()
  }

  pub fn build_status_mut(&mut self, id: &TargetId) -> &mut BuildStatus {
    self.build_statuses.entry(id.clone()).or_default()
  }

  /// Record a file change observed at `at` against a target.
  pub fn add_pending_file_change(&mut self, id: &TargetId, path: &str, at: DateTime<Utc>) {
    self
      .build_status_mut(id)
      .pending_file_changes
      .insert(path.to_string(), at);
  }

  /// True if any target has a file change newer than the last build.
  pub fn has_pending_file_changes(&self) -> bool {
    let since = self.last_build().map(|b| b.start_time);
    self.build_statuses.values().any(|status| {
      status
        .pending_file_changes
        .values()
        .any(|ts| since.is_none_or(|start| *ts > start))
    })
  }

  pub fn k8s_runtime_state(&self) -> Option<&K8sRuntimeState> {
    match &self.runtime_state {
      RuntimeState::K8s(state) => Some(state),
      _ => None,
    }
  }

  pub fn dc_runtime_state(&self) -> Option<&DockerComposeRuntimeState> {
    match &self.runtime_state {
      RuntimeState::DockerCompose(state) => Some(state),
      _ => None,
    }
  }
}

/// A manifest together with its build state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTarget {
  pub manifest: Manifest,
  pub state: ManifestState,
}

impl ManifestTarget {
  pub fn new(manifest: Manifest) -> Self {
    let state = ManifestState::new(manifest.name.clone());
    Self { manifest, state }
  }

  /// Why this manifest would build if it were started now.
  pub fn next_build_reason(&self) -> BuildReason {
    let state = &self.state;
    let mut reason = state.trigger_reason.clone();
    if !state.started_first_build() {
      reason = reason.with(BuildReasonFlag::Init);
    }
    if state.has_pending_file_changes() {
      reason = reason.with(BuildReasonFlag::ChangedFiles);
    }
    if !state.config_files_that_caused_change.is_empty() {
      reason = reason.with(BuildReasonFlag::ChangedConfig);
    }
    if state.needs_rebuild_from_crash {
      reason = reason.with(BuildReasonFlag::CrashRebuild);
    }
    reason
  }
}

#[derive(Debug, Clone)]
pub struct EngineState {
  pub manifest_targets: BTreeMap<ManifestName, ManifestTarget>,
  /// Builds the store has seen start. Subscribers that start builds compare
  /// their own count against this to detect an unapplied start action.
  pub started_build_count: u64,
  pub completed_build_count: u64,
  pub max_parallel_builds: usize,
  pub logs: LogStore,
}

impl Default for EngineState {
  fn default() -> Self {
    Self {
      manifest_targets: BTreeMap::new(),
      started_build_count: 0,
      completed_build_count: 0,
      max_parallel_builds: 1,
      logs: LogStore::new(),
    }
  }
}

impl EngineState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_max_parallel_builds(mut self, max: usize) -> Self {
    self.max_parallel_builds = max;
    self
  }

  /// Add or replace a manifest, keeping any existing build state.
  pub fn upsert_manifest(&mut self, manifest: Manifest) {
    match self.manifest_targets.get_mut(&manifest.name) {
      Some(mt) => mt.manifest = manifest,
      None => {
        self
          .manifest_targets
          .insert(manifest.name.clone(), ManifestTarget::new(manifest));
      }
    }
  }

  pub fn manifest_target(&self, name: &ManifestName) -> Option<&ManifestTarget> {
    self.manifest_targets.get(name)
  }

  pub fn manifest_state_mut(&mut self, name: &ManifestName) -> Option<&mut ManifestState> {
    self.manifest_targets.get_mut(name).map(|mt| &mut mt.state)
  }

  pub fn current_build_count(&self) -> usize {
    self
      .manifest_targets
      .values()
      .filter(|mt| mt.state.current_build.is_some())
      .count()
  }

  pub fn available_build_slots(&self) -> usize {
    self.max_parallel_builds.saturating_sub(self.current_build_count())
  }
}
