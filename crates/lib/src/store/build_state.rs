//! Per-target inputs and outputs of a single build.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::runtime::{ContainerInfo, ContainerLookupError};
use crate::model::TargetId;

/// What a successful build of one target produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
  pub target_id: TargetId,
  /// Image ref that was built and pushed, for image targets.
  pub image_ref: Option<String>,
  /// Containers that were updated or created by the deploy.
  pub container_ids: Vec<String>,
}

impl BuildResult {
  pub fn new(target_id: TargetId) -> Self {
    Self {
      target_id,
      image_ref: None,
      container_ids: Vec::new(),
    }
  }

  pub fn with_image_ref(mut self, image_ref: &str) -> Self {
    self.image_ref = Some(image_ref.to_string());
    self
  }

  pub fn with_container_ids(mut self, ids: Vec<String>) -> Self {
    self.container_ids = ids;
    self
  }
}

/// Results of one build, keyed by target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResultSet(BTreeMap<TargetId, BuildResult>);

impl BuildResultSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, result: BuildResult) {
    self.0.insert(result.target_id.clone(), result);
  }

  pub fn get(&self, id: &TargetId) -> Option<&BuildResult> {
    self.0.get(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&TargetId, &BuildResult)> {
    self.0.iter()
  }
}

impl FromIterator<BuildResult> for BuildResultSet {
  fn from_iter<I: IntoIterator<Item = BuildResult>>(iter: I) -> Self {
    let mut set = BuildResultSet::new();
    for result in iter {
      set.insert(result);
    }
    set
  }
}

/// Containers that a build may update in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunningContainers {
  /// Nothing was looked up, e.g. after a crash.
  #[default]
  NotAttached,
  Found(Vec<ContainerInfo>),
  LookupFailed(ContainerLookupError),
}

/// Everything the build engine needs to know about one target's history.
///
/// Built fresh for every build and never modified once handed over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildState {
  last_result: Option<BuildResult>,
  files_changed: Vec<String>,
  running_containers: RunningContainers,
  needs_force_update: bool,
}

impl BuildState {
  pub fn new(last_result: Option<BuildResult>, files_changed: Vec<String>) -> Self {
    Self {
      last_result,
      files_changed,
      running_containers: RunningContainers::NotAttached,
      needs_force_update: false,
    }
  }

  pub fn with_running_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
    self.running_containers = RunningContainers::Found(containers);
    self
  }

  pub fn with_running_container_error(mut self, err: ContainerLookupError) -> Self {
    self.running_containers = RunningContainers::LookupFailed(err);
    self
  }

  pub fn with_needs_force_update(mut self, force: bool) -> Self {
    self.needs_force_update = force;
    self
  }

  pub fn last_result(&self) -> Option<&BuildResult> {
    self.last_result.as_ref()
  }

  /// Changed files, sorted.
  pub fn files_changed(&self) -> &[String] {
    &self.files_changed
  }

  pub fn running_containers(&self) -> &RunningContainers {
    &self.running_containers
  }

  pub fn needs_force_update(&self) -> bool {
    self.needs_force_update
  }

  /// True if there is no previous result to build on incrementally.
  pub fn is_empty(&self) -> bool {
    self.last_result.is_none()
  }
}

/// Build states for every buildable target of one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStateSet(BTreeMap<TargetId, BuildState>);

impl BuildStateSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, id: TargetId, state: BuildState) {
    self.0.insert(id, state);
  }

  pub fn get(&self, id: &TargetId) -> Option<&BuildState> {
    self.0.get(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = &TargetId> {
    self.0.keys()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&TargetId, &BuildState)> {
    self.0.iter()
  }

  pub fn values_mut(&mut self) -> impl Iterator<Item = &mut BuildState> {
    self.0.values_mut()
  }

  /// Union of changed files across every target, sorted and de-duplicated.
  pub fn files_changed(&self) -> Vec<String> {
    let files: BTreeSet<&String> = self.0.values().flat_map(|s| s.files_changed.iter()).collect();
    files.into_iter().cloned().collect()
  }
}

impl<'a> IntoIterator for &'a BuildStateSet {
  type Item = (&'a TargetId, &'a BuildState);
  type IntoIter = std::collections::btree_map::Iter<'a, TargetId, BuildState>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
