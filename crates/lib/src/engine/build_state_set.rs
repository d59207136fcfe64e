//! Derivation of a build's inputs from a manifest's history.
//!
//! Given a manifest, its target specs and its current state, this works out
//! per target what changed, what can be reused from the last build and which
//! running containers could be updated in place.

use tracing::debug;

use crate::model::{Manifest, TargetSpec};
use crate::store::runtime::{running_containers_for_dc, running_containers_for_target_for_one_pod};
use crate::store::{BuildState, BuildStateSet, ManifestState};

/// Target specs to hand to the build engine: every image target, then the
/// manifest's single deploy target.
pub fn build_targets(manifest: &Manifest) -> Vec<TargetSpec> {
  manifest.target_specs()
}

/// Build the per-target inputs for one build of `manifest`.
///
/// Only image, docker-compose and local targets get a build state. If the
/// manifest is not recovering from a crash and no target has a file change
/// newer than the last build, every state is marked for a forced rebuild:
/// something asked for this build without touching any files, so nothing
/// may be skipped.
pub fn build_state_set(manifest: &Manifest, specs: &[TargetSpec], ms: &ManifestState) -> BuildStateSet {
  let mut result = BuildStateSet::new();
  let last_build_start = ms.last_build().map(|b| b.start_time);
  let mut any_files_changed_since_last_build = false;

  for spec in specs {
    let id = spec.id();
    if !id.target_type.has_build_state() {
      continue;
    }

    let status = ms.build_status(&id);
    let mut files_changed = Vec::with_capacity(status.pending_file_changes.len());
    for (file, ts) in &status.pending_file_changes {
      files_changed.push(file.clone());
      if last_build_start.is_none_or(|start| *ts > start) {
        any_files_changed_since_last_build = true;
      }
    }
    files_changed.sort();

    let mut build_state = BuildState::new(status.last_result, files_changed);

    // After a crash the orchestrator may have restarted containers from the
    // original image, so what we know about running containers can't be
    // trusted for an in-place update.
    if !ms.needs_rebuild_from_crash
      && let TargetSpec::Image(image) = spec
    {
      if manifest.is_k8s() {
        let lookup = match ms.k8s_runtime_state() {
          Some(runtime) => running_containers_for_target_for_one_pod(image, runtime),
          None => Ok(Vec::new()),
        };
        build_state = match lookup {
          Ok(containers) => build_state.with_running_containers(containers),
          Err(e) => {
            debug!(manifest = %manifest.name, target = %id, error = %e, "running container lookup failed");
            build_state.with_running_container_error(e)
          }
        };
      }

      if manifest.is_dc() {
        let containers = ms.dc_runtime_state().map(running_containers_for_dc).unwrap_or_default();
        build_state = build_state.with_running_containers(containers);
      }
    }

    result.insert(id, build_state);
  }

  // Crash rebuilds have no changed files either, but they are already
  // rebuilding from scratch and must not be forced.
  if !ms.needs_rebuild_from_crash && !any_files_changed_since_last_build {
    for state in result.values_mut() {
      *state = std::mem::take(state).with_needs_force_update(true);
    }
  }

  result
}
