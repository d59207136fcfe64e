//! Contracts between the build controller and the rest of the engine.
//!
//! - [`TargetSelector`]: the scheduling policy that picks the next manifest
//! - [`BuildStartedAction`] / [`BuildCompleteAction`]: the lifecycle actions a
//!   build dispatches into the store

use chrono::{DateTime, Utc};

use crate::engine::BuildError;
use crate::logstore::SpanId;
use crate::model::{BuildReason, ManifestName};
use crate::store::{BuildResultSet, EngineState, ManifestTarget};

/// Picks the next manifest to build.
///
/// Debouncing, dependency ordering and readiness checks all live behind this
/// trait. The controller only asks for a candidate and builds it.
pub trait TargetSelector: Send + Sync {
  fn next_target_to_build(&self, state: &EngineState) -> Option<ManifestTarget>;
}

impl<F> TargetSelector for F
where
  F: Fn(&EngineState) -> Option<ManifestTarget> + Send + Sync,
{
  fn next_target_to_build(&self, state: &EngineState) -> Option<ManifestTarget> {
    self(state)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStartedAction {
  pub manifest_name: ManifestName,
  pub start_time: DateTime<Utc>,
  pub files_changed: Vec<String>,
  pub reason: BuildReason,
  pub span_id: SpanId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCompleteAction {
  pub manifest_name: ManifestName,
  pub span_id: SpanId,
  pub result: BuildResultSet,
  pub error: Option<BuildError>,
}

impl BuildCompleteAction {
  /// A failed build carries no partial results.
  pub fn new(manifest_name: ManifestName, span_id: SpanId, result: Result<BuildResultSet, BuildError>) -> Self {
    let (result, error) = match result {
      Ok(result) => (result, None),
      Err(e) => (BuildResultSet::new(), Some(e)),
    };
    Self {
      manifest_name,
      span_id,
      result,
      error,
    }
  }

  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}
