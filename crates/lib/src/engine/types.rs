//! Types shared by the build controller and build engines.
//!
//! This module defines the build engine contract, the error type a build
//! reports, and the controller's configuration.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_MAX_CHANGED_FILES_TO_PRINT;
use crate::logger::Logger;
use crate::logstore::SpanId;
use crate::model::{ManifestName, TargetSpec, ValidateError};
use crate::store::{BuildResultSet, BuildStateSet, Dispatch};

/// Why a build failed.
///
/// Carried inside the build-complete action, so it must be cloneable and
/// cannot hold foreign error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// A target spec failed validation; the build engine was never invoked.
  #[error("invalid target: {0}")]
  Validation(#[from] ValidateError),

  /// The build engine reported a failure.
  #[error("build failed: {message}")]
  Engine { message: String },

  /// The build task panicked before reporting a result.
  #[error("build task panicked: {message}")]
  Panicked { message: String },
}

impl BuildError {
  pub fn engine(message: impl fmt::Display) -> Self {
    BuildError::Engine {
      message: message.to_string(),
    }
  }
}

/// What a build engine gets besides its targets.
#[derive(Clone)]
pub struct BuildContext {
  pub manifest_name: ManifestName,
  pub span_id: SpanId,
  /// Logs to both `tracing` and the store, attributed to this build.
  pub logger: Logger,
  pub store: Arc<dyn Dispatch>,
}

impl fmt::Debug for BuildContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildContext")
      .field("manifest_name", &self.manifest_name)
      .field("span_id", &self.span_id)
      .field("logger", &self.logger)
      .finish_non_exhaustive()
  }
}

/// Builds and deploys a manifest's targets.
///
/// Implementations may block for the whole build (image builds, pushes,
/// cluster deploys). Targets are already validated when this is called.
#[async_trait]
pub trait BuildAndDeployer: Send + Sync + 'static {
  async fn build_and_deploy(
    &self,
    ctx: &BuildContext,
    specs: &[TargetSpec],
    state_set: &BuildStateSet,
  ) -> Result<BuildResultSet, BuildError>;
}

/// Configuration for the build controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildControllerConfig {
  /// Changed files listed in the per-build summary line.
  pub max_changed_files_to_print: usize,
}

impl Default for BuildControllerConfig {
  fn default() -> Self {
    Self {
      max_changed_files_to_print: DEFAULT_MAX_CHANGED_FILES_TO_PRINT,
    }
  }
}
