//! Target specs: the independently buildable pieces of a manifest.
//!
//! A manifest is made of zero or more image targets plus exactly one deploy
//! target. Every target exposes a stable [`TargetId`] (carrying a type tag)
//! and a [`TargetSpec::validate`] check that runs before any build work.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The name half of a [`TargetId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetName(pub String);

impl fmt::Display for TargetName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for TargetName {
  fn from(name: &str) -> Self {
    TargetName(name.to_string())
  }
}

/// Type tag of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
  Image,
  K8s,
  DockerCompose,
  Local,
}

impl TargetType {
  /// Whether targets of this type get an entry in a build state set.
  ///
  /// Kubernetes deploys have no build inputs of their own; they are driven
  /// entirely by the images they depend on.
  pub fn has_build_state(self) -> bool {
    matches!(self, TargetType::Image | TargetType::DockerCompose | TargetType::Local)
  }
}

impl fmt::Display for TargetType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TargetType::Image => write!(f, "image"),
      TargetType::K8s => write!(f, "k8s"),
      TargetType::DockerCompose => write!(f, "docker-compose"),
      TargetType::Local => write!(f, "local"),
    }
  }
}

/// Stable identity of a target, unique within a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId {
  pub target_type: TargetType,
  pub name: TargetName,
}

impl TargetId {
  pub fn new(target_type: TargetType, name: impl Into<TargetName>) -> Self {
    Self {
      target_type,
      name: name.into(),
    }
  }

  pub fn image(name: &str) -> Self {
    Self::new(TargetType::Image, name)
  }

  pub fn k8s(name: &str) -> Self {
    Self::new(TargetType::K8s, name)
  }

  pub fn docker_compose(name: &str) -> Self {
    Self::new(TargetType::DockerCompose, name)
  }

  pub fn local(name: &str) -> Self {
    Self::new(TargetType::Local, name)
  }
}

impl fmt::Display for TargetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.target_type, self.name)
  }
}

/// Errors reported by [`TargetSpec::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
  /// Every target needs a name.
  #[error("{target_type} target has an empty name")]
  EmptyName { target_type: TargetType },

  /// Image targets must say which image they produce.
  #[error("[{id}] image target has no image ref")]
  MissingImageRef { id: TargetId },

  /// Docker builds need a context directory.
  #[error("[{id}] docker build has an empty build context")]
  EmptyBuildContext { id: TargetId },

  /// Custom builds need a command.
  #[error("[{id}] custom build has an empty command")]
  EmptyCustomCommand { id: TargetId },

  /// Kubernetes targets must carry YAML to apply.
  #[error("[{id}] kubernetes target has no YAML")]
  MissingYaml { id: TargetId },

  /// Docker Compose targets need at least one config file.
  #[error("[{id}] docker compose target has no config paths")]
  MissingComposeConfig { id: TargetId },

  /// Local targets need something to run.
  #[error("[{id}] local target must have an update cmd or a serve cmd")]
  MissingLocalCmd { id: TargetId },
}

/// How an image is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildDetails {
  DockerBuild { context: PathBuf, dockerfile: String },
  CustomBuild { command: String, deps: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTarget {
  pub name: TargetName,
  /// Reference the image is pushed and deployed under, e.g. `gcr.io/app:dev-1`.
  pub image_ref: String,
  pub build_details: BuildDetails,
  pub dependency_ids: Vec<TargetId>,
}

impl ImageTarget {
  pub fn new(image_ref: &str, build_details: BuildDetails) -> Self {
    Self {
      name: TargetName(image_name(image_ref).to_string()),
      image_ref: image_ref.to_string(),
      build_details,
      dependency_ids: Vec::new(),
    }
  }

  pub fn with_dependency_ids(mut self, ids: Vec<TargetId>) -> Self {
    self.dependency_ids = ids;
    self
  }

  pub fn id(&self) -> TargetId {
    TargetId::new(TargetType::Image, self.name.clone())
  }

  /// The image ref without any tag or digest.
  pub fn image_name(&self) -> &str {
    image_name(&self.image_ref)
  }

  pub fn validate(&self) -> Result<(), ValidateError> {
    if self.name.0.is_empty() {
      return Err(ValidateError::EmptyName {
        target_type: TargetType::Image,
      });
    }
    if self.image_ref.is_empty() {
      return Err(ValidateError::MissingImageRef { id: self.id() });
    }
    match &self.build_details {
      BuildDetails::DockerBuild { context, .. } if context.as_os_str().is_empty() => {
        Err(ValidateError::EmptyBuildContext { id: self.id() })
      }
      BuildDetails::CustomBuild { command, .. } if command.trim().is_empty() => {
        Err(ValidateError::EmptyCustomCommand { id: self.id() })
      }
      _ => Ok(()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8sTarget {
  pub name: TargetName,
  pub yaml: String,
  pub image_deps: Vec<TargetId>,
}

impl K8sTarget {
  pub fn id(&self) -> TargetId {
    TargetId::new(TargetType::K8s, self.name.clone())
  }

  pub fn validate(&self) -> Result<(), ValidateError> {
    if self.name.0.is_empty() {
      return Err(ValidateError::EmptyName {
        target_type: TargetType::K8s,
      });
    }
    if self.yaml.trim().is_empty() {
      return Err(ValidateError::MissingYaml { id: self.id() });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerComposeTarget {
  pub name: TargetName,
  pub config_paths: Vec<PathBuf>,
  pub service_yaml: String,
}

impl DockerComposeTarget {
  pub fn id(&self) -> TargetId {
    TargetId::new(TargetType::DockerCompose, self.name.clone())
  }

  pub fn validate(&self) -> Result<(), ValidateError> {
    if self.name.0.is_empty() {
      return Err(ValidateError::EmptyName {
        target_type: TargetType::DockerCompose,
      });
    }
    if self.config_paths.is_empty() {
      return Err(ValidateError::MissingComposeConfig { id: self.id() });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTarget {
  pub name: TargetName,
  pub update_cmd: Option<String>,
  pub serve_cmd: Option<String>,
  pub deps: Vec<PathBuf>,
}

impl LocalTarget {
  pub fn id(&self) -> TargetId {
    TargetId::new(TargetType::Local, self.name.clone())
  }

  pub fn validate(&self) -> Result<(), ValidateError> {
    if self.name.0.is_empty() {
      return Err(ValidateError::EmptyName {
        target_type: TargetType::Local,
      });
    }
    let has_cmd = |cmd: &Option<String>| cmd.as_deref().is_some_and(|c| !c.trim().is_empty());
    if !has_cmd(&self.update_cmd) && !has_cmd(&self.serve_cmd) {
      return Err(ValidateError::MissingLocalCmd { id: self.id() });
    }
    Ok(())
  }
}

/// Any buildable target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSpec {
  Image(ImageTarget),
  K8s(K8sTarget),
  DockerCompose(DockerComposeTarget),
  Local(LocalTarget),
}

impl TargetSpec {
  pub fn id(&self) -> TargetId {
    match self {
      TargetSpec::Image(t) => t.id(),
      TargetSpec::K8s(t) => t.id(),
      TargetSpec::DockerCompose(t) => t.id(),
      TargetSpec::Local(t) => t.id(),
    }
  }

  pub fn validate(&self) -> Result<(), ValidateError> {
    match self {
      TargetSpec::Image(t) => t.validate(),
      TargetSpec::K8s(t) => t.validate(),
      TargetSpec::DockerCompose(t) => t.validate(),
      TargetSpec::Local(t) => t.validate(),
    }
  }

  pub fn as_image(&self) -> Option<&ImageTarget> {
    match self {
      TargetSpec::Image(t) => Some(t),
      _ => None,
    }
  }
}

/// Strip tag and digest from an image reference.
///
/// A colon only starts a tag when it comes after the last `/`, so registry
/// ports (`localhost:5000/app`) are kept.
pub fn image_name(image_ref: &str) -> &str {
  let without_digest = image_ref.split('@').next().unwrap_or(image_ref);
  let last_slash = without_digest.rfind('/').map_or(0, |i| i + 1);
  match without_digest[last_slash..].find(':') {
    Some(colon) => &without_digest[..last_slash + colon],
    None => without_digest,
  }
}
