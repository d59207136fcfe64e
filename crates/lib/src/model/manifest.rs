use std::fmt;

use serde::{Deserialize, Serialize};

use super::target::{DockerComposeTarget, ImageTarget, K8sTarget, LocalTarget, TargetSpec};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ManifestName(pub String);

impl fmt::Display for ManifestName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for ManifestName {
  fn from(name: &str) -> Self {
    ManifestName(name.to_string())
  }
}

/// Where a manifest's images end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployTarget {
  K8s(K8sTarget),
  DockerCompose(DockerComposeTarget),
  Local(LocalTarget),
}

impl DeployTarget {
  pub fn into_spec(self) -> TargetSpec {
    match self {
      DeployTarget::K8s(t) => TargetSpec::K8s(t),
      DeployTarget::DockerCompose(t) => TargetSpec::DockerCompose(t),
      DeployTarget::Local(t) => TargetSpec::Local(t),
    }
  }
}

/// A unit of deployable work: the images to build plus one deploy target.
///
/// Manifests are immutable once loaded. Whatever loads the project config
/// replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  pub name: ManifestName,
  pub image_targets: Vec<ImageTarget>,
  pub deploy_target: DeployTarget,
}

impl Manifest {
  pub fn new(name: &str, deploy_target: DeployTarget) -> Self {
    Self {
      name: ManifestName::from(name),
      image_targets: Vec::new(),
      deploy_target,
    }
  }

  pub fn with_image_target(mut self, target: ImageTarget) -> Self {
    self.image_targets.push(target);
    self
  }

  pub fn is_k8s(&self) -> bool {
    matches!(self.deploy_target, DeployTarget::K8s(_))
  }

  pub fn is_dc(&self) -> bool {
    matches!(self.deploy_target, DeployTarget::DockerCompose(_))
  }

  pub fn is_local(&self) -> bool {
    matches!(self.deploy_target, DeployTarget::Local(_))
  }

  /// Image targets in declaration order, followed by the deploy target.
  pub fn target_specs(&self) -> Vec<TargetSpec> {
    let mut specs: Vec<TargetSpec> = self.image_targets.iter().cloned().map(TargetSpec::Image).collect();
    specs.push(self.deploy_target.clone().into_spec());
    specs
  }
}
