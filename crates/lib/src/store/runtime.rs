//! Observed runtime state of deployed manifests and running-container lookup.
//!
//! A build can only update containers in place when we know exactly which
//! containers are running the image being rebuilt. These helpers turn the
//! runtime state reported by the cluster watchers into that list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ImageTarget, image_name};

/// Errors from running-container discovery.
///
/// These never fail a build. They are attached to the target's build state
/// so the build engine can decide how to fall back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerLookupError {
  #[error("can only get container info for a single pod; found {count} pods")]
  MultiplePods { count: usize },
}

/// A container the build engine may update in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerInfo {
  pub pod_id: Option<String>,
  pub container_id: String,
  pub container_name: String,
  pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
  pub id: String,
  pub name: String,
  pub image_ref: String,
  pub running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
  pub pod_id: String,
  pub namespace: String,
  pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8sRuntimeState {
  pub pods: Vec<Pod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerComposeRuntimeState {
  pub container_id: Option<String>,
  pub container_name: String,
}

/// Runtime state for a manifest, by deploy backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeState {
  #[default]
  Unknown,
  K8s(K8sRuntimeState),
  DockerCompose(DockerComposeRuntimeState),
  Local,
}

/// Containers running `target`'s image on the single pod backing a manifest.
///
/// Returns an empty list whenever an in-place update is not possible: there
/// is no pod yet, or one of the matching containers is missing its id or
/// name or is not running. In that last case the image has to be rebuilt and
/// every container on the pod will be replaced, so none are returned.
pub fn running_containers_for_target_for_one_pod(
  target: &ImageTarget,
  runtime: &K8sRuntimeState,
) -> Result<Vec<ContainerInfo>, ContainerLookupError> {
  if runtime.pods.len() > 1 {
    return Err(ContainerLookupError::MultiplePods {
      count: runtime.pods.len(),
    });
  }

  let Some(pod) = runtime.pods.first() else {
    return Ok(Vec::new());
  };
  if pod.pod_id.is_empty() {
    return Ok(Vec::new());
  }

  let mut containers = Vec::new();
  for c in &pod.containers {
    if image_name(&c.image_ref) != target.image_name() {
      continue;
    }
    if c.id.is_empty() || c.name.is_empty() || !c.running {
      return Ok(Vec::new());
    }
    containers.push(ContainerInfo {
      pod_id: Some(pod.pod_id.clone()),
      container_id: c.id.clone(),
      container_name: c.name.clone(),
      namespace: Some(pod.namespace.clone()),
    });
  }
  Ok(containers)
}

/// The compose service's container, if one is known.
pub fn running_containers_for_dc(runtime: &DockerComposeRuntimeState) -> Vec<ContainerInfo> {
  match &runtime.container_id {
    Some(id) if !id.is_empty() => vec![ContainerInfo {
      pod_id: None,
      container_id: id.clone(),
      container_name: runtime.container_name.clone(),
      namespace: None,
    }],
    _ => Vec::new(),
  }
}
