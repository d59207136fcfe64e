//! Test fixtures for devloop-lib.
//!
//! Small builders for manifests, build records and runtime state so unit
//! tests can focus on the behavior under test.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};

use crate::logstore::SpanId;
use crate::model::{
  BuildDetails, BuildReason, DeployTarget, DockerComposeTarget, ImageTarget, K8sTarget, LocalTarget, Manifest,
};
use crate::store::runtime::Container;
use crate::store::BuildRecord;

/// A timestamp `secs` seconds after the epoch.
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
  let deploy = K8sTarget {
    name: name.into(),
    yaml: format!("kind: Deployment\nmetadata:\n  name: {name}\n"),
    image_deps: image_targets.iter().map(|t| t.id()).collect(),
  };
  let mut manifest = Manifest::new(name, DeployTarget::K8s(deploy));
  manifest.image_targets = image_targets;
  manifest
}

pub fn dc_manifest(name: &str, images: &[&str]) -> Manifest {
  let deploy = DockerComposeTarget {
    name: name.into(),
    config_paths: vec![PathBuf::from("docker-compose.yml")],
    service_yaml: format!("{name}:\n  build: .\n"),
  };
  let mut manifest = Manifest::new(name, DeployTarget::DockerCompose(deploy));
  manifest.image_targets = images.iter().map(|i| docker_image(i)).collect();
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

/// A finished, successful build that started at `start` seconds.
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

pub fn running_container(id: &str, image_ref: &str) -> Container {
  Container {
    id: id.to_string(),
    name: format!("{id}-name"),
    image_ref: image_ref.to_string(),
    running: true,
  }
}
