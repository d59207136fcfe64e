use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One reason a build was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildReasonFlag {
  Init,
  ChangedFiles,
  ChangedConfig,
  CrashRebuild,
  TriggerManual,
  DependencyChanged,
}

impl BuildReasonFlag {
  pub fn label(self) -> &'static str {
    match self {
      BuildReasonFlag::Init => "initial build",
      BuildReasonFlag::ChangedFiles => "changed files",
      BuildReasonFlag::ChangedConfig => "config changed",
      BuildReasonFlag::CrashRebuild => "pod crashed",
      BuildReasonFlag::TriggerManual => "triggered manually",
      BuildReasonFlag::DependencyChanged => "dependency updated",
    }
  }
}

/// The set of reasons behind a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildReason(BTreeSet<BuildReasonFlag>);

impl BuildReason {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn with(mut self, flag: BuildReasonFlag) -> Self {
    self.0.insert(flag);
    self
  }

  pub fn union(mut self, other: &BuildReason) -> Self {
    self.0.extend(other.0.iter().copied());
    self
  }

  pub fn has(&self, flag: BuildReasonFlag) -> bool {
    self.0.contains(&flag)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn flags(&self) -> impl Iterator<Item = BuildReasonFlag> + '_ {
    self.0.iter().copied()
  }
}

impl From<BuildReasonFlag> for BuildReason {
  fn from(flag: BuildReasonFlag) -> Self {
    BuildReason::empty().with(flag)
  }
}

impl fmt::Display for BuildReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.0.is_empty() {
      return write!(f, "unknown");
    }
    let labels: Vec<&str> = self.0.iter().map(|flag| flag.label()).collect();
    write!(f, "{}", labels.join(" | "))
  }
}
