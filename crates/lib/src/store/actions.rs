use crate::buildcontrol::{BuildCompleteAction, BuildStartedAction};
use crate::logger::{Fields, Level};
use crate::logstore::SpanId;
use crate::model::ManifestName;

/// A log write attributed to one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAction {
  pub manifest_name: ManifestName,
  pub span_id: SpanId,
  pub level: Level,
  pub fields: Fields,
  pub bytes: Vec<u8>,
}

impl LogAction {
  pub fn new(manifest_name: ManifestName, span_id: SpanId, level: Level, fields: Fields, bytes: &[u8]) -> Self {
    Self {
      manifest_name,
      span_id,
      level,
      fields,
      bytes: bytes.to_vec(),
    }
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.bytes).to_string()
  }
}

/// Every change a subscriber can request of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  BuildStarted(BuildStartedAction),
  BuildComplete(BuildCompleteAction),
  LogWritten(LogAction),
}

impl Action {
  pub fn manifest_name(&self) -> &ManifestName {
    match self {
      Action::BuildStarted(a) => &a.manifest_name,
      Action::BuildComplete(a) => &a.manifest_name,
      Action::LogWritten(a) => &a.manifest_name,
    }
  }

  pub fn span_id(&self) -> &SpanId {
    match self {
      Action::BuildStarted(a) => &a.span_id,
      Action::BuildComplete(a) => &a.span_id,
      Action::LogWritten(a) => &a.span_id,
    }
  }
}

impl From<BuildStartedAction> for Action {
  fn from(action: BuildStartedAction) -> Self {
    Action::BuildStarted(action)
  }
}

impl From<BuildCompleteAction> for Action {
  fn from(action: BuildCompleteAction) -> Self {
    Action::BuildComplete(action)
  }
}

impl From<LogAction> for Action {
  fn from(action: LogAction) -> Self {
    Action::LogWritten(action)
  }
}
