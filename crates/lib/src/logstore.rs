//! Per-build log storage kept inside engine state.
//!
//! Log lines written during a build are dispatched into the store tagged with
//! the build's [`SpanId`], so one build's output can be replayed on its own,
//! independent of the live process output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logger::{Fields, Level};
use crate::model::ManifestName;

/// Correlates log and completion actions with the build that produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpanId(pub String);

impl fmt::Display for SpanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One write to the log, as it was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSegment {
  pub span_id: SpanId,
  pub manifest_name: ManifestName,
  pub level: Level,
  pub fields: Fields,
  pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct LogStore {
  segments: Vec<LogSegment>,
}

impl LogStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, segment: LogSegment) {
    self.segments.push(segment);
  }

  pub fn segments(&self) -> &[LogSegment] {
    &self.segments
  }

  pub fn len(&self) -> usize {
    self.segments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }

  /// Full text written under one span, in write order.
  pub fn span_log(&self, span_id: &SpanId) -> String {
    self
      .segments
      .iter()
      .filter(|s| &s.span_id == span_id)
      .map(|s| s.text.as_str())
      .collect()
  }

  /// Full text written for one manifest across all of its builds.
  pub fn manifest_log(&self, name: &ManifestName) -> String {
    self
      .segments
      .iter()
      .filter(|s| &s.manifest_name == name)
      .map(|s| s.text.as_str())
      .collect()
  }
}
