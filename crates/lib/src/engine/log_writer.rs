use std::sync::Arc;

use crate::logger::{Fields, Level, LogError, LogHandler};
use crate::logstore::SpanId;
use crate::model::ManifestName;
use crate::store::{Dispatch, LogAction};

/// Mirrors a build's log writes into the store as log actions.
///
/// Dispatch is fire-and-forget, so writes always succeed from the build's
/// point of view.
#[derive(Clone)]
pub struct BuildLogActionWriter {
  store: Arc<dyn Dispatch>,
  manifest_name: ManifestName,
  span_id: SpanId,
}

impl BuildLogActionWriter {
  pub fn new(store: Arc<dyn Dispatch>, manifest_name: ManifestName, span_id: SpanId) -> Self {
    Self {
      store,
      manifest_name,
      span_id,
    }
  }
}

impl LogHandler for BuildLogActionWriter {
  fn write(&self, level: Level, fields: &Fields, bytes: &[u8]) -> Result<(), LogError> {
    self.store.dispatch(
      LogAction::new(
        self.manifest_name.clone(),
        self.span_id.clone(),
        level,
        fields.clone(),
        bytes,
      )
      .into(),
    );
    Ok(())
  }
}
