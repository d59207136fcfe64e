//! In-process store.
//!
//! [`MemoryStore`] keeps engine state behind a `std::sync::RwLock` and applies
//! a minimal reducer for the build lifecycle actions. Every dispatched action
//! is also recorded so callers can wait for the effects of a detached build.
//!
//! ## Limitations
//!
//! - No persistence
//! - Subscribers are not notified automatically; the embedding event loop
//!   calls [`Subscriber::on_change`](super::Subscriber::on_change) itself

use std::sync::{Mutex, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, warn};

use super::actions::{Action, LogAction};
use super::state::{BUILD_HISTORY_LIMIT, BuildRecord, EngineState};
use super::{Dispatch, Store};
use crate::buildcontrol::{BuildCompleteAction, BuildStartedAction};
use crate::logstore::LogSegment;

#[derive(Debug, Default)]
pub struct MemoryStore {
  state: RwLock<EngineState>,
  actions: Mutex<Vec<Action>>,
  dispatched: Notify,
}

impl MemoryStore {
  pub fn new(state: EngineState) -> Self {
    Self {
      state: RwLock::new(state),
      actions: Mutex::new(Vec::new()),
      dispatched: Notify::new(),
    }
  }

  /// Change state directly, bypassing the reducer.
  ///
  /// This stands in for the watchers and config loaders that feed the store
  /// in a full engine.
  pub fn mutate_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
  }

  /// Every action dispatched so far, in dispatch order.
  pub fn actions(&self) -> Vec<Action> {
    self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Wait until `pred` holds for the recorded actions.
  pub async fn wait_for(&self, pred: impl Fn(&[Action]) -> bool) {
    loop {
      let notified = self.dispatched.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      {
        let actions = self.actions.lock().unwrap_or_else(PoisonError::into_inner);
        if pred(&actions) {
          return;
        }
      }

      notified.await;
    }
  }

  fn reduce(state: &mut EngineState, action: &Action) {
    match action {
      Action::BuildStarted(a) => handle_build_started(state, a),
      Action::BuildComplete(a) => handle_build_complete(state, a),
      Action::LogWritten(a) => handle_log(state, a),
    }
  }
}

impl Dispatch for MemoryStore {
  fn dispatch(&self, action: Action) {
    {
      let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
      Self::reduce(&mut state, &action);
    }
    self
      .actions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(action);
    self.dispatched.notify_waiters();
  }
}

impl Store for MemoryStore {
  fn read_state<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    f(&state)
  }
}

fn handle_build_started(state: &mut EngineState, action: &BuildStartedAction) {
  // The count is global: it must advance even for a manifest that was
  // removed after the build was admitted.
  state.started_build_count += 1;

  let Some(ms) = state.manifest_state_mut(&action.manifest_name) else {
    warn!(manifest = %action.manifest_name, "build started for unknown manifest");
    return;
  };

  ms.current_build = Some(BuildRecord {
    span_id: action.span_id.clone(),
    reason: action.reason.clone(),
    edits: action.files_changed.clone(),
    start_time: action.start_time,
    finish_time: None,
    error: None,
  });
  ms.needs_rebuild_from_crash = false;
  ms.trigger_reason = Default::default();
  ms.config_files_that_caused_change.clear();
  debug!(manifest = %action.manifest_name, span_id = %action.span_id, "build started");
}

fn handle_build_complete(state: &mut EngineState, action: &BuildCompleteAction) {
  state.completed_build_count += 1;

  let Some(ms) = state.manifest_state_mut(&action.manifest_name) else {
    warn!(manifest = %action.manifest_name, "build completed for unknown manifest");
    return;
  };

  let Some(mut record) = ms.current_build.take_if(|b| b.span_id == action.span_id) else {
    warn!(
      manifest = %action.manifest_name,
      span_id = %action.span_id,
      "build completed without a matching started build"
    );
    return;
  };
  record.finish_time = Some(Utc::now());
  record.error = action.error.as_ref().map(|e| e.to_string());

  if action.error.is_none() {
    // Changes seen while the build ran stay pending for the next one.
    for status in ms.build_statuses.values_mut() {
      status.pending_file_changes.retain(|_, ts| *ts > record.start_time);
    }
    for (id, result) in action.result.iter() {
      ms.build_status_mut(id).last_result = Some(result.clone());
    }
  }

  ms.build_history.insert(0, record);
  ms.build_history.truncate(BUILD_HISTORY_LIMIT);
  debug!(
    manifest = %action.manifest_name,
    span_id = %action.span_id,
    success = action.error.is_none(),
    "build completed"
  );
}

fn handle_log(state: &mut EngineState, action: &LogAction) {
  state.logs.append(LogSegment {
    span_id: action.span_id.clone(),
    manifest_name: action.manifest_name.clone(),
    level: action.level,
    fields: action.fields.clone(),
    text: action.text(),
  });
}
