//! Shared engine state and the contracts for reading and changing it.
//!
//! The store is message passing all the way down: subscribers read a
//! snapshot through [`Store::read_state`] and request every change by
//! dispatching an [`Action`]. Only the store's reducer mutates state, so a
//! subscriber never holds a mutable reference into store-owned data.
//!
//! # Submodules
//!
//! - [`state`] - engine and per-manifest state
//! - [`build_state`] - per-target build inputs and results
//! - [`runtime`] - observed runtime state and running-container lookup
//! - [`memory`] - in-process store with a minimal reducer

mod actions;
pub mod build_state;
pub mod memory;
pub mod runtime;
pub mod state;

use std::sync::Arc;

pub use actions::*;
pub use build_state::{BuildResult, BuildResultSet, BuildState, BuildStateSet, RunningContainers};
pub use memory::MemoryStore;
pub use runtime::{ContainerInfo, ContainerLookupError, RuntimeState};
pub use state::{BuildRecord, BuildStatus, EngineState, ManifestState, ManifestTarget};

/// Accepts actions for the store's reducer.
///
/// Dispatch is fire-and-forget: the action is applied at some later point and
/// the caller never observes the outcome directly.
pub trait Dispatch: Send + Sync {
  fn dispatch(&self, action: Action);
}

/// Read access to engine state plus dispatch.
pub trait Store: Dispatch + 'static {
  /// Run `f` against the current state while holding the read lock.
  ///
  /// The lock is released when `f` returns, so `f` must not dispatch.
  fn read_state<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R;
}

/// Notified by the store's event loop after every state change.
pub trait Subscriber<S: Store> {
  fn on_change(&mut self, store: &Arc<S>);
}
