//! Build controller loop and build-input derivation.
//!
//! The controller is driven by store changes: each change may admit one
//! build, which then runs on its own task. It handles:
//! - Admission control against the store's started-build count and build slots
//! - Per-target build-state assembly, including force-rebuild and crash rules
//! - Build lifecycle actions and per-build log bridging

mod build_state_set;
mod controller;
mod log_writer;
mod types;

pub use build_state_set::{build_state_set, build_targets};
pub use controller::{BuildController, BuildEntry, format_build_summary, span_id_for_build_log};
pub use log_writer::BuildLogActionWriter;
pub use types::{BuildAndDeployer, BuildContext, BuildControllerConfig, BuildError};
