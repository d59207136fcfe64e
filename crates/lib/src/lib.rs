//! devloop-lib: build scheduling core of a local development loop.
//!
//! This crate decides when the next build of a manifest starts, what inputs
//! it uses, and how its lifecycle is reported back to the shared store:
//! - `model`: manifests, target specs and build reasons
//! - `store`: shared engine state, actions and the store contracts
//! - `engine`: the build controller and build-state assembly
//! - `logger` / `logstore`: per-build logging mirrored into the store

pub mod buildcontrol;
pub mod consts;
pub mod engine;
pub mod logger;
pub mod logstore;
pub mod model;
pub mod store;
pub mod util;
