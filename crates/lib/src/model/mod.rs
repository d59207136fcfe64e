//! Static description of what can be built.
//!
//! - [`Manifest`]: a named unit of deployable work
//! - [`TargetSpec`]: one buildable piece of a manifest (image or deploy target)
//! - [`BuildReason`]: why a particular build was started

mod manifest;
mod reason;
mod target;

pub use manifest::*;
pub use reason::*;
pub use target::*;
