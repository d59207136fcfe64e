//! Shared utilities.
//!
//! Common helpers used across the crate, plus fixtures for tests.

pub mod path;

#[cfg(test)]
pub mod testutil;
