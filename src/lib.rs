//! Anvil - a multi-target native build engine for C and C++
//!
//! This crate provides the core library functionality for Anvil: toolchain
//! selection, incremental compilation, linking, and dependency bundle
//! extraction for one or more target environments.

pub mod builder;
pub mod bundle;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and fakes for Anvil unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted toolchain runner and filesystem
/// fixtures with controlled modification times.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildContext, BuildError};
pub use core::environment::{Environment, EnvironmentRegistry};
pub use util::config::BuildConfig;
