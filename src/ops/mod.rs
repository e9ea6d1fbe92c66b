//! High-level operations.
//!
//! This module contains the implementation of Anvil commands.

pub mod anvil_build;
pub mod currency;

pub use anvil_build::{build, build_with_providers, BuildOptions, BuildResult};
