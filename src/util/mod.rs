//! Shared utilities

pub mod config;
pub mod fs;
pub mod layout;
pub mod process;

pub use config::BuildConfig;
pub use layout::BuildLayout;
pub use process::ProcessBuilder;
