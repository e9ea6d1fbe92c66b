//! Dependency bundle sources.
//!
//! Upstream artifacts arrive already resolved; this module only extracts,
//! caches and invalidates their contents.

pub mod extractor;
pub mod identifier;

pub use extractor::DependencyExtractor;
pub use identifier::DependencyIdentifier;
