//! Native C/C++ build engine.
//!
//! This module implements incremental compilation and linking for a single
//! target environment: staleness decisions, the parallel compile pass, and
//! the static, shared and executable linkers.

pub mod batch;
pub mod context;
pub mod errors;
pub mod includes;
pub mod judge;
pub mod link;
pub mod overseer;
pub mod target;
pub mod toolchain;

pub use context::BuildContext;
pub use errors::{BuildError, ToolKind};
pub use judge::{GccRecompilationJudge, RecompilationJudge};
pub use overseer::CompilationOverseer;
pub use target::{TargetManager, TargetOutcome};
pub use toolchain::{CommandSpec, Compiler, GccCompiler, GccFlavor, SystemRunner, ToolRunner};
