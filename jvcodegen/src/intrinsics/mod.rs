//! Lowerings backed by the runtime support library.
//!
//! Each submodule replaces an instruction the JVM cannot execute with the
//! right semantics by a static call into [`INTRINSICS_CLASS`].
pub mod instance_of;

/// Internal name of the runtime class hosting the intrinsic predicates.
pub const INTRINSICS_CLASS: &str = "kotlin/jvm/internal/Intrinsics";
