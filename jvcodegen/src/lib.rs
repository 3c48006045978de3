//! Code generation core for the JVM backend.
//!
//! The crate sits between the front-end type system and the [`jvinstr`]
//! instruction model:
//!
//! - [`types`] models source-level types and maps them to their erased runtime form
//! - [`intrinsics`] holds lowerings that replace a plain instruction by a call into
//!   the runtime support library, such as [`intrinsics::instance_of`]
//! - [`lowering`] drives those lowerings over emitted or already-built method bodies
//! - [`config`] and [`error`] carry the configuration and error types
pub mod config;
pub mod error;
pub mod intrinsics;
pub mod lowering;
pub mod types;

pub extern crate jvinstr;
