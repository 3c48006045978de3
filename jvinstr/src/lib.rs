//! JVM-style instruction model.
//!
//! The crate exposes the pieces a bytecode backend manipulates while emitting
//! or rewriting a method body:
//!
//! - [`types`]: runtime type descriptors ([`types::AsmType`], [`types::MethodType`])
//! - [`opcodes`]: the supported [`opcodes::Opcode`] set
//! - [`insn`]: instruction nodes, grouped in the [`insn::Insn`] tagged union
//! - [`list`]: [`list::InsnList`], an ordered instruction list with stable node identities
//! - [`visitor`]: append-only emission through [`visitor::InstructionAdapter`]
//! - [`analysis`]: operand-stack effects and straight-line stack simulation
//! - `parser`: textual listings (behind the `chumsky` feature)
pub mod analysis;
pub mod fmt;
pub mod insn;
pub mod list;
pub mod opcodes;
#[cfg(feature = "chumsky")]
pub mod parser;
pub mod types;
pub mod utils;
pub mod visitor;
