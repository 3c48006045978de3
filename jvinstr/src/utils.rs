use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::{
    analysis::ValueKind,
    insn::{InsnKind, LabelId},
    list::InsnRef,
    opcodes::Opcode,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// A type or method descriptor could not be decoded.
    #[error("Malformed descriptor `{descriptor}`: {reason}.")]
    InvalidDescriptor {
        descriptor: String,
        reason: &'static str,
    },

    /// The mnemonic does not name any supported opcode.
    #[error("Unknown opcode mnemonic `{0}`.")]
    UnknownMnemonic(String),

    /// An instruction node was built with an opcode that belongs to another form.
    #[error("Opcode `{opcode}` cannot be used in a `{kind}` instruction.")]
    OpcodeFormMismatch { opcode: Opcode, kind: InsnKind },

    /// The node reference does not belong to the instruction list (or was removed).
    #[error("Instruction node {0:?} is not part of this instruction list.")]
    UnknownNode(InsnRef),

    /// A node was expected to be of another instruction kind.
    #[error("Instruction node {node:?} is a `{found}` instruction, expected a `{expected}` instruction.")]
    UnexpectedInsn {
        node: InsnRef,
        expected: InsnKind,
        found: InsnKind,
    },

    /// A jump refers to a label that is not placed in the list.
    #[error("Jump target `{0}` is not placed in the instruction list.")]
    UnresolvedLabel(LabelId),

    /// The same label is placed more than once.
    #[error("Label `{0}` is placed more than once in the instruction list.")]
    DuplicateLabel(LabelId),

    /// Simulation popped more values than available on the operand stack.
    #[error(
        "Operand stack underflow at instruction #{index}: {needed} value(s) required, {available} available."
    )]
    StackUnderflow {
        index: usize,
        needed: usize,
        available: usize,
    },

    /// Simulation found a value of the wrong computational kind on the operand stack.
    #[error(
        "Operand stack kind mismatch at instruction #{index}: expected `{expected}`, found `{found}`."
    )]
    StackKindMismatch {
        index: usize,
        expected: ValueKind,
        found: ValueKind,
    },
}
