//! Opcodes supported by the instruction model.
//!
//! Discriminants are the opcode bytes of the JVM instruction set; mnemonics are
//! the lowercase names used by the textual listing format.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::insn::InsnKind;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumString, IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    #[strum(serialize = "aconst_null")]
    AconstNull = 1,
    #[strum(serialize = "iconst_m1")]
    IconstM1 = 2,
    #[strum(serialize = "iconst_0")]
    Iconst0 = 3,
    #[strum(serialize = "iconst_1")]
    Iconst1 = 4,
    #[strum(serialize = "iconst_2")]
    Iconst2 = 5,
    #[strum(serialize = "iconst_3")]
    Iconst3 = 6,
    #[strum(serialize = "iconst_4")]
    Iconst4 = 7,
    #[strum(serialize = "iconst_5")]
    Iconst5 = 8,
    Bipush = 16,
    Sipush = 17,
    Ldc = 18,
    Iload = 21,
    Lload = 22,
    Fload = 23,
    Dload = 24,
    Aload = 25,
    Istore = 54,
    Lstore = 55,
    Fstore = 56,
    Dstore = 57,
    Astore = 58,
    Pop = 87,
    Dup = 89,
    Swap = 95,
    Iadd = 96,
    Isub = 100,
    Imul = 104,
    Ineg = 116,
    Iand = 126,
    Ior = 128,
    Ixor = 130,
    Ifeq = 153,
    Ifne = 154,
    #[strum(serialize = "if_icmpeq")]
    IfIcmpeq = 159,
    #[strum(serialize = "if_icmpne")]
    IfIcmpne = 160,
    #[strum(serialize = "if_acmpeq")]
    IfAcmpeq = 165,
    #[strum(serialize = "if_acmpne")]
    IfAcmpne = 166,
    Goto = 167,
    Ireturn = 172,
    Lreturn = 173,
    Freturn = 174,
    Dreturn = 175,
    Areturn = 176,
    Return = 177,
    Invokevirtual = 182,
    Invokespecial = 183,
    Invokestatic = 184,
    Invokeinterface = 185,
    New = 187,
    Anewarray = 189,
    Arraylength = 190,
    Athrow = 191,
    Checkcast = 192,
    Instanceof = 193,
    Ifnull = 198,
    Ifnonnull = 199,
}

impl Opcode {
    /// The opcode byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Lowercase mnemonic (eg., `instanceof`, `if_icmpeq`).
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Look up an opcode by mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        mnemonic.parse().ok()
    }

    /// Look up an opcode by its byte value.
    pub fn from_code(code: u8) -> Option<Self> {
        Opcode::iter().find(|op| op.code() == code)
    }

    /// Instruction form this opcode is encoded with.
    pub fn kind(self) -> InsnKind {
        use Opcode::*;

        match self {
            Bipush | Sipush => InsnKind::Int,
            Ldc => InsnKind::Ldc,
            Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore | Dstore | Astore => {
                InsnKind::Var
            }
            New | Anewarray | Checkcast | Instanceof => InsnKind::Type,
            Invokevirtual | Invokespecial | Invokestatic | Invokeinterface => InsnKind::Method,
            Ifeq | Ifne | IfIcmpeq | IfIcmpne | IfAcmpeq | IfAcmpne | Goto | Ifnull | Ifnonnull => {
                InsnKind::Jump
            }
            _ => InsnKind::Simple,
        }
    }

    /// Whether control may continue to the next instruction.
    pub fn falls_through(self) -> bool {
        !matches!(
            self,
            Opcode::Goto
                | Opcode::Ireturn
                | Opcode::Lreturn
                | Opcode::Freturn
                | Opcode::Dreturn
                | Opcode::Areturn
                | Opcode::Return
                | Opcode::Athrow
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_parse_back_to_the_same_opcode() {
        for op in Opcode::iter() {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
            assert_eq!(Opcode::from_code(op.code()), Some(op));
        }
    }

    #[test]
    fn multi_word_mnemonics_use_underscores() {
        assert_eq!(Opcode::IfIcmpeq.mnemonic(), "if_icmpeq");
        assert_eq!(Opcode::AconstNull.mnemonic(), "aconst_null");
        assert_eq!(Opcode::Invokestatic.mnemonic(), "invokestatic");
        assert_eq!(Opcode::Instanceof.code(), 193);
    }

    #[test]
    fn type_tests_are_type_instructions() {
        assert_eq!(Opcode::Instanceof.kind(), InsnKind::Type);
        assert_eq!(Opcode::Invokestatic.kind(), InsnKind::Method);
        assert_eq!(Opcode::Ifeq.kind(), InsnKind::Jump);
        assert_eq!(Opcode::Iadd.kind(), InsnKind::Simple);
    }
}
