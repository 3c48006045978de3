//! Instruction nodes.
//!
//! Each instruction form is a small structure with public fields, grouped in
//! the [`Insn`] tagged union. Forms follow the operand encoding of the opcode:
//! a type instruction carries an internal name, a method instruction carries
//! owner/name/descriptor, a jump carries the [`LabelId`] it targets, and so on.
//!
//! Jumps never reference instruction nodes directly. They target labels, and a
//! label is placed in an instruction list by a [`LabelInsn`] pseudo-instruction.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{
    analysis::{StackEffect, ValueKind},
    opcodes::Opcode,
    types::{AsmType, MethodType},
    utils::Error,
};

/// Common interface implemented by every instruction node.
pub trait Instruction {
    /// Opcode of the instruction, `None` for pseudo-instructions (labels).
    fn opcode(&self) -> Option<Opcode>;

    /// Effect of the instruction on the operand stack.
    fn stack_effect(&self) -> Result<StackEffect, Error>;

    /// Label targeted by the instruction, if it transfers control.
    fn jump_target(&self) -> Option<LabelId> {
        None
    }
}

/// Identifier of a code label, unique within one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelId(pub u32);

fn check_form(opcode: Opcode, kind: InsnKind) -> Result<(), Error> {
    if opcode.kind() == kind {
        Ok(())
    } else {
        Err(Error::OpcodeFormMismatch { opcode, kind })
    }
}

/// Instruction without operands (`iadd`, `areturn`, `dup`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimpleInsn {
    pub opcode: Opcode,
}

impl SimpleInsn {
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode }
    }
}

impl Instruction for SimpleInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        use Opcode::*;
        use ValueKind::*;

        check_form(self.opcode, InsnKind::Simple)?;
        Ok(match self.opcode {
            Nop | Return => StackEffect::none(),
            AconstNull => StackEffect::typed([], [Reference]),
            IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => {
                StackEffect::typed([], [Int])
            }
            Pop => StackEffect::Pop,
            Dup => StackEffect::Dup,
            Swap => StackEffect::Swap,
            Iadd | Isub | Imul | Iand | Ior | Ixor => StackEffect::typed([Int, Int], [Int]),
            Ineg => StackEffect::typed([Int], [Int]),
            Ireturn => StackEffect::typed([Int], []),
            Lreturn => StackEffect::typed([Long], []),
            Freturn => StackEffect::typed([Float], []),
            Dreturn => StackEffect::typed([Double], []),
            Areturn | Athrow => StackEffect::typed([Reference], []),
            Arraylength => StackEffect::typed([Reference], [Int]),
            _ => unreachable!("opcode form checked above"),
        })
    }
}

/// Instruction with an immediate integer operand (`bipush`, `sipush`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntInsn {
    pub opcode: Opcode,
    pub operand: i32,
}

impl IntInsn {
    pub fn new(opcode: Opcode, operand: i32) -> Self {
        Self { opcode, operand }
    }
}

impl Instruction for IntInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        check_form(self.opcode, InsnKind::Int)?;
        Ok(StackEffect::typed([], [ValueKind::Int]))
    }
}

/// Local variable load or store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarInsn {
    pub opcode: Opcode,
    pub var: u16,
}

impl VarInsn {
    pub fn new(opcode: Opcode, var: u16) -> Self {
        Self { opcode, var }
    }

    fn kind(&self) -> (ValueKind, bool) {
        use Opcode::*;

        match self.opcode {
            Iload => (ValueKind::Int, true),
            Lload => (ValueKind::Long, true),
            Fload => (ValueKind::Float, true),
            Dload => (ValueKind::Double, true),
            Aload => (ValueKind::Reference, true),
            Istore => (ValueKind::Int, false),
            Lstore => (ValueKind::Long, false),
            Fstore => (ValueKind::Float, false),
            Dstore => (ValueKind::Double, false),
            _ => (ValueKind::Reference, false),
        }
    }
}

impl Instruction for VarInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        check_form(self.opcode, InsnKind::Var)?;
        let (kind, is_load) = self.kind();
        Ok(if is_load {
            StackEffect::typed([], [kind])
        } else {
            StackEffect::typed([kind], [])
        })
    }
}

/// Instruction whose operand is a class or array type (`new`, `checkcast`,
/// `instanceof`, `anewarray`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeInsn {
    pub opcode: Opcode,
    /// Internal name of the operand type (see [`AsmType::internal_name`]).
    pub desc: String,
}

impl TypeInsn {
    pub fn new(opcode: Opcode, desc: impl Into<String>) -> Self {
        Self {
            opcode,
            desc: desc.into(),
        }
    }

    /// Build a type instruction targeting `ty`.
    pub fn of_type(opcode: Opcode, ty: &AsmType) -> Self {
        Self::new(opcode, ty.internal_name())
    }
}

impl Instruction for TypeInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        use ValueKind::*;

        check_form(self.opcode, InsnKind::Type)?;
        Ok(match self.opcode {
            Opcode::New => StackEffect::typed([], [Reference]),
            Opcode::Anewarray => StackEffect::typed([Int], [Reference]),
            Opcode::Checkcast => StackEffect::typed([Reference], [Reference]),
            _ => StackEffect::typed([Reference], [Int]),
        })
    }
}

/// Method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MethodInsn {
    pub opcode: Opcode,
    /// Internal name of the class declaring the method.
    pub owner: String,
    pub name: String,
    /// Method descriptor (eg., `(Ljava/lang/Object;)Z`).
    pub desc: String,
    /// Whether `owner` is an interface.
    pub is_interface: bool,
}

impl MethodInsn {
    pub fn new(
        opcode: Opcode,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
        is_interface: bool,
    ) -> Self {
        Self {
            opcode,
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
            is_interface,
        }
    }

    /// Decoded method descriptor.
    pub fn method_type(&self) -> Result<MethodType, Error> {
        MethodType::parse(&self.desc)
    }
}

impl Instruction for MethodInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        check_form(self.opcode, InsnKind::Method)?;
        let method_type = self.method_type()?;

        let receiver = (self.opcode != Opcode::Invokestatic).then_some(ValueKind::Reference);
        let args = method_type.args.iter().filter_map(AsmType::value_kind);
        Ok(StackEffect::typed(
            receiver.into_iter().chain(args),
            method_type.ret.value_kind(),
        ))
    }
}

/// Conditional or unconditional jump to a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JumpInsn {
    pub opcode: Opcode,
    pub label: LabelId,
}

impl JumpInsn {
    pub fn new(opcode: Opcode, label: LabelId) -> Self {
        Self { opcode, label }
    }
}

impl Instruction for JumpInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(self.opcode)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        use Opcode::*;
        use ValueKind::*;

        check_form(self.opcode, InsnKind::Jump)?;
        Ok(match self.opcode {
            Ifeq | Ifne => StackEffect::typed([Int], []),
            IfIcmpeq | IfIcmpne => StackEffect::typed([Int, Int], []),
            IfAcmpeq | IfAcmpne => StackEffect::typed([Reference, Reference], []),
            Ifnull | Ifnonnull => StackEffect::typed([Reference], []),
            _ => StackEffect::none(),
        })
    }

    fn jump_target(&self) -> Option<LabelId> {
        Some(self.label)
    }
}

/// Pseudo-instruction placing a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelInsn {
    pub label: LabelId,
}

impl Instruction for LabelInsn {
    fn opcode(&self) -> Option<Opcode> {
        None
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        Ok(StackEffect::none())
    }
}

/// Constant pool value loaded by `ldc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LdcConstant {
    Int(i32),
    String(String),
    /// Class literal.
    Type(AsmType),
}

/// Constant load (`ldc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LdcInsn {
    pub value: LdcConstant,
}

impl LdcInsn {
    pub fn new(value: LdcConstant) -> Self {
        Self { value }
    }
}

impl Instruction for LdcInsn {
    fn opcode(&self) -> Option<Opcode> {
        Some(Opcode::Ldc)
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        let kind = match self.value {
            LdcConstant::Int(_) => ValueKind::Int,
            LdcConstant::String(_) | LdcConstant::Type(_) => ValueKind::Reference,
        };
        Ok(StackEffect::typed([], [kind]))
    }
}

/// Discriminated union covering all instruction forms.
///
/// The generated [`InsnKind`] discriminant (via `strum`) classifies nodes
/// without matching on their payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(InsnKind))]
#[strum_discriminants(derive(Hash, PartialOrd, Ord))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Insn {
    Simple(SimpleInsn),
    Int(IntInsn),
    Var(VarInsn),
    Type(TypeInsn),
    Method(MethodInsn),
    Jump(JumpInsn),
    Label(LabelInsn),
    Ldc(LdcInsn),
}

macro_rules! define_insn_conversions {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        $(
            impl From<$ty> for Insn {
                fn from(value: $ty) -> Self {
                    Insn::$variant(value)
                }
            }
        )*
    };
}

define_insn_conversions!(
    Simple(SimpleInsn),
    Int(IntInsn),
    Var(VarInsn),
    Type(TypeInsn),
    Method(MethodInsn),
    Jump(JumpInsn),
    Label(LabelInsn),
    Ldc(LdcInsn),
);

impl Insn {
    /// Discriminant of this instruction.
    pub fn kind(&self) -> InsnKind {
        self.into()
    }

    /// Label placed by this node, if it is a label pseudo-instruction.
    pub fn placed_label(&self) -> Option<LabelId> {
        match self {
            Insn::Label(label) => Some(label.label),
            _ => None,
        }
    }

    /// Whether this node is a type test (`instanceof`).
    pub fn is_instance_of(&self) -> bool {
        matches!(self, Insn::Type(insn) if insn.opcode == Opcode::Instanceof)
    }
}

impl Instruction for Insn {
    fn opcode(&self) -> Option<Opcode> {
        match self {
            Insn::Simple(insn) => insn.opcode(),
            Insn::Int(insn) => insn.opcode(),
            Insn::Var(insn) => insn.opcode(),
            Insn::Type(insn) => insn.opcode(),
            Insn::Method(insn) => insn.opcode(),
            Insn::Jump(insn) => insn.opcode(),
            Insn::Label(insn) => insn.opcode(),
            Insn::Ldc(insn) => insn.opcode(),
        }
    }

    fn stack_effect(&self) -> Result<StackEffect, Error> {
        match self {
            Insn::Simple(insn) => insn.stack_effect(),
            Insn::Int(insn) => insn.stack_effect(),
            Insn::Var(insn) => insn.stack_effect(),
            Insn::Type(insn) => insn.stack_effect(),
            Insn::Method(insn) => insn.stack_effect(),
            Insn::Jump(insn) => insn.stack_effect(),
            Insn::Label(insn) => insn.stack_effect(),
            Insn::Ldc(insn) => insn.stack_effect(),
        }
    }

    fn jump_target(&self) -> Option<LabelId> {
        match self {
            Insn::Jump(insn) => insn.jump_target(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_of_pops_reference_pushes_int() {
        let insn = TypeInsn::new(Opcode::Instanceof, "java/lang/String");
        assert_eq!(
            insn.stack_effect(),
            Ok(StackEffect::typed([ValueKind::Reference], [ValueKind::Int]))
        );
    }

    #[test]
    fn virtual_calls_pop_the_receiver() {
        let insn = MethodInsn::new(
            Opcode::Invokeinterface,
            "java/util/List",
            "get",
            "(I)Ljava/lang/Object;",
            true,
        );
        assert_eq!(
            insn.stack_effect(),
            Ok(StackEffect::typed(
                [ValueKind::Reference, ValueKind::Int],
                [ValueKind::Reference]
            ))
        );
    }

    #[test]
    fn wrong_form_is_rejected() {
        let insn = TypeInsn::new(Opcode::Iadd, "java/lang/String");
        assert_eq!(
            insn.stack_effect(),
            Err(Error::OpcodeFormMismatch {
                opcode: Opcode::Iadd,
                kind: InsnKind::Type
            })
        );
    }

    #[test]
    fn only_jumps_have_targets() {
        let jump = Insn::from(JumpInsn::new(Opcode::Goto, LabelId(3)));
        let label = Insn::from(LabelInsn { label: LabelId(3) });
        assert_eq!(jump.jump_target(), Some(LabelId(3)));
        assert_eq!(label.jump_target(), None);
        assert_eq!(label.placed_label(), Some(LabelId(3)));
        assert_eq!(label.opcode(), None);
    }
}
