//! Textual rendering of instructions and instruction lists.
//!
//! The format is the one accepted by [`crate::parser`]: one instruction per
//! line, label placements on their own line as `L<n>:`.
use std::fmt::{Display, Formatter, Result};

use crate::{
    insn::{Insn, InsnKind, LabelId, LdcConstant},
    list::InsnList,
};

impl Display for LabelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "L{}", self.0)
    }
}

impl Display for InsnKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(match self {
            InsnKind::Simple => "simple",
            InsnKind::Int => "int",
            InsnKind::Var => "var",
            InsnKind::Type => "type",
            InsnKind::Method => "method",
            InsnKind::Jump => "jump",
            InsnKind::Label => "label",
            InsnKind::Ldc => "ldc",
        })
    }
}

fn write_escaped(f: &mut Formatter<'_>, value: &str) -> Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl Display for Insn {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Insn::Simple(insn) => write!(f, "{}", insn.opcode),
            Insn::Int(insn) => write!(f, "{} {}", insn.opcode, insn.operand),
            Insn::Var(insn) => write!(f, "{} {}", insn.opcode, insn.var),
            Insn::Type(insn) => write!(f, "{} {}", insn.opcode, insn.desc),
            Insn::Method(insn) => {
                write!(
                    f,
                    "{} {}.{} {}",
                    insn.opcode, insn.owner, insn.name, insn.desc
                )?;
                if insn.is_interface {
                    write!(f, " itf")?;
                }
                Ok(())
            }
            Insn::Jump(insn) => write!(f, "{} {}", insn.opcode, insn.label),
            Insn::Label(insn) => write!(f, "{}:", insn.label),
            Insn::Ldc(insn) => {
                write!(f, "ldc ")?;
                match &insn.value {
                    LdcConstant::Int(value) => write!(f, "{}", value),
                    LdcConstant::String(value) => write_escaped(f, value),
                    LdcConstant::Type(ty) => write!(f, "{}", ty.descriptor()),
                }
            }
        }
    }
}

impl Display for InsnList {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for insn in self.insns() {
            if insn.is_label() {
                writeln!(f, "{}", insn)?;
            } else {
                writeln!(f, "    {}", insn)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        insn::{Insn, JumpInsn, LabelId, LabelInsn, LdcConstant, LdcInsn, MethodInsn, TypeInsn},
        list::InsnList,
        opcodes::Opcode,
    };

    #[test]
    fn renders_listing() {
        let list: InsnList = [
            Insn::from(TypeInsn::new(Opcode::Instanceof, "java/util/List")),
            JumpInsn::new(Opcode::Ifeq, LabelId(0)).into(),
            MethodInsn::new(
                Opcode::Invokeinterface,
                "java/util/List",
                "size",
                "()I",
                true,
            )
            .into(),
            LabelInsn { label: LabelId(0) }.into(),
            LdcInsn::new(LdcConstant::String("say \"hi\"".into())).into(),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            list.to_string(),
            "    instanceof java/util/List\n    ifeq L0\n    invokeinterface java/util/List.size ()I itf\nL0:\n    ldc \"say \\\"hi\\\"\"\n"
        );
    }
}
