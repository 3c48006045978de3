//! Append-only instruction emission.
//!
//! A [`MethodVisitor`] receives the instructions of a method body one by one,
//! in order. [`InstructionAdapter`] wraps a visitor with typed helpers that
//! pick the right opcode for a given [`AsmType`], the way a code generator
//! thinks about the operations it emits.
use crate::{
    insn::{
        Insn, IntInsn, JumpInsn, LabelId, LabelInsn, LdcConstant, LdcInsn, MethodInsn,
        SimpleInsn, TypeInsn, VarInsn,
    },
    list::InsnList,
    opcodes::Opcode,
    types::AsmType,
};

/// Sink for emitted instructions.
///
/// Implementors only ever append: instructions already received are neither
/// read back nor reordered.
pub trait MethodVisitor {
    /// Append one instruction.
    fn visit_insn(&mut self, insn: Insn);

    /// Allocate a label identifier unique within the method being emitted.
    fn new_label(&mut self) -> LabelId;
}

impl MethodVisitor for InsnList {
    fn visit_insn(&mut self, insn: Insn) {
        self.push_back(insn);
    }

    fn new_label(&mut self) -> LabelId {
        InsnList::new_label(self)
    }
}

/// Plain vector-backed instruction sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsnBuffer {
    pub insns: Vec<Insn>,
    next_label: u32,
}

impl InsnBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_insns(self) -> Vec<Insn> {
        self.insns
    }
}

impl MethodVisitor for InsnBuffer {
    fn visit_insn(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    fn new_label(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label = self.next_label.saturating_add(1);
        label
    }
}

/// Typed emission helpers on top of a [`MethodVisitor`].
///
/// ```rust
/// # use jvinstr::{insn::Insn, list::InsnList, opcodes::Opcode, types::AsmType, visitor::InstructionAdapter};
/// let mut list = InsnList::new();
/// let mut v = InstructionAdapter::new(&mut list);
/// v.load(1, &AsmType::java_object());
/// v.instance_of(&AsmType::object("java/lang/String"));
/// v.areturn(&AsmType::Boolean);
/// assert_eq!(list.len(), 3);
/// ```
pub struct InstructionAdapter<'a, V: MethodVisitor + ?Sized> {
    mv: &'a mut V,
}

impl<'a, V: MethodVisitor + ?Sized> InstructionAdapter<'a, V> {
    pub fn new(mv: &'a mut V) -> Self {
        Self { mv }
    }

    /// Underlying visitor.
    pub fn visitor(&self) -> &V {
        &*self.mv
    }

    /// Append an already-built instruction.
    pub fn visit(&mut self, insn: impl Into<Insn>) {
        self.mv.visit_insn(insn.into());
    }

    fn simple(&mut self, opcode: Opcode) {
        self.visit(SimpleInsn::new(opcode));
    }

    pub fn new_label(&mut self) -> LabelId {
        self.mv.new_label()
    }

    /// Place `label` at the current position.
    pub fn mark(&mut self, label: LabelId) {
        self.visit(LabelInsn { label });
    }

    pub fn nop(&mut self) {
        self.simple(Opcode::Nop);
    }

    pub fn aconst_null(&mut self) {
        self.simple(Opcode::AconstNull);
    }

    /// Push an int constant using the shortest encoding.
    pub fn iconst(&mut self, value: i32) {
        match value {
            -1 => self.simple(Opcode::IconstM1),
            0 => self.simple(Opcode::Iconst0),
            1 => self.simple(Opcode::Iconst1),
            2 => self.simple(Opcode::Iconst2),
            3 => self.simple(Opcode::Iconst3),
            4 => self.simple(Opcode::Iconst4),
            5 => self.simple(Opcode::Iconst5),
            v if i8::try_from(v).is_ok() => self.visit(IntInsn::new(Opcode::Bipush, v)),
            v if i16::try_from(v).is_ok() => self.visit(IntInsn::new(Opcode::Sipush, v)),
            v => self.visit(LdcInsn::new(LdcConstant::Int(v))),
        }
    }

    /// Push a string constant.
    pub fn aconst_str(&mut self, value: impl Into<String>) {
        self.visit(LdcInsn::new(LdcConstant::String(value.into())));
    }

    /// Load local `var` holding a value of type `ty`.
    pub fn load(&mut self, var: u16, ty: &AsmType) {
        let opcode = match ty {
            AsmType::Long => Opcode::Lload,
            AsmType::Float => Opcode::Fload,
            AsmType::Double => Opcode::Dload,
            AsmType::Object(_) | AsmType::Array(_) => Opcode::Aload,
            _ => Opcode::Iload,
        };
        self.visit(VarInsn::new(opcode, var));
    }

    /// Store the top of stack (of type `ty`) into local `var`.
    pub fn store(&mut self, var: u16, ty: &AsmType) {
        let opcode = match ty {
            AsmType::Long => Opcode::Lstore,
            AsmType::Float => Opcode::Fstore,
            AsmType::Double => Opcode::Dstore,
            AsmType::Object(_) | AsmType::Array(_) => Opcode::Astore,
            _ => Opcode::Istore,
        };
        self.visit(VarInsn::new(opcode, var));
    }

    /// Return a value of type `ty` (`void` emits a plain `return`).
    pub fn areturn(&mut self, ty: &AsmType) {
        let opcode = match ty {
            AsmType::Void => Opcode::Return,
            AsmType::Long => Opcode::Lreturn,
            AsmType::Float => Opcode::Freturn,
            AsmType::Double => Opcode::Dreturn,
            AsmType::Object(_) | AsmType::Array(_) => Opcode::Areturn,
            _ => Opcode::Ireturn,
        };
        self.simple(opcode);
    }

    pub fn pop(&mut self) {
        self.simple(Opcode::Pop);
    }

    pub fn dup(&mut self) {
        self.simple(Opcode::Dup);
    }

    pub fn swap(&mut self) {
        self.simple(Opcode::Swap);
    }

    pub fn athrow(&mut self) {
        self.simple(Opcode::Athrow);
    }

    pub fn arraylength(&mut self) {
        self.simple(Opcode::Arraylength);
    }

    pub fn anew(&mut self, ty: &AsmType) {
        self.visit(TypeInsn::of_type(Opcode::New, ty));
    }

    pub fn newarray_of(&mut self, element: &AsmType) {
        self.visit(TypeInsn::of_type(Opcode::Anewarray, element));
    }

    pub fn checkcast(&mut self, ty: &AsmType) {
        self.visit(TypeInsn::of_type(Opcode::Checkcast, ty));
    }

    /// Native type test against `ty`: pops a reference, pushes a boolean.
    pub fn instance_of(&mut self, ty: &AsmType) {
        self.visit(TypeInsn::of_type(Opcode::Instanceof, ty));
    }

    fn invoke(&mut self, opcode: Opcode, owner: &str, name: &str, desc: &str, itf: bool) {
        self.visit(MethodInsn::new(opcode, owner, name, desc, itf));
    }

    pub fn invokestatic(&mut self, owner: &str, name: &str, desc: &str, itf: bool) {
        self.invoke(Opcode::Invokestatic, owner, name, desc, itf);
    }

    pub fn invokevirtual(&mut self, owner: &str, name: &str, desc: &str) {
        self.invoke(Opcode::Invokevirtual, owner, name, desc, false);
    }

    pub fn invokespecial(&mut self, owner: &str, name: &str, desc: &str, itf: bool) {
        self.invoke(Opcode::Invokespecial, owner, name, desc, itf);
    }

    pub fn invokeinterface(&mut self, owner: &str, name: &str, desc: &str) {
        self.invoke(Opcode::Invokeinterface, owner, name, desc, true);
    }

    fn jump(&mut self, opcode: Opcode, label: LabelId) {
        self.visit(JumpInsn::new(opcode, label));
    }

    pub fn ifeq(&mut self, label: LabelId) {
        self.jump(Opcode::Ifeq, label);
    }

    pub fn ifne(&mut self, label: LabelId) {
        self.jump(Opcode::Ifne, label);
    }

    pub fn ifnull(&mut self, label: LabelId) {
        self.jump(Opcode::Ifnull, label);
    }

    pub fn ifnonnull(&mut self, label: LabelId) {
        self.jump(Opcode::Ifnonnull, label);
    }

    pub fn goto(&mut self, label: LabelId) {
        self.jump(Opcode::Goto, label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iconst_picks_shortest_encoding() {
        let mut buffer = InsnBuffer::new();
        let mut v = InstructionAdapter::new(&mut buffer);
        v.iconst(3);
        v.iconst(-100);
        v.iconst(1000);
        v.iconst(100_000);

        assert_eq!(
            buffer.into_insns(),
            vec![
                Insn::from(SimpleInsn::new(Opcode::Iconst3)),
                Insn::from(IntInsn::new(Opcode::Bipush, -100)),
                Insn::from(IntInsn::new(Opcode::Sipush, 1000)),
                Insn::from(LdcInsn::new(LdcConstant::Int(100_000))),
            ]
        );
    }

    #[test]
    fn load_and_return_follow_the_type() {
        let mut buffer = InsnBuffer::new();
        let mut v = InstructionAdapter::new(&mut buffer);
        v.load(2, &AsmType::Long);
        v.load(0, &AsmType::array_of(AsmType::Int));
        v.areturn(&AsmType::Boolean);
        v.areturn(&AsmType::Void);

        let opcodes: Vec<_> = buffer
            .insns
            .iter()
            .map(|insn| match insn {
                Insn::Var(var) => var.opcode,
                Insn::Simple(simple) => simple.opcode,
                other => panic!("unexpected instruction {:?}", other),
            })
            .collect();
        assert_eq!(
            opcodes,
            vec![Opcode::Lload, Opcode::Aload, Opcode::Ireturn, Opcode::Return]
        );
    }

    #[test]
    fn labels_are_unique_per_visitor() {
        let mut buffer = InsnBuffer::new();
        let mut v = InstructionAdapter::new(&mut buffer);
        let a = v.new_label();
        let b = v.new_label();
        assert_ne!(a, b);
    }
}
