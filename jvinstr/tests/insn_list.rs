use jvinstr::{
    analysis::{ValueKind, max_stack, simulate},
    insn::{Insn, JumpInsn, SimpleInsn, TypeInsn, VarInsn},
    list::InsnList,
    opcodes::Opcode,
    types::AsmType,
    utils::Error,
    visitor::InstructionAdapter,
};

fn simple(opcode: Opcode) -> Insn {
    SimpleInsn::new(opcode).into()
}

#[test]
fn splicing_keeps_other_identities() {
    let mut list = InsnList::new();
    let load = list.push_back(VarInsn::new(Opcode::Aload, 0).into());
    let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/List").into());
    let ret = list.push_back(simple(Opcode::Ireturn));

    let nop = list.insert_before(check, simple(Opcode::Nop)).unwrap();
    assert_eq!(list.refs(), vec![load, nop, check, ret]);

    let removed = list.remove(check).unwrap();
    assert!(removed.is_instance_of());
    assert_eq!(list.refs(), vec![load, nop, ret]);
    assert_eq!(list.next(nop), Some(ret));
    assert_eq!(list.prev(ret), Some(nop));

    assert_eq!(list.remove(check), Err(Error::UnknownNode(check)));
    assert_eq!(
        list.insert_before(check, simple(Opcode::Nop)),
        Err(Error::UnknownNode(check))
    );
    assert_eq!(list.len(), 3);
}

#[test]
fn removing_the_ends_updates_first_and_last() {
    let mut list: InsnList = [Opcode::Iconst0, Opcode::Iconst1, Opcode::Iconst2]
        .into_iter()
        .map(simple)
        .collect();
    let refs = list.refs();

    list.remove(refs[0]).unwrap();
    list.remove(refs[2]).unwrap();
    assert_eq!(list.first(), Some(refs[1]));
    assert_eq!(list.last(), Some(refs[1]));

    list.remove(refs[1]).unwrap();
    assert!(list.is_empty());
    assert_eq!(list.first(), None);
    assert_eq!(list.last(), None);
}

#[test]
fn labels_survive_rewrites_of_the_following_node() {
    let mut list = InsnList::new();
    let target = {
        let mut adapter = InstructionAdapter::new(&mut list);
        let target = adapter.new_label();
        adapter.load(0, &AsmType::java_object());
        adapter.ifnull(target);
        adapter.mark(target);
        adapter.load(0, &AsmType::java_object());
        adapter.instance_of(&AsmType::object("java/util/Set"));
        adapter.areturn(&AsmType::Boolean);
        target
    };
    list.verify_labels().unwrap();

    let label = list.label_node(target).unwrap();
    let check = list
        .iter()
        .find(|(_, insn)| insn.is_instance_of())
        .map(|(node, _)| node)
        .unwrap();
    let call = list
        .insert_before(
            check,
            jvinstr::insn::MethodInsn::new(
                Opcode::Invokestatic,
                "kotlin/jvm/internal/Intrinsics",
                "isMutableSet",
                "(Ljava/lang/Object;)Z",
                false,
            )
            .into(),
        )
        .unwrap();
    list.remove(check).unwrap();

    list.verify_labels().unwrap();
    assert_eq!(list.label_node(target), Some(label));
    assert!(list.position(label).unwrap() < list.position(call).unwrap());
    assert_eq!(max_stack(&list.to_vec()).unwrap(), 1);
}

#[test]
fn dangling_jumps_are_reported() {
    let mut list = InsnList::new();
    let label = list.new_label();
    list.push_back(JumpInsn::new(Opcode::Goto, label).into());
    assert_eq!(list.verify_labels(), Err(Error::UnresolvedLabel(label)));

    list.push_back(jvinstr::insn::LabelInsn { label }.into());
    assert_eq!(list.verify_labels(), Ok(()));
    assert_ne!(list.new_label(), label);
}

#[test]
fn adapter_helpers_pick_typed_opcodes() {
    let mut list = InsnList::new();
    {
        let mut adapter = InstructionAdapter::new(&mut list);
        adapter.iconst(100);
        adapter.store(1, &AsmType::Int);
        adapter.load(2, &AsmType::Long);
        adapter.checkcast(&AsmType::array_of(AsmType::object("java/lang/String")));
    }
    let printed = list.to_string();
    assert_eq!(
        printed,
        "    bipush 100\n    istore 1\n    lload 2\n    checkcast [Ljava/lang/String;\n"
    );

    let after = simulate([ValueKind::Reference], &list.to_vec()[3..]).unwrap();
    assert_eq!(after, vec![ValueKind::Reference]);
}
