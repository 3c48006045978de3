//! Type tests against mutable collection types.
//!
//! `kotlin.MutableList` and `kotlin.List` both erase to `java/util/List`, so
//! a plain `instanceof` cannot tell a read-only view from a mutable one. Tests
//! against the mutable marker types are lowered to a call to the matching
//! predicate of [`INTRINSICS_CLASS`] instead, which has the same operand stack
//! effect (pops the tested reference, pushes a boolean).
//!
//! Both lowering contexts share [`intrinsic_method_name`]:
//!
//! - [`instance_of`] appends to a method body under construction;
//! - [`rewrite_instance_of`] patches an `instanceof` node already in an
//!   [`InsnList`].
use jvinstr::{
    insn::{Insn, InsnKind, MethodInsn},
    list::{InsnList, InsnRef},
    opcodes::Opcode,
    types::AsmType,
    utils::Error,
    visitor::{InstructionAdapter, MethodVisitor},
};
use log::{debug, trace};
use phf::phf_map;

use super::INTRINSICS_CLASS;
use crate::types::TypeDescriptor;

/// Descriptor shared by every predicate: one object argument, boolean result.
pub const INSTANCEOF_METHOD_SIGNATURE: &str = "(Ljava/lang/Object;)Z";

/// Marker types and the predicate checking each of them. The predicate names
/// are part of the binary interface with compiled code and must not change.
static INTRINSICS_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "kotlin.MutableIterator" => "isMutableIterator",
    "kotlin.MutableIterable" => "isMutableIterable",
    "kotlin.MutableCollection" => "isMutableCollection",
    "kotlin.MutableList" => "isMutableList",
    "kotlin.MutableListIterator" => "isMutableListIterator",
    "kotlin.MutableSet" => "isMutableSet",
    "kotlin.MutableMap" => "isMutableMap",
    "kotlin.MutableMap.MutableEntry" => "isMutableMapEntry",
};

/// Name of the predicate to call instead of `instanceof` for `ty`, or `None`
/// when a native check is correct.
///
/// ```rust
/// # use jvcodegen::{intrinsics::instance_of::intrinsic_method_name, types::KotlinType};
/// let ty = KotlinType::class("kotlin.MutableList");
/// assert_eq!(intrinsic_method_name(&ty), Some("isMutableList"));
/// assert_eq!(intrinsic_method_name(&KotlinType::class("kotlin.List")), None);
/// ```
pub fn intrinsic_method_name<T: TypeDescriptor + ?Sized>(ty: &T) -> Option<&'static str> {
    let fq_name = ty.class_fq_name()?;
    INTRINSICS_MAP.get(fq_name.as_str()).copied()
}

/// Every `(marker type, predicate)` pair, in no particular order.
pub fn marker_types() -> impl Iterator<Item = (&'static str, &'static str)> {
    INTRINSICS_MAP.entries().map(|(fq_name, method)| (*fq_name, *method))
}

fn predicate_call(method: &str) -> MethodInsn {
    MethodInsn::new(
        Opcode::Invokestatic,
        INTRINSICS_CLASS,
        method,
        INSTANCEOF_METHOD_SIGNATURE,
        false,
    )
}

/// Emit a type test of the reference on top of the stack against `ty`.
///
/// `boxed_asm_type` is the runtime (reference) form of `ty`, used when no
/// predicate applies.
pub fn instance_of<V, T>(v: &mut InstructionAdapter<'_, V>, ty: &T, boxed_asm_type: &AsmType)
where
    V: MethodVisitor + ?Sized,
    T: TypeDescriptor + ?Sized,
{
    match intrinsic_method_name(ty) {
        None => v.instance_of(boxed_asm_type),
        Some(method) => {
            debug!("Lowering type test against {} to {}.{}", boxed_asm_type, INTRINSICS_CLASS, method);
            v.invokestatic(INTRINSICS_CLASS, method, INSTANCEOF_METHOD_SIGNATURE, false);
        }
    }
}

/// Rewrite the `instanceof` node `node` of `list` so that it tests against
/// `ty`, whose runtime form is `asm_type`.
///
/// Without a predicate the node keeps its identity and only its operand
/// changes. Otherwise the predicate call is inserted before `node`, then
/// `node` is removed. Jumps target label nodes, never `node` itself, so every
/// branch into this position still lands on the replacement.
///
/// Returns the node now standing at the original position.
///
/// `node` must be an `instanceof` node of `list`; this is only asserted in
/// debug builds.
pub fn rewrite_instance_of<T: TypeDescriptor + ?Sized>(
    node: InsnRef,
    list: &mut InsnList,
    ty: &T,
    asm_type: &AsmType,
) -> Result<InsnRef, Error> {
    debug_assert!(list.contains(node), "node {:?} is not part of the list", node);
    debug_assert!(
        list.get(node).is_some_and(Insn::is_instance_of),
        "node {:?} is not an instanceof instruction",
        node
    );

    match intrinsic_method_name(ty) {
        None => {
            let found = list.get(node).map(Insn::kind).ok_or(Error::UnknownNode(node))?;
            let Some(Insn::Type(insn)) = list.get_mut(node) else {
                return Err(Error::UnexpectedInsn {
                    node,
                    expected: InsnKind::Type,
                    found,
                });
            };
            insn.desc = asm_type.internal_name();
            trace!("Retargeted type test {:?} to {}", node, insn.desc);
            Ok(node)
        }
        Some(method) => {
            let call = list.insert_before(node, predicate_call(method).into())?;
            list.remove(node)?;
            debug!(
                "Replaced type test {:?} against {} by {}.{} ({:?})",
                node, asm_type, INTRINSICS_CLASS, method, call
            );
            Ok(call)
        }
    }
}

#[cfg(test)]
mod tests {
    use jvinstr::{
        insn::{SimpleInsn, TypeInsn, VarInsn},
        visitor::InsnBuffer,
    };

    use super::*;
    use crate::types::{KotlinType, TypeParameter};

    #[test]
    fn table_has_eight_distinct_predicates() {
        let mut methods: Vec<_> = marker_types().map(|(_, method)| method).collect();
        methods.sort_unstable();
        methods.dedup();
        assert_eq!(methods.len(), 8);
        assert!(methods.iter().all(|method| method.starts_with("isMutable")));
    }

    #[test]
    fn lookup_ignores_nullability_and_arguments() {
        let ty = KotlinType::class("kotlin.MutableList").make_nullable();
        assert_eq!(intrinsic_method_name(&ty), Some("isMutableList"));
    }

    #[test]
    fn type_parameters_never_resolve() {
        let bounded = TypeParameter::new("T").bounded_by(KotlinType::class("kotlin.MutableList"));
        assert_eq!(intrinsic_method_name(&KotlinType::from(bounded)), None);
    }

    #[test]
    fn streaming_emits_a_single_instruction() {
        let mut buffer = InsnBuffer::new();
        let mut adapter = InstructionAdapter::new(&mut buffer);
        instance_of(
            &mut adapter,
            &KotlinType::class("kotlin.MutableSet"),
            &AsmType::object("java/util/Set"),
        );
        assert_eq!(
            buffer.into_insns(),
            vec![Insn::from(predicate_call("isMutableSet"))]
        );
    }

    #[test]
    fn native_rewrite_keeps_the_node() {
        let mut list = InsnList::new();
        list.push_back(VarInsn::new(Opcode::Aload, 0).into());
        let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/lang/Object").into());
        list.push_back(SimpleInsn::new(Opcode::Ireturn).into());

        let at = rewrite_instance_of(
            check,
            &mut list,
            &KotlinType::class("kotlin.CharSequence"),
            &AsmType::object("java/lang/CharSequence"),
        )
        .unwrap();

        assert_eq!(at, check);
        assert_eq!(list.len(), 3);
        assert_eq!(
            list.get(check),
            Some(&Insn::from(TypeInsn::new(
                Opcode::Instanceof,
                "java/lang/CharSequence"
            )))
        );
    }

    #[test]
    fn substituted_rewrite_replaces_the_node() {
        let mut list = InsnList::new();
        let load = list.push_back(VarInsn::new(Opcode::Aload, 0).into());
        let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/Iterator").into());

        let call = rewrite_instance_of(
            check,
            &mut list,
            &KotlinType::class("kotlin.MutableIterator"),
            &AsmType::object("java/util/Iterator"),
        )
        .unwrap();

        assert!(!list.contains(check));
        assert_eq!(list.refs(), vec![load, call]);
        assert_eq!(list.get(call), Some(&Insn::from(predicate_call("isMutableIterator"))));
    }

    fn marker_check_list() -> (InsnList, InsnRef) {
        let mut list = InsnList::new();
        list.push_back(VarInsn::new(Opcode::Aload, 0).into());
        let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/List").into());
        (list, check)
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not part of the list")]
    fn removed_node_panics_in_debug_builds() {
        let (mut list, check) = marker_check_list();
        list.remove(check).unwrap();
        let _ = rewrite_instance_of(
            check,
            &mut list,
            &KotlinType::class("kotlin.MutableList"),
            &AsmType::object("java/util/List"),
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not part of the list")]
    fn foreign_node_panics_in_debug_builds() {
        let (_, foreign) = marker_check_list();
        let (mut list, _) = marker_check_list();
        let _ = rewrite_instance_of(
            foreign,
            &mut list,
            &KotlinType::class("kotlin.MutableList"),
            &AsmType::object("java/util/List"),
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not an instanceof instruction")]
    fn cast_node_panics_in_debug_builds() {
        let mut list = InsnList::new();
        let cast = list.push_back(TypeInsn::new(Opcode::Checkcast, "java/util/List").into());
        let _ = rewrite_instance_of(
            cast,
            &mut list,
            &KotlinType::class("kotlin.MutableList"),
            &AsmType::object("java/util/List"),
        );
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn foreign_node_is_reported_in_release_builds() {
        let (_, foreign) = marker_check_list();
        let (mut list, _) = marker_check_list();
        let before = list.to_vec();
        let err = rewrite_instance_of(
            foreign,
            &mut list,
            &KotlinType::class("kotlin.MutableList"),
            &AsmType::object("java/util/List"),
        )
        .unwrap_err();
        assert_eq!(err, Error::UnknownNode(foreign));
        assert_eq!(list.to_vec(), before);
    }
}
