//! Driver for the type test lowering.
//!
//! [`InstanceOfLowering`] pairs the intrinsic lowering with a [`TypeMapper`]
//! so callers only deal with source-level types, and adds the configurable
//! validation described by [`LoweringConfig`].
use std::collections::HashSet;

use jvinstr::{
    insn::{Insn, Instruction},
    list::{InsnList, InsnRef},
    visitor::{InstructionAdapter, MethodVisitor},
};
use log::{debug, info};

use crate::{
    config::LoweringConfig,
    error::{CodegenError, CodegenResult},
    intrinsics::instance_of::{instance_of, intrinsic_method_name, rewrite_instance_of},
    types::{KotlinType, TypeMapper},
};

/// Result of rewriting a single type test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewritten {
    /// Node standing at the position of the original type test.
    pub node: InsnRef,
    /// Predicate now called, `None` for a native check.
    pub intrinsic: Option<&'static str>,
}

/// Counters reported by [`InstanceOfLowering::rewrite_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoweringStats {
    pub substituted: usize,
    pub native: usize,
}

impl LoweringStats {
    pub fn total(&self) -> usize {
        self.substituted + self.native
    }

    fn record(&mut self, rewritten: &Rewritten) {
        match rewritten.intrinsic {
            Some(_) => self.substituted += 1,
            None => self.native += 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstanceOfLowering {
    config: LoweringConfig,
    mapper: TypeMapper,
}

impl InstanceOfLowering {
    pub fn new(config: LoweringConfig) -> Self {
        Self {
            config,
            mapper: TypeMapper::new(),
        }
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }

    /// Emit a type test against `ty` on `v`. Returns the predicate called, if any.
    pub fn emit<V: MethodVisitor + ?Sized>(
        &self,
        v: &mut InstructionAdapter<'_, V>,
        ty: &KotlinType,
    ) -> Option<&'static str> {
        let boxed = self.mapper.map_boxed(ty);
        instance_of(v, ty, &boxed);
        intrinsic_method_name(ty)
    }

    /// Rewrite the `instanceof` node `node` of `list` to test against `ty`.
    ///
    /// When membership checks are enabled, a node that is missing from
    /// `list` or is not a type test is reported before `list` is touched.
    /// The stack effect verification runs after the splice.
    pub fn rewrite(
        &self,
        list: &mut InsnList,
        node: InsnRef,
        ty: &KotlinType,
    ) -> CodegenResult<Rewritten> {
        if self.config.checks_membership() {
            Self::check_type_test(list, node)?;
        }
        self.splice(list, node, ty)
    }

    fn splice(
        &self,
        list: &mut InsnList,
        node: InsnRef,
        ty: &KotlinType,
    ) -> CodegenResult<Rewritten> {
        let original = if self.config.verify_stack_effect {
            list.get(node).cloned()
        } else {
            None
        };

        let asm_type = self.mapper.map_boxed(ty);
        let rewritten = Rewritten {
            node: rewrite_instance_of(node, list, ty, &asm_type)?,
            intrinsic: intrinsic_method_name(ty),
        };

        if let Some(original) = original {
            let replacement = list
                .get(rewritten.node)
                .ok_or(CodegenError::NodeNotInList {
                    node: rewritten.node,
                })?;
            Self::verify_stack_effect(&original, replacement)?;
        }

        Ok(rewritten)
    }

    /// Rewrite every recorded type test site of `list`.
    ///
    /// Sites are independent: rewriting one never invalidates the reference
    /// to another, since only the rewritten node may be replaced. When
    /// membership checks are enabled, every site is validated before the
    /// first one is rewritten, so an invalid batch leaves `list` untouched.
    pub fn rewrite_all(
        &self,
        list: &mut InsnList,
        pending: &[(InsnRef, KotlinType)],
    ) -> CodegenResult<LoweringStats> {
        if self.config.checks_membership() {
            let mut seen = HashSet::with_capacity(pending.len());
            for (node, _) in pending {
                Self::check_type_test(list, *node)?;
                if !seen.insert(*node) {
                    return Err(CodegenError::DuplicateSite { node: *node });
                }
            }
        }

        let mut stats = LoweringStats::default();
        for (node, ty) in pending {
            let rewritten = self.splice(list, *node, ty)?;
            stats.record(&rewritten);
        }
        info!(
            "Lowered {} type test(s): {} intrinsic call(s), {} native check(s)",
            stats.total(),
            stats.substituted,
            stats.native
        );
        Ok(stats)
    }

    fn check_type_test(list: &InsnList, node: InsnRef) -> CodegenResult<()> {
        match list.get(node) {
            None => Err(CodegenError::NodeNotInList { node }),
            Some(insn) if !insn.is_instance_of() => Err(CodegenError::NotATypeTest {
                node,
                found: insn.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn verify_stack_effect(original: &Insn, replacement: &Insn) -> CodegenResult<()> {
        if original.stack_effect()? != replacement.stack_effect()? {
            return Err(CodegenError::StackEffectMismatch {
                original: original.to_string(),
                replacement: replacement.to_string(),
            });
        }
        debug!("Verified stack effect of `{}`", replacement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jvinstr::{
        insn::{SimpleInsn, TypeInsn, VarInsn},
        opcodes::Opcode,
    };

    use super::*;
    use crate::config::MembershipCheck;

    fn strict() -> InstanceOfLowering {
        InstanceOfLowering::new(LoweringConfig {
            membership_check: MembershipCheck::Always,
            verify_stack_effect: true,
        })
    }

    #[test]
    fn rejects_foreign_nodes() {
        let mut other = InsnList::new();
        let foreign = other.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/List").into());

        let mut list = InsnList::new();
        list.push_back(VarInsn::new(Opcode::Aload, 0).into());

        let err = strict()
            .rewrite(&mut list, foreign, &KotlinType::class("kotlin.MutableList"))
            .unwrap_err();
        assert!(matches!(err, CodegenError::NodeNotInList { node } if node == foreign));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn rejects_non_type_tests() {
        let mut list = InsnList::new();
        let cast = list.push_back(TypeInsn::new(Opcode::Checkcast, "java/util/List").into());

        let err = strict()
            .rewrite(&mut list, cast, &KotlinType::class("kotlin.MutableList"))
            .unwrap_err();
        match err {
            CodegenError::NotATypeTest { node, found } => {
                assert_eq!(node, cast);
                assert_eq!(found, "checkcast java/util/List");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(list.contains(cast));
    }

    #[test]
    fn invalid_batches_leave_the_list_untouched() {
        let mut list = InsnList::new();
        list.push_back(VarInsn::new(Opcode::Aload, 0).into());
        let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/List").into());
        let cast = list.push_back(TypeInsn::new(Opcode::Checkcast, "java/util/List").into());
        let before = list.to_vec();

        let pending = [
            (check, KotlinType::class("kotlin.MutableList")),
            (cast, KotlinType::class("kotlin.MutableList")),
        ];
        let err = strict().rewrite_all(&mut list, &pending).unwrap_err();
        assert!(matches!(err, CodegenError::NotATypeTest { node, .. } if node == cast));
        assert_eq!(list.to_vec(), before);
        assert!(list.contains(check));

        let repeated = [
            (check, KotlinType::class("kotlin.MutableList")),
            (check, KotlinType::class("kotlin.MutableList")),
        ];
        let err = strict().rewrite_all(&mut list, &repeated).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateSite { node } if node == check));
        assert_eq!(list.to_vec(), before);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not an instanceof")]
    fn disabled_checks_still_assert_in_debug_builds() {
        let lowering = InstanceOfLowering::new(LoweringConfig {
            membership_check: MembershipCheck::Never,
            verify_stack_effect: false,
        });
        let mut list = InsnList::new();
        let cast = list.push_back(TypeInsn::new(Opcode::Checkcast, "java/util/Set").into());
        let _ = lowering.rewrite(&mut list, cast, &KotlinType::class("kotlin.MutableSet"));
    }

    #[test]
    fn counts_substituted_and_native_sites() {
        let mut list = InsnList::new();
        let mut pending = Vec::new();
        for ty in ["kotlin.MutableMap", "kotlin.Map", "kotlin.MutableSet"] {
            list.push_back(VarInsn::new(Opcode::Aload, 1).into());
            let node = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/lang/Object").into());
            list.push_back(SimpleInsn::new(Opcode::Pop).into());
            pending.push((node, KotlinType::class(ty)));
        }

        let stats = strict().rewrite_all(&mut list, &pending).unwrap();
        assert_eq!(stats, LoweringStats { substituted: 2, native: 1 });
        assert_eq!(list.len(), 9);
        assert_eq!(
            list.get(pending[1].0),
            Some(&Insn::from(TypeInsn::new(Opcode::Instanceof, "java/util/Map")))
        );
    }
}
