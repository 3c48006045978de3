//! Operand-stack effects.
//!
//! Every instruction consumes and produces values on the operand stack. This
//! module describes those effects with [`StackEffect`] and replays them over a
//! straight-line instruction sequence with [`simulate`], which is how callers
//! check that two instruction sequences are interchangeable.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{insn::Instruction, utils::Error};

/// Computational kind of an operand stack value.
///
/// `boolean`, `byte`, `char` and `short` values are all `Int` once on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueKind {
    Int,
    Float,
    Long,
    Double,
    Reference,
}

impl ValueKind {
    /// Number of stack slots taken by a value of this kind.
    pub fn size(self) -> usize {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Reference => "reference",
        })
    }
}

/// Effect of one instruction on the operand stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackEffect {
    /// Pops values of the listed kinds (bottom-most first), then pushes values
    /// of the listed kinds (bottom-most first).
    Typed {
        pops: SmallVec<ValueKind, 4>,
        pushes: SmallVec<ValueKind, 2>,
    },
    /// `pop`: discards one single-slot value of any kind.
    Pop,
    /// `dup`: duplicates the single-slot value on top of the stack.
    Dup,
    /// `swap`: exchanges the two single-slot values on top of the stack.
    Swap,
}

impl StackEffect {
    /// No effect at all.
    pub fn none() -> Self {
        Self::typed([], [])
    }

    pub fn typed(
        pops: impl IntoIterator<Item = ValueKind>,
        pushes: impl IntoIterator<Item = ValueKind>,
    ) -> Self {
        StackEffect::Typed {
            pops: pops.into_iter().collect(),
            pushes: pushes.into_iter().collect(),
        }
    }

    /// Net change in number of values (not slots).
    pub fn net_values(&self) -> isize {
        match self {
            StackEffect::Typed { pops, pushes } => pushes.len() as isize - pops.len() as isize,
            StackEffect::Pop => -1,
            StackEffect::Dup => 1,
            StackEffect::Swap => 0,
        }
    }

    /// Apply this effect to `stack`. `index` identifies the instruction in
    /// error reports.
    pub fn apply(&self, stack: &mut Vec<ValueKind>, index: usize) -> Result<(), Error> {
        let require = |stack: &Vec<ValueKind>, needed: usize| {
            if stack.len() < needed {
                Err(Error::StackUnderflow {
                    index,
                    needed,
                    available: stack.len(),
                })
            } else {
                Ok(())
            }
        };
        let single_slot = |kind: ValueKind| {
            if kind.size() == 1 {
                Ok(())
            } else {
                Err(Error::StackKindMismatch {
                    index,
                    expected: ValueKind::Int,
                    found: kind,
                })
            }
        };

        match self {
            StackEffect::Typed { pops, pushes } => {
                require(stack, pops.len())?;
                let base = stack.len() - pops.len();
                for (expected, found) in pops.iter().zip(&stack[base..]) {
                    if expected != found {
                        return Err(Error::StackKindMismatch {
                            index,
                            expected: *expected,
                            found: *found,
                        });
                    }
                }
                stack.truncate(base);
                stack.extend(pushes.iter().copied());
            }
            StackEffect::Pop => {
                require(stack, 1)?;
                if let Some(top) = stack.pop() {
                    single_slot(top)?;
                }
            }
            StackEffect::Dup => {
                require(stack, 1)?;
                let top = stack[stack.len() - 1];
                single_slot(top)?;
                stack.push(top);
            }
            StackEffect::Swap => {
                require(stack, 2)?;
                let len = stack.len();
                single_slot(stack[len - 1])?;
                single_slot(stack[len - 2])?;
                stack.swap(len - 1, len - 2);
            }
        }

        Ok(())
    }
}

/// Replay `insns` over `initial` and return the final operand stack.
///
/// The sequence is treated as straight-line code: jumps only contribute their
/// own operand pops, labels are ignored.
///
/// ```rust
/// # use jvinstr::{analysis::{simulate, ValueKind}, insn::{Insn, TypeInsn}, opcodes::Opcode};
/// let check = Insn::from(TypeInsn::new(Opcode::Instanceof, "java/util/List"));
/// let out = simulate([ValueKind::Reference], [&check]).unwrap();
/// assert_eq!(out, vec![ValueKind::Int]);
/// ```
pub fn simulate<'a, I, T>(
    initial: impl IntoIterator<Item = ValueKind>,
    insns: I,
) -> Result<Vec<ValueKind>, Error>
where
    I: IntoIterator<Item = &'a T>,
    T: Instruction + 'a,
{
    let mut stack: Vec<ValueKind> = initial.into_iter().collect();
    for (index, insn) in insns.into_iter().enumerate() {
        insn.stack_effect()?.apply(&mut stack, index)?;
    }
    Ok(stack)
}

/// Highest operand stack depth, in slots, reached while replaying `insns`
/// from an empty stack.
pub fn max_stack<'a, I, T>(insns: I) -> Result<usize, Error>
where
    I: IntoIterator<Item = &'a T>,
    T: Instruction + 'a,
{
    let mut stack = Vec::new();
    let mut depth = 0;
    for (index, insn) in insns.into_iter().enumerate() {
        insn.stack_effect()?.apply(&mut stack, index)?;
        depth = depth.max(stack.iter().map(|kind| kind.size()).sum());
    }
    Ok(depth)
}
