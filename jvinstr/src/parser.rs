//! Parser for textual instruction listings.
//!
//! The accepted format is the one produced by the [`std::fmt::Display`]
//! implementation of [`InsnList`]:
//!
//! ```text
//!     aload 1
//!     instanceof java/util/List          ; comments run to end of line
//!     ifeq L0
//!     invokestatic kotlin/jvm/internal/Intrinsics.isMutableList (Ljava/lang/Object;)Z
//! L0:
//!     ireturn
//! ```
//!
//! Labels may use any identifier. Names of the form `L<n>` keep the number
//! `n` as their [`LabelId`]; other names receive fresh identifiers.
use std::collections::{BTreeMap, BTreeSet};

use chumsky::prelude::*;

use crate::{
    insn::{
        Insn, InsnKind, IntInsn, LabelId, LabelInsn, LdcConstant, LdcInsn, MethodInsn,
        SimpleInsn, TypeInsn, VarInsn, JumpInsn,
    },
    list::InsnList,
    opcodes::Opcode,
    types::{AsmType, MethodType},
};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// A parsed listing: the instructions and the label names used in the source.
#[derive(Debug, Clone)]
pub struct Listing {
    pub insns: InsnList,
    pub labels: BTreeMap<String, LabelId>,
}

impl Listing {
    /// Label bound to `name` in the source.
    pub fn label(&self, name: &str) -> Option<LabelId> {
        self.labels.get(name).copied()
    }
}

#[derive(Debug, Clone)]
enum Statement {
    Label(String),
    Jump(Opcode, String),
    Insn(Insn),
}

pub fn whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    any()
        .filter(|c: &char| *c == ' ' || *c == '\t')
        .repeated()
        .at_least(1)
        .ignored()
        .labelled("whitespace")
}

fn token<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
}

/// Mnemonic of an opcode encoded with the `kind` instruction form.
pub fn mnemonic_parser<'src>(
    kind: InsnKind,
) -> impl Parser<'src, &'src str, Opcode, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
        .try_map(move |s: &str, span| match Opcode::from_mnemonic(s) {
            Some(opcode) if opcode.kind() == kind => Ok(opcode),
            Some(opcode) => Err(Rich::custom(
                span,
                format!(
                    "`{}` is a {} instruction, expected a {} instruction",
                    opcode,
                    opcode.kind(),
                    kind
                ),
            )),
            None => Err(Rich::custom(span, format!("unknown opcode `{}`", s))),
        })
        .labelled("opcode")
}

pub fn int_parser<'src>() -> impl Parser<'src, &'src str, i32, Extra<'src>> + Clone {
    just('-')
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<i32>()
                .map_err(|e| Rich::custom(span, format!("invalid integer `{}`: {}", s, e)))
        })
        .labelled("integer")
}

pub fn string_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escape = just('\\').ignore_then(choice((
        just('"'),
        just('\\'),
        just('n').to('\n'),
        just('t').to('\t'),
    )));

    none_of("\\\"")
        .or(escape)
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .labelled("string literal")
}

/// Internal name or array descriptor, as carried by type instructions.
pub fn type_operand_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    token()
        .try_map(|s: &str, span| {
            if s.starts_with('[') {
                AsmType::from_descriptor(s)
                    .map(|ty| ty.internal_name())
                    .map_err(|e| Rich::custom(span, e.to_string()))
            } else if s.contains(['.', ';', '(', ')']) {
                Err(Rich::custom(span, format!("invalid internal name `{}`", s)))
            } else {
                Ok(s.to_string())
            }
        })
        .labelled("type operand")
}

fn statement_parser<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> {
    let label_def = text::ascii::ident()
        .then_ignore(just(':'))
        .map(|name: &str| Statement::Label(name.to_string()))
        .labelled("label");

    let simple = mnemonic_parser(InsnKind::Simple)
        .map(|opcode| Statement::Insn(SimpleInsn::new(opcode).into()));

    let int = mnemonic_parser(InsnKind::Int)
        .then_ignore(whitespace())
        .then(int_parser())
        .map(|(opcode, operand)| Statement::Insn(IntInsn::new(opcode, operand).into()));

    let var = mnemonic_parser(InsnKind::Var)
        .then_ignore(whitespace())
        .then(text::int(10).try_map(|s: &str, span| {
            s.parse::<u16>()
                .map_err(|e| Rich::custom(span, format!("invalid local index `{}`: {}", s, e)))
        }))
        .map(|(opcode, var)| Statement::Insn(VarInsn::new(opcode, var).into()));

    let type_ = mnemonic_parser(InsnKind::Type)
        .then_ignore(whitespace())
        .then(type_operand_parser())
        .map(|(opcode, desc)| Statement::Insn(TypeInsn::new(opcode, desc).into()));

    let owner = any()
        .filter(|c: &char| !c.is_whitespace() && *c != '.')
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("method owner");
    let name = any()
        .filter(|c: &char| !c.is_whitespace() && *c != '(')
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("method name");
    let desc = token()
        .try_map(|s: &str, span| {
            MethodType::parse(s)
                .map(|_| s.to_string())
                .map_err(|e| Rich::custom(span, e.to_string()))
        })
        .labelled("method descriptor");
    let method = mnemonic_parser(InsnKind::Method)
        .then_ignore(whitespace())
        .then(owner)
        .then_ignore(just('.'))
        .then(name)
        .then_ignore(whitespace())
        .then(desc)
        .then(whitespace().ignore_then(just("itf")).or_not())
        .map(|((((opcode, owner), name), desc), itf)| {
            Statement::Insn(MethodInsn::new(opcode, owner, name, desc, itf.is_some()).into())
        });

    let jump = mnemonic_parser(InsnKind::Jump)
        .then_ignore(whitespace())
        .then(text::ascii::ident())
        .map(|(opcode, label): (Opcode, &str)| Statement::Jump(opcode, label.to_string()));

    let ldc_value = choice((
        string_parser().map(LdcConstant::String),
        int_parser().map(LdcConstant::Int),
        token().try_map(|s: &str, span| {
            AsmType::from_descriptor(s)
                .map(LdcConstant::Type)
                .map_err(|e| Rich::custom(span, e.to_string()))
        }),
    ))
    .labelled("constant");
    let ldc = mnemonic_parser(InsnKind::Ldc)
        .then_ignore(whitespace())
        .ignore_then(ldc_value)
        .map(|value| Statement::Insn(LdcInsn::new(value).into()));

    choice((label_def, int, var, type_, method, jump, ldc, simple)).labelled("instruction")
}

fn listing_parser<'src>() -> impl Parser<'src, &'src str, Vec<Statement>, Extra<'src>> {
    let comment = just(';').then(none_of("\n").repeated()).ignored();

    choice((comment.to(None), statement_parser().map(Some)))
        .padded()
        .repeated()
        .collect::<Vec<_>>()
        .map(|items| items.into_iter().flatten().collect())
        .then_ignore(end())
}

/// `L<n>` with a canonical decimal `n`.
fn numbered_label(name: &str) -> Option<LabelId> {
    let id: u32 = name.strip_prefix('L')?.parse().ok()?;
    (format!("L{}", id) == name).then_some(LabelId(id))
}

fn assemble(statements: Vec<Statement>) -> Result<Listing, Vec<String>> {
    let names = statements.iter().filter_map(|statement| match statement {
        Statement::Label(name) | Statement::Jump(_, name) => Some(name),
        Statement::Insn(_) => None,
    });

    let mut labels = BTreeMap::new();
    for name in names.clone() {
        if let Some(label) = numbered_label(name) {
            labels.insert(name.clone(), label);
        }
    }
    let mut next = labels.values().map(|label| label.0 + 1).max().unwrap_or(0);
    for name in names {
        if !labels.contains_key(name) {
            labels.insert(name.clone(), LabelId(next));
            next += 1;
        }
    }

    let mut errors = Vec::new();
    let mut placed = BTreeSet::new();
    let mut insns = InsnList::new();
    for statement in statements {
        match statement {
            Statement::Label(name) => {
                if !placed.insert(name.clone()) {
                    errors.push(format!("label `{}` is placed more than once", name));
                }
                insns.push_back(LabelInsn { label: labels[&name] }.into());
            }
            Statement::Jump(opcode, name) => {
                insns.push_back(JumpInsn::new(opcode, labels[&name]).into());
            }
            Statement::Insn(insn) => {
                insns.push_back(insn);
            }
        }
    }

    for name in labels.keys() {
        if !placed.contains(name) {
            errors.push(format!("jump to undefined label `{}`", name));
        }
    }

    if errors.is_empty() {
        Ok(Listing { insns, labels })
    } else {
        Err(errors)
    }
}

/// Parse a textual listing into an [`InsnList`].
///
/// Returns `Err(Vec<String>)` with human-readable diagnostics on failure.
///
/// ```rust
/// # use jvinstr::parser::parse_insn_list;
/// let listing = parse_insn_list("aload 0\ninstanceof java/lang/String\nireturn").unwrap();
/// assert_eq!(listing.insns.len(), 3);
/// ```
pub fn parse_insn_list(src: &str) -> Result<Listing, Vec<String>> {
    let statements = listing_parser()
        .parse(src)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .map(|e| format!("parse error: {e}"))
                .collect::<Vec<_>>()
        })?;
    assemble(statements)
}
