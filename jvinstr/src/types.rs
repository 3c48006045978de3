//! Runtime type descriptors.
//!
//! [`AsmType`] is the erased runtime shape of a value as the virtual machine
//! sees it: one of the eight primitive sorts, `void`, an array, or an object
//! identified by its internal name (`java/lang/String`). [`MethodType`]
//! describes a method signature such as `(Ljava/lang/Object;)Z`.
//!
//! Both types can be decoded from and rendered back to their descriptor form.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{analysis::ValueKind, utils::Error};

/// A runtime (erased) type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AsmType {
    Void,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Float,
    Long,
    Double,
    /// Array of the given element type.
    Array(Box<AsmType>),
    /// Object type, identified by its internal name (eg., `java/util/List`).
    Object(String),
}

impl AsmType {
    /// Object type for the given internal name.
    pub fn object(internal_name: impl Into<String>) -> Self {
        AsmType::Object(internal_name.into())
    }

    /// Array type whose elements are `element`.
    pub fn array_of(element: AsmType) -> Self {
        AsmType::Array(Box::new(element))
    }

    /// `java/lang/Object`
    pub fn java_object() -> Self {
        AsmType::object("java/lang/Object")
    }

    /// Decode a complete field descriptor (eg., `I`, `[J`, `Ljava/lang/String;`).
    ///
    /// ```rust
    /// # use jvinstr::types::AsmType;
    /// let ty = AsmType::from_descriptor("[Ljava/lang/String;").unwrap();
    /// assert_eq!(ty, AsmType::array_of(AsmType::object("java/lang/String")));
    /// assert!(AsmType::from_descriptor("Ljava/lang/String").is_err());
    /// ```
    pub fn from_descriptor(descriptor: &str) -> Result<Self, Error> {
        let (ty, rest) = Self::parse_prefix(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(Error::InvalidDescriptor {
                descriptor: descriptor.to_string(),
                reason: "trailing characters after type",
            });
        }
        Ok(ty)
    }

    /// Decode one type at the start of `input`, returning the remaining input.
    fn parse_prefix<'a>(input: &'a str, whole: &str) -> Result<(Self, &'a str), Error> {
        let invalid = |reason| Error::InvalidDescriptor {
            descriptor: whole.to_string(),
            reason,
        };

        let mut chars = input.chars();
        let head = chars.next().ok_or_else(|| invalid("unexpected end of descriptor"))?;
        let rest = chars.as_str();

        let ty = match head {
            'V' => AsmType::Void,
            'Z' => AsmType::Boolean,
            'C' => AsmType::Char,
            'B' => AsmType::Byte,
            'S' => AsmType::Short,
            'I' => AsmType::Int,
            'F' => AsmType::Float,
            'J' => AsmType::Long,
            'D' => AsmType::Double,
            '[' => {
                let (element, rest) = Self::parse_prefix(rest, whole)?;
                if element.is_void() {
                    return Err(invalid("array of void"));
                }
                return Ok((AsmType::array_of(element), rest));
            }
            'L' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| invalid("unterminated object type"))?;
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(invalid("empty class name"));
                }
                if name.contains(['.', '[', '(', ')']) {
                    return Err(invalid("illegal character in class name"));
                }
                return Ok((AsmType::object(name), &rest[end + 1..]));
            }
            _ => return Err(invalid("unknown type tag")),
        };

        Ok((ty, rest))
    }

    /// Field descriptor of this type.
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            AsmType::Void => out.push('V'),
            AsmType::Boolean => out.push('Z'),
            AsmType::Char => out.push('C'),
            AsmType::Byte => out.push('B'),
            AsmType::Short => out.push('S'),
            AsmType::Int => out.push('I'),
            AsmType::Float => out.push('F'),
            AsmType::Long => out.push('J'),
            AsmType::Double => out.push('D'),
            AsmType::Array(element) => {
                out.push('[');
                element.write_descriptor(out);
            }
            AsmType::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
        }
    }

    /// Internal name of this type, as used by type instructions (`checkcast`,
    /// `instanceof`, `anewarray`, ...).
    ///
    /// Object types yield their class name, every other type yields its
    /// descriptor (which is how arrays are named in type instructions).
    pub fn internal_name(&self) -> String {
        match self {
            AsmType::Object(name) => name.clone(),
            other => other.descriptor(),
        }
    }

    /// Binary class name using dots (eg., `java.lang.String`).
    pub fn class_name(&self) -> String {
        match self {
            AsmType::Object(name) => name.replace('/', "."),
            AsmType::Array(element) => format!("{}[]", element.class_name()),
            AsmType::Void => "void".into(),
            AsmType::Boolean => "boolean".into(),
            AsmType::Char => "char".into(),
            AsmType::Byte => "byte".into(),
            AsmType::Short => "short".into(),
            AsmType::Int => "int".into(),
            AsmType::Float => "float".into(),
            AsmType::Long => "long".into(),
            AsmType::Double => "double".into(),
        }
    }

    /// Whether values of this type are references (objects or arrays).
    pub fn is_reference(&self) -> bool {
        matches!(self, AsmType::Object(_) | AsmType::Array(_))
    }

    /// Whether this is one of the eight primitive sorts.
    pub fn is_primitive(&self) -> bool {
        !self.is_reference() && !self.is_void()
    }

    /// Number of operand stack slots taken by a value of this type.
    pub fn size(&self) -> usize {
        match self {
            AsmType::Void => 0,
            AsmType::Long | AsmType::Double => 2,
            _ => 1,
        }
    }

    /// Computational kind of this type on the operand stack, `None` for `void`.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            AsmType::Void => None,
            AsmType::Boolean | AsmType::Char | AsmType::Byte | AsmType::Short | AsmType::Int => {
                Some(ValueKind::Int)
            }
            AsmType::Float => Some(ValueKind::Float),
            AsmType::Long => Some(ValueKind::Long),
            AsmType::Double => Some(ValueKind::Double),
            AsmType::Array(_) | AsmType::Object(_) => Some(ValueKind::Reference),
        }
    }
}

impl std::fmt::Display for AsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.class_name())
        } else {
            write!(f, "{}", self.descriptor())
        }
    }
}

/// A method signature: argument types and return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MethodType {
    pub args: Vec<AsmType>,
    pub ret: AsmType,
}

impl MethodType {
    pub fn new(args: impl IntoIterator<Item = AsmType>, ret: AsmType) -> Self {
        Self {
            args: args.into_iter().collect(),
            ret,
        }
    }

    /// Decode a method descriptor (eg., `(Ljava/lang/Object;)Z`).
    ///
    /// ```rust
    /// # use jvinstr::types::{AsmType, MethodType};
    /// let m = MethodType::parse("(IJ)V").unwrap();
    /// assert_eq!(m.args, vec![AsmType::Int, AsmType::Long]);
    /// assert_eq!(m.ret, AsmType::Void);
    /// ```
    pub fn parse(descriptor: &str) -> Result<Self, Error> {
        let invalid = |reason| Error::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason,
        };

        let mut rest = descriptor
            .strip_prefix('(')
            .ok_or_else(|| invalid("method descriptor must start with `(`"))?;

        let mut args = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (arg, after) = AsmType::parse_prefix(rest, descriptor)?;
            if arg.is_void() {
                return Err(invalid("void argument"));
            }
            args.push(arg);
            rest = after;
        }

        let (ret, rest) = AsmType::parse_prefix(rest, descriptor)?;
        if !rest.is_empty() {
            return Err(invalid("trailing characters after return type"));
        }

        Ok(Self { args, ret })
    }

    /// Render this signature back to its descriptor form.
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for arg in &self.args {
            arg.write_descriptor(&mut out);
        }
        out.push(')');
        self.ret.write_descriptor(&mut out);
        out
    }
}

impl std::fmt::Display for MethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}
