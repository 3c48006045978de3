//! Source-level types.
//!
//! This is the narrow view of the front-end type system the backend relies
//! on. A [`KotlinType`] is either a class type, a type parameter, or an error
//! type left over by resolution. Lowerings only ever ask a type for its
//! canonical class identity, through the [`TypeDescriptor`] projection, and
//! for its erased runtime form, through [`TypeMapper`].
use smallvec::SmallVec;
use strum::{EnumIs, EnumTryAs};

mod mapper;

pub use mapper::TypeMapper;

/// Fully-qualified name of a class, with `.` separating both package segments
/// and nested class names (eg., `kotlin.MutableMap.MutableEntry`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FqName(String);

impl FqName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment (eg., `MutableEntry`).
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Name without its last segment, `None` for single-segment names.
    pub fn parent(&self) -> Option<FqName> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| FqName::new(parent))
    }
}

impl std::fmt::Display for FqName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FqName {
    fn from(value: &str) -> Self {
        FqName::new(value)
    }
}

/// Type of a value whose classifier is a class, interface or object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    /// Package, dot separated, empty for the root package.
    pub package: String,
    /// Class name followed by the names of nested classes, outermost first.
    pub names: SmallVec<String, 2>,
    pub arguments: Vec<KotlinType>,
    pub nullable: bool,
}

impl ClassType {
    pub fn new(package: impl Into<String>, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            package: package.into(),
            names: names.into_iter().map(Into::into).collect(),
            arguments: Vec::new(),
            nullable: false,
        }
    }

    /// Split a fully-qualified name into package and class path, treating
    /// segments that start with an uppercase letter as class names
    /// (eg., `kotlin.MutableMap.MutableEntry` is class `MutableMap.MutableEntry`
    /// in package `kotlin`).
    pub fn from_fq_name(fq_name: &str) -> Self {
        let segments: Vec<&str> = fq_name.split('.').collect();
        let split = segments
            .iter()
            .position(|segment| segment.starts_with(|c: char| c.is_uppercase()))
            .unwrap_or(segments.len().saturating_sub(1));
        Self::new(segments[..split].join("."), segments[split..].iter().copied())
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = KotlinType>) -> Self {
        self.arguments = arguments.into_iter().collect();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn fq_name(&self) -> FqName {
        let class_path = self.names.join(".");
        if self.package.is_empty() {
            FqName::new(class_path)
        } else {
            FqName::new(format!("{}.{}", self.package, class_path))
        }
    }
}

/// Reference to a type parameter (eg., `T` in `fun <T : Any> f(x: T)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub upper_bound: Option<Box<KotlinType>>,
    pub reified: bool,
    pub nullable: bool,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upper_bound: None,
            reified: false,
            nullable: false,
        }
    }

    pub fn bounded_by(mut self, bound: KotlinType) -> Self {
        self.upper_bound = Some(Box::new(bound));
        self
    }

    pub fn reified(mut self) -> Self {
        self.reified = true;
        self
    }
}

/// A resolved source-level type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum KotlinType {
    Class(ClassType),
    TypeParameter(TypeParameter),
    /// Type that failed to resolve; carries a diagnostic description.
    Error(String),
}

impl KotlinType {
    /// Non-null class type for a fully-qualified name, see [`ClassType::from_fq_name`].
    pub fn class(fq_name: &str) -> Self {
        KotlinType::Class(ClassType::from_fq_name(fq_name))
    }

    pub fn type_parameter(name: impl Into<String>) -> Self {
        KotlinType::TypeParameter(TypeParameter::new(name))
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            KotlinType::Class(class) => class.nullable,
            KotlinType::TypeParameter(param) => param.nullable,
            KotlinType::Error(_) => false,
        }
    }

    /// Same type, marked nullable.
    pub fn make_nullable(self) -> Self {
        match self {
            KotlinType::Class(class) => KotlinType::Class(class.nullable(true)),
            KotlinType::TypeParameter(mut param) => {
                param.nullable = true;
                KotlinType::TypeParameter(param)
            }
            error @ KotlinType::Error(_) => error,
        }
    }
}

impl From<ClassType> for KotlinType {
    fn from(value: ClassType) -> Self {
        KotlinType::Class(value)
    }
}

impl From<TypeParameter> for KotlinType {
    fn from(value: TypeParameter) -> Self {
        KotlinType::TypeParameter(value)
    }
}

/// Projection of a type onto its canonical class identity.
pub trait TypeDescriptor {
    /// Fully-qualified name of the class backing this type, `None` when the
    /// type has no class identity (type parameters, unresolved types).
    fn class_fq_name(&self) -> Option<FqName>;
}

impl TypeDescriptor for ClassType {
    fn class_fq_name(&self) -> Option<FqName> {
        Some(self.fq_name())
    }
}

impl TypeDescriptor for KotlinType {
    fn class_fq_name(&self) -> Option<FqName> {
        match self {
            KotlinType::Class(class) => class.class_fq_name(),
            KotlinType::TypeParameter(_) | KotlinType::Error(_) => None,
        }
    }
}

impl<T: TypeDescriptor + ?Sized> TypeDescriptor for &T {
    fn class_fq_name(&self) -> Option<FqName> {
        (**self).class_fq_name()
    }
}
