use jvinstr::types::AsmType;
use log::trace;
use phf::phf_map;

use crate::types::{ClassType, KotlinType};

/// Builtin classes that map onto platform classes. Read-only collection
/// types and their mutable views share one runtime class.
static BUILTIN_CLASSES: phf::Map<&'static str, &'static str> = phf_map! {
    "kotlin.Any" => "java/lang/Object",
    "kotlin.Nothing" => "java/lang/Void",
    "kotlin.String" => "java/lang/String",
    "kotlin.CharSequence" => "java/lang/CharSequence",
    "kotlin.Throwable" => "java/lang/Throwable",
    "kotlin.Comparable" => "java/lang/Comparable",
    "kotlin.Number" => "java/lang/Number",
    "kotlin.Enum" => "java/lang/Enum",
    "kotlin.Annotation" => "java/lang/annotation/Annotation",
    "kotlin.Cloneable" => "java/lang/Cloneable",
    "kotlin.Boolean" => "java/lang/Boolean",
    "kotlin.Char" => "java/lang/Character",
    "kotlin.Byte" => "java/lang/Byte",
    "kotlin.Short" => "java/lang/Short",
    "kotlin.Int" => "java/lang/Integer",
    "kotlin.Long" => "java/lang/Long",
    "kotlin.Float" => "java/lang/Float",
    "kotlin.Double" => "java/lang/Double",
    "kotlin.Iterator" => "java/util/Iterator",
    "kotlin.MutableIterator" => "java/util/Iterator",
    "kotlin.Iterable" => "java/lang/Iterable",
    "kotlin.MutableIterable" => "java/lang/Iterable",
    "kotlin.Collection" => "java/util/Collection",
    "kotlin.MutableCollection" => "java/util/Collection",
    "kotlin.List" => "java/util/List",
    "kotlin.MutableList" => "java/util/List",
    "kotlin.ListIterator" => "java/util/ListIterator",
    "kotlin.MutableListIterator" => "java/util/ListIterator",
    "kotlin.Set" => "java/util/Set",
    "kotlin.MutableSet" => "java/util/Set",
    "kotlin.Map" => "java/util/Map",
    "kotlin.MutableMap" => "java/util/Map",
    "kotlin.Map.Entry" => "java/util/Map$Entry",
    "kotlin.MutableMap.MutableEntry" => "java/util/Map$Entry",
};

/// Classes represented by a primitive when not nullable.
static PRIMITIVES: phf::Map<&'static str, AsmType> = phf_map! {
    "kotlin.Boolean" => AsmType::Boolean,
    "kotlin.Char" => AsmType::Char,
    "kotlin.Byte" => AsmType::Byte,
    "kotlin.Short" => AsmType::Short,
    "kotlin.Int" => AsmType::Int,
    "kotlin.Long" => AsmType::Long,
    "kotlin.Float" => AsmType::Float,
    "kotlin.Double" => AsmType::Double,
};

/// Specialised primitive arrays.
static PRIMITIVE_ARRAYS: phf::Map<&'static str, AsmType> = phf_map! {
    "kotlin.BooleanArray" => AsmType::Boolean,
    "kotlin.CharArray" => AsmType::Char,
    "kotlin.ByteArray" => AsmType::Byte,
    "kotlin.ShortArray" => AsmType::Short,
    "kotlin.IntArray" => AsmType::Int,
    "kotlin.LongArray" => AsmType::Long,
    "kotlin.FloatArray" => AsmType::Float,
    "kotlin.DoubleArray" => AsmType::Double,
};

/// Maps source-level types to their erased runtime representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMapper;

impl TypeMapper {
    pub fn new() -> Self {
        Self
    }

    /// Runtime type of values of `ty`, using primitives where possible
    /// (non-null `kotlin.Int` is `I`).
    pub fn map(&self, ty: &KotlinType) -> AsmType {
        self.map_type(ty, false)
    }

    /// Runtime type of `ty` as a reference: primitives are replaced by their
    /// wrapper classes. This is the form type tests and casts operate on.
    ///
    /// ```rust
    /// # use jvcodegen::types::{KotlinType, TypeMapper};
    /// # use jvinstr::types::AsmType;
    /// let mapper = TypeMapper::new();
    /// let int = KotlinType::class("kotlin.Int");
    /// assert_eq!(mapper.map(&int), AsmType::Int);
    /// assert_eq!(mapper.map_boxed(&int), AsmType::object("java/lang/Integer"));
    /// ```
    pub fn map_boxed(&self, ty: &KotlinType) -> AsmType {
        self.map_type(ty, true)
    }

    fn map_type(&self, ty: &KotlinType, boxed: bool) -> AsmType {
        let mapped = match ty {
            KotlinType::Class(class) => self.map_class(class, boxed),
            KotlinType::TypeParameter(param) => match &param.upper_bound {
                Some(bound) => self.map_type(bound, true),
                None => AsmType::java_object(),
            },
            KotlinType::Error(_) => AsmType::java_object(),
        };
        trace!("Mapped {:?} to {}", ty, mapped);
        mapped
    }

    fn map_class(&self, class: &ClassType, boxed: bool) -> AsmType {
        let fq_name = class.fq_name();
        let fq_name = fq_name.as_str();

        if !boxed && !class.nullable {
            if let Some(primitive) = PRIMITIVES.get(fq_name) {
                return primitive.clone();
            }
        }

        if let Some(element) = PRIMITIVE_ARRAYS.get(fq_name) {
            return AsmType::array_of(element.clone());
        }

        if fq_name == "kotlin.Array" {
            let element = class
                .arguments
                .first()
                .map(|arg| self.map_type(arg, true))
                .unwrap_or_else(AsmType::java_object);
            return AsmType::array_of(element);
        }

        if let Some(internal_name) = BUILTIN_CLASSES.get(fq_name) {
            return AsmType::object(*internal_name);
        }

        AsmType::object(Self::internal_name(class))
    }

    /// `package/Outer$Inner` for a class declared in source.
    fn internal_name(class: &ClassType) -> String {
        let class_path = class.names.join("$");
        if class.package.is_empty() {
            class_path
        } else {
            format!("{}/{}", class.package.replace('.', "/"), class_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeParameter;

    #[test]
    fn mutable_views_share_the_runtime_class() {
        let mapper = TypeMapper::new();
        for (read_only, mutable) in [
            ("kotlin.List", "kotlin.MutableList"),
            ("kotlin.Map.Entry", "kotlin.MutableMap.MutableEntry"),
            ("kotlin.Iterable", "kotlin.MutableIterable"),
        ] {
            assert_eq!(
                mapper.map_boxed(&KotlinType::class(read_only)),
                mapper.map_boxed(&KotlinType::class(mutable))
            );
        }
        assert_eq!(
            mapper.map_boxed(&KotlinType::class("kotlin.MutableMap.MutableEntry")),
            AsmType::object("java/util/Map$Entry")
        );
    }

    #[test]
    fn nullable_primitives_are_boxed() {
        let mapper = TypeMapper::new();
        let nullable_int = KotlinType::class("kotlin.Int").make_nullable();
        assert_eq!(mapper.map(&nullable_int), AsmType::object("java/lang/Integer"));
    }

    #[test]
    fn arrays() {
        let mapper = TypeMapper::new();
        assert_eq!(
            mapper.map(&KotlinType::class("kotlin.IntArray")),
            AsmType::array_of(AsmType::Int)
        );
        let strings = ClassType::from_fq_name("kotlin.Array")
            .with_arguments([KotlinType::class("kotlin.String")]);
        assert_eq!(
            mapper.map(&strings.into()),
            AsmType::array_of(AsmType::object("java/lang/String"))
        );
        let ints = ClassType::from_fq_name("kotlin.Array")
            .with_arguments([KotlinType::class("kotlin.Int")]);
        assert_eq!(
            mapper.map(&ints.into()),
            AsmType::array_of(AsmType::object("java/lang/Integer"))
        );
    }

    #[test]
    fn user_classes_and_type_parameters() {
        let mapper = TypeMapper::new();
        assert_eq!(
            mapper.map(&KotlinType::class("com.example.Outer.Inner")),
            AsmType::object("com/example/Outer$Inner")
        );

        let bounded = TypeParameter::new("T").bounded_by(KotlinType::class("kotlin.CharSequence"));
        assert_eq!(
            mapper.map(&bounded.into()),
            AsmType::object("java/lang/CharSequence")
        );
        assert_eq!(
            mapper.map(&KotlinType::type_parameter("T")),
            AsmType::java_object()
        );
    }
}
