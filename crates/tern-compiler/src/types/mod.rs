//! Semantic types.
//!
//! ## Modules
//!
//! - [`conversion`]: the strong/weak conversion lattice
//! - [`registry`]: class and function storage, memory lengths, type names

pub mod conversion;
pub mod registry;

use tern_core::TypeHash;

pub use conversion::{
    Conversion, ConversionKind, find_conversion, strong_convertible, weak_convertible,
};
pub use registry::{FunctionId, FunctionOwner, FunctionSig, TypeRegistry};

/// Length in bytes of an array's header word.
pub const ARRAY_HEADER_LEN: u32 = 8;

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Int,
    Float,
    Char,
    Byte,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
        }
    }

    /// Memory length in bytes.
    pub fn size(self) -> u32 {
        match self {
            Primitive::Void => 0,
            Primitive::Int | Primitive::Float => 8,
            Primitive::Char | Primitive::Byte => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Primitive::Void,
            "int" => Primitive::Int,
            "float" => Primitive::Float,
            "char" => Primitive::Char,
            "byte" => Primitive::Byte,
            _ => return None,
        })
    }

    /// `int`, `char` and `byte`.
    pub fn is_integral(self) -> bool {
        matches!(self, Primitive::Int | Primitive::Char | Primitive::Byte)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || self == Primitive::Float
    }
}

/// Which calling mechanism a callable uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    /// Compiled free function.
    Func,
    /// Runtime-provided entry point.
    NativeFunc,
    /// Method; the first parameter is the receiver.
    Method,
}

/// A function, native or method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableType {
    pub params: Vec<Type>,
    pub ret: Type,
    pub kind: CallableKind,
}

/// A semantic type. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(Primitive),
    /// `*T`
    Pointer(Box<Type>),
    /// `[T]`: a pointer to a length-prefixed block.
    Array(Box<Type>),
    Callable(Box<CallableType>),
    /// A non-generic class (or a generic class seen from inside its own body).
    Class(TypeHash),
    /// A generic class with its template parameters bound.
    GenericClass { base: TypeHash, bindings: Vec<Type> },
    /// A template parameter, behaving as its upper bound.
    GenericParam { name: String, bound: TypeHash },
    /// `sizeof` / `len`; only valid as a call target.
    CompileTimeFunc { name: String, ret: Box<Type> },
}

impl Type {
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const INT: Type = Type::Primitive(Primitive::Int);
    pub const FLOAT: Type = Type::Primitive(Primitive::Float);
    pub const CHAR: Type = Type::Primitive(Primitive::Char);
    pub const BYTE: Type = Type::Primitive(Primitive::Byte);

    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }

    pub fn array_of(self) -> Type {
        Type::Array(Box::new(self))
    }

    /// `*void`
    pub fn void_ptr() -> Type {
        Type::VOID.pointer_to()
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Float))
    }

    pub fn is_integral(&self) -> bool {
        self.as_primitive().is_some_and(Primitive::is_integral)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(Primitive::is_numeric)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Pointers, arrays and callables are all one machine word.
    pub fn is_pointer_like(&self) -> bool {
        matches!(self, Type::Pointer(_) | Type::Array(_) | Type::Callable(_))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Class identity for class-like types. Template parameters answer with
    /// their bound.
    pub fn class_hash(&self) -> Option<TypeHash> {
        match self {
            Type::Class(hash) => Some(*hash),
            Type::GenericClass { base, .. } => Some(*base),
            Type::GenericParam { bound, .. } => Some(*bound),
            _ => None,
        }
    }

    /// Template bindings carried by the type, empty for everything else.
    pub fn bindings(&self) -> &[Type] {
        match self {
            Type::GenericClass { bindings, .. } => bindings,
            _ => &[],
        }
    }

    pub fn is_class_like(&self) -> bool {
        self.class_hash().is_some()
    }

    /// The class behind a pointer-to-class.
    pub fn pointee_class(&self) -> Option<&Type> {
        self.pointee().filter(|inner| inner.is_class_like())
    }

    /// Whether a template parameter occurs anywhere in this type.
    pub fn mentions_param(&self) -> bool {
        match self {
            Type::GenericParam { .. } => true,
            Type::Pointer(inner) | Type::Array(inner) => inner.mentions_param(),
            Type::Callable(c) => c.ret.mentions_param() || c.params.iter().any(Type::mentions_param),
            Type::GenericClass { bindings, .. } => bindings.iter().any(Type::mentions_param),
            _ => false,
        }
    }
}

/// Replace template parameters named in `params` by the matching `bindings`.
///
/// Parameters without a binding are left untouched.
pub fn substitute(ty: &Type, params: &[String], bindings: &[Type]) -> Type {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::GenericParam { name, .. } => params
            .iter()
            .position(|p| p == name)
            .and_then(|i| bindings.get(i))
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Pointer(inner) => substitute(inner, params, bindings).pointer_to(),
        Type::Array(inner) => substitute(inner, params, bindings).array_of(),
        Type::Callable(c) => Type::Callable(Box::new(CallableType {
            params: c
                .params
                .iter()
                .map(|p| substitute(p, params, bindings))
                .collect(),
            ret: substitute(&c.ret, params, bindings),
            kind: c.kind,
        })),
        Type::GenericClass { base, bindings: inner } => Type::GenericClass {
            base: *base,
            bindings: inner
                .iter()
                .map(|b| substitute(b, params, bindings))
                .collect(),
        },
        _ => ty.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sizes() {
        assert_eq!(Primitive::Void.size(), 0);
        assert_eq!(Primitive::Int.size(), 8);
        assert_eq!(Primitive::Float.size(), 8);
        assert_eq!(Primitive::Char.size(), 1);
        assert_eq!(Primitive::Byte.size(), 1);
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Type::INT.pointer_to(), Type::INT.pointer_to());
        assert_ne!(Type::INT.pointer_to(), Type::INT.array_of());
    }

    #[test]
    fn substitute_replaces_params_deeply() {
        let t = Type::GenericParam {
            name: "T".into(),
            bound: TypeHash::from_name("builtin$Object"),
        };
        let circle = Type::Class(TypeHash::from_name("m$Circle"));
        let ty = t.clone().pointer_to().array_of();
        let out = substitute(&ty, &["T".to_string()], std::slice::from_ref(&circle));
        assert_eq!(out, circle.pointer_to().array_of());
        assert!(ty.mentions_param());
        assert!(!out.mentions_param());
    }

    #[test]
    fn generic_param_acts_as_bound() {
        let bound = TypeHash::from_name("m$Shape");
        let t = Type::GenericParam {
            name: "T".into(),
            bound,
        };
        assert_eq!(t.class_hash(), Some(bound));
    }
}
