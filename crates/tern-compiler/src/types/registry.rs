//! The type registry: every class and function signature of a compilation.

use rustc_hash::FxHashMap;
use tern_core::{CompilationError, Span, TypeHash};

use crate::class::{
    BUILTIN_PATH, CLASS_TAG_FIELD, ClassType, Field, OBJECT_NAME, RankEntry, object_hash,
};

use super::{CallableKind, CallableType, Type, substitute};

/// Index of a function in discovery order.
pub type FunctionId = u32;

/// Where a function is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOwner {
    /// A free function in the module with this path.
    Module(String),
    /// A method.
    Class(TypeHash),
}

/// A registered function or method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub id: FunctionId,
    pub name: String,
    /// Linkable name; filled in once every overload is known.
    pub mangled: String,
    pub owner: FunctionOwner,
    /// Parameter types, without the receiver.
    pub params: Vec<Type>,
    pub param_names: Vec<String>,
    pub ret: Type,
    pub is_abstract: bool,
    pub is_const: bool,
    /// Dispatch slot for methods.
    pub slot: Option<u32>,
    pub span: Span,
}

impl FunctionSig {
    pub fn is_method(&self) -> bool {
        matches!(self.owner, FunctionOwner::Class(_))
    }

    /// The callable type of this function; methods take `*Owner` first.
    pub fn callable_type(&self) -> Type {
        let (kind, params) = match &self.owner {
            FunctionOwner::Module(_) => (CallableKind::Func, self.params.clone()),
            FunctionOwner::Class(owner) => {
                let mut params = Vec::with_capacity(self.params.len() + 1);
                params.push(Type::Class(*owner).pointer_to());
                params.extend(self.params.iter().cloned());
                (CallableKind::Method, params)
            }
        };
        Type::Callable(Box::new(CallableType {
            params,
            ret: self.ret.clone(),
            kind,
        }))
    }
}

/// Storage for classes and function signatures, plus the dispatch-slot
/// counter shared by every class of a compilation.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    classes: FxHashMap<TypeHash, ClassType>,
    order: Vec<TypeHash>,
    functions: Vec<FunctionSig>,
    next_slot: u32,
    pointer_size: u32,
    object: TypeHash,
}

impl TypeRegistry {
    /// A registry holding only the root class.
    pub fn new(pointer_size: u32) -> Self {
        let mut registry = Self {
            classes: FxHashMap::default(),
            order: Vec::new(),
            functions: Vec::new(),
            next_slot: 0,
            pointer_size,
            object: object_hash(),
        };

        let mut object = ClassType::new(OBJECT_NAME, BUILTIN_PATH, Span::default());
        object.mro = vec![object.hash];
        object.fields.push(Field {
            name: CLASS_TAG_FIELD.to_string(),
            offset: 0,
            ty: Type::void_ptr(),
        });
        object.memory_length = pointer_size;
        registry.add_class(object);
        registry
    }

    pub fn pointer_size(&self) -> u32 {
        self.pointer_size
    }

    /// The root class.
    pub fn object(&self) -> TypeHash {
        self.object
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    /// Register a class, assigning its runtime id.
    pub fn add_class(&mut self, mut class: ClassType) -> TypeHash {
        class.id = self.order.len() as u32;
        let hash = class.hash;
        self.order.push(hash);
        self.classes.insert(hash, class);
        hash
    }

    pub fn class(&self, hash: TypeHash) -> Option<&ClassType> {
        self.classes.get(&hash)
    }

    pub fn class_mut(&mut self, hash: TypeHash) -> Option<&mut ClassType> {
        self.classes.get_mut(&hash)
    }

    /// Like [`TypeRegistry::class`], for hashes the compiler itself produced.
    pub fn get_class(&self, hash: TypeHash) -> Result<&ClassType, CompilationError> {
        self.class(hash)
            .ok_or_else(|| CompilationError::internal(format!("unregistered class {hash:?}")))
    }

    /// Classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassType> {
        self.order.iter().filter_map(|hash| self.classes.get(hash))
    }

    pub fn class_count(&self) -> usize {
        self.order.len()
    }

    /// Allocate a fresh dispatch slot.
    pub fn next_slot(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        tracing::trace!(slot, "allocated dispatch slot");
        slot
    }

    /// Whether `derived` has `base` in its MRO.
    pub fn is_subclass(&self, derived: TypeHash, base: TypeHash) -> bool {
        self.class(derived)
            .is_some_and(|class| class.mro.contains(&base))
    }

    /// Field `name` of a class-like type, with template bindings applied.
    pub fn field_of(&self, class_ty: &Type, name: &str) -> Option<(u32, Type)> {
        let class = self.class(class_ty.class_hash()?)?;
        let field = class.field(name)?;
        let ty = substitute(&field.ty, &class.param_names(), class_ty.bindings());
        Some((field.offset, ty))
    }

    /// Dispatch slots named `name` on a class-like type, with template
    /// bindings applied.
    pub fn methods_of(&self, class_ty: &Type, name: &str) -> Vec<RankEntry> {
        let Some(class) = class_ty.class_hash().and_then(|h| self.class(h)) else {
            return Vec::new();
        };
        let params = class.param_names();
        let bindings = class_ty.bindings();
        class
            .ranks_named(name)
            .map(|rank| RankEntry {
                name: rank.name.clone(),
                signature: rank
                    .signature
                    .iter()
                    .map(|t| substitute(t, &params, bindings))
                    .collect(),
                ret: substitute(&rank.ret, &params, bindings),
                slot: rank.slot,
            })
            .collect()
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Register a function signature, assigning its id.
    pub fn add_function(&mut self, mut sig: FunctionSig) -> FunctionId {
        let id = self.functions.len() as FunctionId;
        sig.id = id;
        self.functions.push(sig);
        id
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionSig> {
        self.functions.get(id as usize)
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut FunctionSig> {
        self.functions.get_mut(id as usize)
    }

    pub fn get_function(&self, id: FunctionId) -> Result<&FunctionSig, CompilationError> {
        self.function(id)
            .ok_or_else(|| CompilationError::internal(format!("unregistered function #{id}")))
    }

    /// Functions in discovery order.
    pub fn functions(&self) -> &[FunctionSig] {
        &self.functions
    }

    // ==========================================================================
    // Type queries
    // ==========================================================================

    /// Bytes occupied by a value of `ty`.
    pub fn memory_length(&self, ty: &Type) -> u32 {
        match ty {
            Type::Primitive(p) => p.size(),
            Type::Pointer(_) | Type::Array(_) | Type::Callable(_) => self.pointer_size,
            Type::Class(hash) | Type::GenericClass { base: hash, .. } => {
                self.class(*hash).map_or(0, |c| c.memory_length)
            }
            Type::GenericParam { bound, .. } => self.class(*bound).map_or(0, |c| c.memory_length),
            Type::CompileTimeFunc { .. } => 0,
        }
    }

    /// Source-level spelling of `ty`, for diagnostics and mangling.
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Pointer(inner) => format!("*{}", self.type_name(inner)),
            Type::Array(inner) => format!("[{}]", self.type_name(inner)),
            Type::Callable(c) => {
                let params: Vec<_> = c.params.iter().map(|p| self.type_name(p)).collect();
                let keyword = match c.kind {
                    CallableKind::Func => "fn",
                    CallableKind::NativeFunc => "native",
                    CallableKind::Method => "method",
                };
                format!("{keyword}({}) {}", params.join(", "), self.type_name(&c.ret))
            }
            Type::Class(hash) => self.class_name(*hash),
            Type::GenericClass { base, bindings } => {
                let args: Vec<_> = bindings.iter().map(|b| self.type_name(b)).collect();
                format!("{}<{}>", self.class_name(*base), args.join(", "))
            }
            Type::GenericParam { name, .. } => name.clone(),
            Type::CompileTimeFunc { name, .. } => name.clone(),
        }
    }

    fn class_name(&self, hash: TypeHash) -> String {
        self.class(hash)
            .map_or_else(|| format!("{hash:?}"), |c| c.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_is_registered_first() {
        let registry = TypeRegistry::new(8);
        let object = registry.class(registry.object()).unwrap();
        assert_eq!(object.id, 0);
        assert_eq!(object.mro, vec![registry.object()]);
        assert_eq!(object.field(CLASS_TAG_FIELD).unwrap().offset, 0);
        assert_eq!(object.memory_length, 8);
    }

    #[test]
    fn class_ids_follow_registration_order() {
        let mut registry = TypeRegistry::new(8);
        let a = registry.add_class(ClassType::new("A", "m", Span::default()));
        let b = registry.add_class(ClassType::new("B", "m", Span::default()));
        assert_eq!(registry.class(a).unwrap().id, 1);
        assert_eq!(registry.class(b).unwrap().id, 2);
        assert_eq!(registry.classes().count(), 3);
    }

    #[test]
    fn memory_lengths() {
        let registry = TypeRegistry::new(8);
        assert_eq!(registry.memory_length(&Type::CHAR), 1);
        assert_eq!(registry.memory_length(&Type::INT.array_of()), 8);
        assert_eq!(registry.memory_length(&Type::Class(registry.object())), 8);
        assert_eq!(
            registry.memory_length(&Type::CompileTimeFunc {
                name: "sizeof".into(),
                ret: Box::new(Type::INT)
            }),
            0
        );
    }

    #[test]
    fn slots_are_monotonic() {
        let mut registry = TypeRegistry::new(8);
        assert_eq!(registry.next_slot(), 0);
        assert_eq!(registry.next_slot(), 1);
    }

    #[test]
    fn type_names() {
        let registry = TypeRegistry::new(8);
        let ty = Type::Class(registry.object()).pointer_to().array_of();
        assert_eq!(registry.type_name(&ty), "[*Object]");
    }
}
