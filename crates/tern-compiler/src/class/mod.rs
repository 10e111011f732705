//! Class model: layout, method tables, dispatch slots and linearization.
//!
//! A [`ClassType`] is created when its declaration is registered and filled
//! in by the registration pass in dependency order (bases before subclasses):
//!
//! 1. bases and template bounds resolved
//! 2. MRO computed ([`mro`])
//! 3. fields laid out after the inherited prefix ([`layout`])
//! 4. methods assigned dispatch slots and the vtable resolved ([`methods`])
//!
//! After registration the class is immutable.

pub mod layout;
pub mod methods;
pub mod mro;

use rustc_hash::FxHashMap;
use tern_core::{Span, TypeHash};

use crate::types::{FunctionId, Type, substitute};

pub use layout::{FieldDecl, lay_out_fields};
pub use methods::{MethodDecl, assign_methods};
pub use mro::{MroError, linearize};

/// Defining path of compiler-provided classes.
pub const BUILTIN_PATH: &str = "builtin";

/// Name of the root class.
pub const OBJECT_NAME: &str = "Object";

/// Name of the runtime type tag field every object starts with.
pub const CLASS_TAG_FIELD: &str = "__class__";

/// Constructor method name.
pub const CONSTRUCTOR: &str = "__new__";

/// Destructor method name.
pub const DESTRUCTOR: &str = "__del__";

/// A template parameter and its upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParam {
    pub name: String,
    pub bound: TypeHash,
}

/// A laid-out field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Byte offset from the start of the object.
    pub offset: u32,
    pub ty: Type,
}

/// A method declared in a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    pub function: FunctionId,
    pub name: String,
    /// Parameter types, without the receiver.
    pub signature: Vec<Type>,
    pub ret: Type,
    pub slot: u32,
    /// Further inherited slots this method also overrides (multiple bases
    /// declaring the same signature).
    pub overrides: Vec<u32>,
    pub is_const: bool,
    pub is_abstract: bool,
}

impl MethodEntry {
    pub fn occupies(&self, slot: u32) -> bool {
        self.slot == slot || self.overrides.contains(&slot)
    }
}

/// One dispatch slot visible on a class, declared here or inherited.
///
/// Signature and return type are expressed in the class's own terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub name: String,
    pub signature: Vec<Type>,
    pub ret: Type,
    pub slot: u32,
}

/// A registered class.
#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: String,
    /// Defining-file path.
    pub path: String,
    pub hash: TypeHash,
    /// Runtime type tag; discovery order, `Object` is 0.
    pub id: u32,
    pub span: Span,
    pub is_abstract: bool,
    pub template_params: Vec<TemplateParam>,
    /// Direct superclasses as written, in this class's terms.
    pub bases: Vec<Type>,
    /// Linearization, self first.
    pub mro: Vec<TypeHash>,
    /// Template bindings of every generic ancestor, in this class's terms.
    pub inherited_bindings: FxHashMap<TypeHash, Vec<Type>>,
    /// Fields in offset order, the inherited prefix first.
    pub fields: Vec<Field>,
    pub memory_length: u32,
    /// Methods declared in this class body, by name.
    pub methods: FxHashMap<String, Vec<MethodEntry>>,
    /// Every dispatch slot visible on this class, in allocation order.
    pub method_rank: Vec<RankEntry>,
    /// Slot to implementation; `None` marks an unresolved abstract method.
    pub vtable: Vec<(u32, Option<FunctionId>)>,
}

impl ClassType {
    /// A bare class awaiting registration.
    pub fn new(name: impl Into<String>, path: impl Into<String>, span: Span) -> Self {
        let name = name.into();
        let path = path.into();
        let hash = TypeHash::from_name(&mangle_class(&path, &name));
        Self {
            name,
            path,
            hash,
            id: 0,
            span,
            is_abstract: false,
            template_params: Vec::new(),
            bases: Vec::new(),
            mro: Vec::new(),
            inherited_bindings: FxHashMap::default(),
            fields: Vec::new(),
            memory_length: 0,
            methods: FxHashMap::default(),
            method_rank: Vec::new(),
            vtable: Vec::new(),
        }
    }

    /// Linkable name: `path$Name`.
    pub fn mangled(&self) -> String {
        mangle_class(&self.path, &self.name)
    }

    pub fn is_generic(&self) -> bool {
        !self.template_params.is_empty()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.template_params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Dispatch slots visible under `name`.
    pub fn ranks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RankEntry> {
        self.method_rank.iter().filter(move |r| r.name == name)
    }

    /// The method declared in this body that occupies `slot`.
    pub fn declared_in_slot(&self, slot: u32) -> Option<&MethodEntry> {
        self.methods.values().flatten().find(|m| m.occupies(slot))
    }

    /// Implementation bound to `slot`: `None` if the class has no such slot,
    /// `Some(None)` if it is abstract.
    pub fn implementation(&self, slot: u32) -> Option<Option<FunctionId>> {
        self.vtable
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, f)| *f)
    }

    /// Rewrite a type from `ancestor`'s terms into this class's terms.
    pub fn from_ancestor_terms(&self, ancestor: &ClassType, ty: &Type) -> Type {
        match self.inherited_bindings.get(&ancestor.hash) {
            Some(bindings) => substitute(ty, &ancestor.param_names(), bindings),
            None => ty.clone(),
        }
    }
}

/// `path$Name`
pub fn mangle_class(path: &str, name: &str) -> String {
    format!("{path}${name}")
}

/// Identity of the root class.
pub fn object_hash() -> TypeHash {
    TypeHash::from_name(&mangle_class(BUILTIN_PATH, OBJECT_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_follows_mangled_name() {
        let class = ClassType::new("Point", "geom.tn", Span::default());
        assert_eq!(class.mangled(), "geom.tn$Point");
        assert_eq!(class.hash, TypeHash::from_name("geom.tn$Point"));
    }

    #[test]
    fn same_name_in_different_files_differs() {
        let a = ClassType::new("Node", "a.tn", Span::default());
        let b = ClassType::new("Node", "b.tn", Span::default());
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn implementation_lookup() {
        let mut class = ClassType::new("A", "m", Span::default());
        class.vtable = vec![(0, Some(4)), (3, None)];
        assert_eq!(class.implementation(0), Some(Some(4)));
        assert_eq!(class.implementation(3), Some(None));
        assert_eq!(class.implementation(7), None);
    }
}
