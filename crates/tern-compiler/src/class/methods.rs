//! Method tables and dispatch slots.
//!
//! Slot ids come from one counter shared by the whole compilation, so an id
//! means the same method on every class that can see it, whichever base it
//! was inherited through. For each declared method:
//!
//! - same name and signature as a visible slot: override, reuse the slot
//! - otherwise: allocate a fresh slot (a new method or a new overload)
//!
//! The vtable then binds every visible slot to the first class in the MRO
//! that declares a method in it.

use rustc_hash::FxHashMap;
use tern_core::{CompilationError, Span};

use crate::types::{
    CallableKind, CallableType, FunctionId, Type, TypeRegistry, strong_convertible,
};

use super::{ClassType, MethodEntry, RankEntry};

/// A method as declared in a class body, already resolved.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub function: FunctionId,
    pub name: String,
    /// Parameter types, without the receiver.
    pub signature: Vec<Type>,
    pub ret: Type,
    pub is_const: bool,
    pub is_abstract: bool,
    pub span: Span,
}

/// The method-related parts of a [`ClassType`].
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    pub methods: FxHashMap<String, Vec<MethodEntry>>,
    pub method_rank: Vec<RankEntry>,
    pub vtable: Vec<(u32, Option<FunctionId>)>,
}

/// Assign dispatch slots to `decls` and resolve the vtable of `class`.
///
/// Every base of `class` must already have its method table.
pub fn assign_methods(
    registry: &mut TypeRegistry,
    class: &ClassType,
    decls: &[MethodDecl],
) -> Result<MethodTable, CompilationError> {
    let mut rank = inherited_rank(registry, class)?;
    let mut methods: FxHashMap<String, Vec<MethodEntry>> = FxHashMap::default();
    let mut spans: Vec<(String, Vec<Type>, Span)> = Vec::new();

    for decl in decls {
        if decl.is_abstract && !class.is_abstract {
            return Err(CompilationError::other(
                format!(
                    "abstract method '{}' declared in concrete class '{}'",
                    decl.name, class.name
                ),
                decl.span,
            ));
        }
        if let Some((_, _, original)) = spans
            .iter()
            .find(|(name, sig, _)| *name == decl.name && *sig == decl.signature)
        {
            return Err(CompilationError::Redefinition {
                name: decl.name.clone(),
                original: *original,
                span: decl.span,
            });
        }
        spans.push((decl.name.clone(), decl.signature.clone(), decl.span));

        let matching: Vec<usize> = rank
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name == decl.name && r.signature == decl.signature)
            .map(|(i, _)| i)
            .collect();

        let (slot, overrides) = if matching.is_empty() {
            let slot = registry.next_slot();
            rank.push(RankEntry {
                name: decl.name.clone(),
                signature: decl.signature.clone(),
                ret: decl.ret.clone(),
                slot,
            });
            (slot, Vec::new())
        } else {
            for &i in &matching {
                check_override(registry, class, decl, &rank[i])?;
                rank[i].ret = decl.ret.clone();
            }
            let slots: Vec<u32> = matching.iter().map(|&i| rank[i].slot).collect();
            (slots[0], slots[1..].to_vec())
        };

        methods.entry(decl.name.clone()).or_default().push(MethodEntry {
            function: decl.function,
            name: decl.name.clone(),
            signature: decl.signature.clone(),
            ret: decl.ret.clone(),
            slot,
            overrides,
            is_const: decl.is_const,
            is_abstract: decl.is_abstract,
        });
    }

    let vtable = resolve_vtable(registry, class, &methods, &rank)?;

    if !class.is_abstract {
        if let Some((slot, _)) = vtable.iter().find(|(_, f)| f.is_none()) {
            let method = rank
                .iter()
                .find(|r| r.slot == *slot)
                .map_or_else(String::new, |r| r.name.clone());
            return Err(CompilationError::UnresolvedAbstract {
                class: class.name.clone(),
                method,
                span: class.span,
            });
        }
    }

    Ok(MethodTable {
        methods,
        method_rank: rank,
        vtable,
    })
}

/// Every slot visible through the direct bases, in this class's terms.
fn inherited_rank(
    registry: &TypeRegistry,
    class: &ClassType,
) -> Result<Vec<RankEntry>, CompilationError> {
    let mut rank: Vec<RankEntry> = Vec::new();
    for base_ty in &class.bases {
        let Some(hash) = base_ty.class_hash() else {
            continue;
        };
        let base = registry.get_class(hash)?;
        for entry in &base.method_rank {
            if rank.iter().any(|r| r.slot == entry.slot) {
                continue;
            }
            rank.push(RankEntry {
                name: entry.name.clone(),
                signature: entry
                    .signature
                    .iter()
                    .map(|t| class.from_ancestor_terms(base, t))
                    .collect(),
                ret: class.from_ancestor_terms(base, &entry.ret),
                slot: entry.slot,
            });
        }
    }
    Ok(rank)
}

fn check_override(
    registry: &TypeRegistry,
    class: &ClassType,
    decl: &MethodDecl,
    overridden: &RankEntry,
) -> Result<(), CompilationError> {
    for ancestor in class.mro.iter().skip(1) {
        let ancestor = registry.get_class(*ancestor)?;
        if let Some(existing) = ancestor.declared_in_slot(overridden.slot) {
            if existing.is_const {
                return Err(CompilationError::ConstOverride {
                    method: decl.name.clone(),
                    ancestor: ancestor.name.clone(),
                    span: decl.span,
                });
            }
            break;
        }
    }

    let receiver = Type::Class(class.hash).pointer_to();
    let method_type = |ret: &Type| {
        let mut params = vec![receiver.clone()];
        params.extend(decl.signature.iter().cloned());
        Type::Callable(Box::new(CallableType {
            params,
            ret: ret.clone(),
            kind: CallableKind::Method,
        }))
    };
    let new = method_type(&decl.ret);
    let old = method_type(&overridden.ret);
    if !strong_convertible(registry, &new, &old) {
        return Err(CompilationError::type_error(
            format!(
                "'{}' in '{}' overrides an inherited method with incompatible type {} (expected {})",
                decl.name,
                class.name,
                registry.type_name(&new),
                registry.type_name(&old)
            ),
            decl.span,
        ));
    }
    Ok(())
}

fn resolve_vtable(
    registry: &TypeRegistry,
    class: &ClassType,
    own: &FxHashMap<String, Vec<MethodEntry>>,
    rank: &[RankEntry],
) -> Result<Vec<(u32, Option<FunctionId>)>, CompilationError> {
    let mut vtable = Vec::with_capacity(rank.len());
    for entry in rank {
        let own_impl = own.values().flatten().find(|m| m.occupies(entry.slot));
        let found = match own_impl {
            Some(m) => Some(m),
            None => class
                .mro
                .iter()
                .skip(1)
                .filter_map(|hash| registry.class(*hash))
                .find_map(|ancestor| ancestor.declared_in_slot(entry.slot)),
        };
        let Some(method) = found else {
            return Err(CompilationError::internal(format!(
                "slot {} of '{}' has no declaring class",
                entry.slot, class.name
            )));
        };
        let function = (!method.is_abstract).then_some(method.function);
        tracing::trace!(class = %class.name, slot = entry.slot, ?function, "bound vtable slot");
        vtable.push((entry.slot, function));
    }
    Ok(vtable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(function: FunctionId, name: &str, signature: Vec<Type>, ret: Type) -> MethodDecl {
        MethodDecl {
            function,
            name: name.into(),
            signature,
            ret,
            is_const: false,
            is_abstract: false,
            span: Span::default(),
        }
    }

    fn class_under(registry: &mut TypeRegistry, name: &str, base: Option<&ClassType>) -> ClassType {
        let mut class = ClassType::new(name, "m", Span::default());
        let parent = base.map_or(registry.object(), |b| b.hash);
        class.bases = vec![Type::Class(parent)];
        class.mro = vec![class.hash];
        match base {
            Some(b) => class.mro.extend(b.mro.iter().copied()),
            None => class.mro.push(registry.object()),
        }
        class
    }

    fn finish(registry: &mut TypeRegistry, mut class: ClassType, table: MethodTable) -> ClassType {
        class.methods = table.methods;
        class.method_rank = table.method_rank;
        class.vtable = table.vtable;
        registry.add_class(class.clone());
        class
    }

    #[test]
    fn override_keeps_slot_overload_gets_new_one() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let table = assign_methods(&mut registry, &a, &[method(0, "foo", vec![], Type::INT)]).unwrap();
        let a = finish(&mut registry, a, table);
        let foo_slot = a.methods["foo"][0].slot;

        let b = class_under(&mut registry, "B", Some(&a));
        let table = assign_methods(
            &mut registry,
            &b,
            &[
                method(1, "foo", vec![], Type::INT),
                method(2, "foo", vec![Type::INT], Type::INT),
            ],
        )
        .unwrap();
        let b = finish(&mut registry, b, table);

        let overridden = &b.methods["foo"][0];
        let overload = &b.methods["foo"][1];
        assert_eq!(overridden.slot, foo_slot);
        assert!(overload.slot > foo_slot);
        assert_eq!(b.implementation(foo_slot), Some(Some(1)));
        assert_eq!(a.implementation(foo_slot), Some(Some(0)));
    }

    #[test]
    fn inherited_slot_resolves_to_ancestor() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let table = assign_methods(&mut registry, &a, &[method(0, "bar", vec![], Type::VOID)]).unwrap();
        let a = finish(&mut registry, a, table);
        let b = class_under(&mut registry, "B", Some(&a));
        let table = assign_methods(&mut registry, &b, &[]).unwrap();
        let b = finish(&mut registry, b, table);
        let slot = a.methods["bar"][0].slot;
        assert_eq!(b.implementation(slot), Some(Some(0)));
    }

    #[test]
    fn const_method_cannot_be_overridden() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let mut fixed = method(0, "id", vec![], Type::INT);
        fixed.is_const = true;
        let table = assign_methods(&mut registry, &a, &[fixed]).unwrap();
        let a = finish(&mut registry, a, table);
        let b = class_under(&mut registry, "B", Some(&a));
        let err = assign_methods(&mut registry, &b, &[method(1, "id", vec![], Type::INT)])
            .unwrap_err();
        assert!(matches!(err, CompilationError::ConstOverride { .. }));
    }

    #[test]
    fn incompatible_return_is_rejected() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let table = assign_methods(&mut registry, &a, &[method(0, "f", vec![], Type::INT)]).unwrap();
        let a = finish(&mut registry, a, table);
        let b = class_under(&mut registry, "B", Some(&a));
        let err = assign_methods(&mut registry, &b, &[method(1, "f", vec![], Type::INT.pointer_to())])
            .unwrap_err();
        assert_eq!(err.kind(), tern_core::ErrorKind::Type);
    }

    #[test]
    fn concrete_class_must_resolve_abstract_methods() {
        let mut registry = TypeRegistry::new(8);
        let mut shape = class_under(&mut registry, "Shape", None);
        shape.is_abstract = true;
        let mut area = method(0, "area", vec![], Type::FLOAT);
        area.is_abstract = true;
        let table = assign_methods(&mut registry, &shape, &[area]).unwrap();
        let shape = finish(&mut registry, shape, table);
        assert_eq!(shape.vtable[0].1, None);

        let square = class_under(&mut registry, "Square", Some(&shape));
        let err = assign_methods(&mut registry, &square, &[]).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedAbstract { .. }));

        let ok = assign_methods(&mut registry, &square, &[method(1, "area", vec![], Type::FLOAT)]);
        assert!(ok.is_ok());
    }

    #[test]
    fn abstract_method_in_concrete_class_is_rejected() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let mut m = method(0, "m", vec![], Type::VOID);
        m.is_abstract = true;
        assert!(assign_methods(&mut registry, &a, &[m]).is_err());
    }

    #[test]
    fn duplicate_signature_in_one_body_is_rejected() {
        let mut registry = TypeRegistry::new(8);
        let a = class_under(&mut registry, "A", None);
        let err = assign_methods(
            &mut registry,
            &a,
            &[
                method(0, "m", vec![Type::INT], Type::VOID),
                method(1, "m", vec![Type::INT], Type::VOID),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::Redefinition { .. }));
    }
}
