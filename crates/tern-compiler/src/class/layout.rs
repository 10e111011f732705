//! Field layout.
//!
//! Objects are laid out as the primary base's full layout followed by the
//! class's own fields in declaration order. The root's only field is the
//! class tag at offset 0.
//!
//! Under multiple inheritance every secondary base must find its fields at
//! the offsets it expects, otherwise a pointer to the derived object could
//! not be used as a pointer to that base.

use tern_core::{CompilationError, Span};

use crate::types::{Type, TypeRegistry};

use super::{ClassType, Field};

/// A field as declared in a class body, already resolved.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// Compute the full field table and memory length of `class`.
///
/// `class.mro` and `class.inherited_bindings` must already be set, and every
/// base must be laid out.
pub fn lay_out_fields(
    registry: &TypeRegistry,
    class: &ClassType,
    own: &[FieldDecl],
) -> Result<(Vec<Field>, u32), CompilationError> {
    let (mut fields, mut offset) = match class.mro.get(1) {
        Some(primary) => {
            let base = registry.get_class(*primary)?;
            let inherited = base
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    offset: f.offset,
                    ty: class.from_ancestor_terms(base, &f.ty),
                })
                .collect();
            (inherited, base.memory_length)
        }
        None => (Vec::new(), 0),
    };
    let inherited_count = fields.len();

    for (i, decl) in own.iter().enumerate() {
        if fields.iter().any(|f| f.name == decl.name) {
            let original = own[..i]
                .iter()
                .find(|d| d.name == decl.name)
                .map_or(class.span, |d| d.span);
            return Err(CompilationError::Redefinition {
                name: decl.name.clone(),
                original,
                span: decl.span,
            });
        }
        fields.push(Field {
            name: decl.name.clone(),
            offset,
            ty: decl.ty.clone(),
        });
        offset += registry.memory_length(&decl.ty);
    }

    tracing::trace!(
        class = %class.name,
        inherited = inherited_count,
        declared = own.len(),
        length = offset,
        "laid out fields"
    );

    check_secondary_bases(registry, class, &fields)?;
    Ok((fields, offset))
}

fn check_secondary_bases(
    registry: &TypeRegistry,
    class: &ClassType,
    fields: &[Field],
) -> Result<(), CompilationError> {
    for base_ty in class.bases.iter().skip(1) {
        let Some(hash) = base_ty.class_hash() else {
            continue;
        };
        let base = registry.get_class(hash)?;
        for expected in &base.fields {
            let ty = class.from_ancestor_terms(base, &expected.ty);
            let compatible = fields
                .iter()
                .any(|f| f.name == expected.name && f.offset == expected.offset && f.ty == ty);
            if !compatible {
                return Err(CompilationError::other(
                    format!(
                        "class '{}' cannot inherit from '{}': field '{}' is not at offset {} in the inherited layout",
                        class.name, base.name, expected.name, expected.offset
                    ),
                    class.span,
                ));
            }
        }
    }
    Ok(())
}
