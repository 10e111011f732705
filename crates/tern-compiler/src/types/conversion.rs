//! The two-tier conversion lattice.
//!
//! A conversion is either **strong** (identity or a safe widening; applied
//! silently) or **weak** (narrowing or pointer/int reinterpretation; applied
//! with a warning). Every strong conversion is also weak. Anything else is
//! rejected.
//!
//! ## Conversion Costs
//!
//! Overload resolution sums per-argument costs; lower is better:
//!
//! | conversion | cost |
//! |---|---|
//! | identity | 0 |
//! | `char`/`byte` to `int`, `char` to `byte` | 1 |
//! | integer to `float` | 2 |
//! | derived pointer to base pointer | 3 + MRO distance |
//! | callable variance | 40 |
//! | any pointer to `*void` | 50 |
//! | narrowing | 100 |
//! | `*void` to `*T` | 110 |
//! | pointer to/from `int` | 120 |

use super::{CallableKind, CallableType, Primitive, Type, TypeRegistry, substitute};

/// A conversion and its overload cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub cost: u32,
    /// Strong conversions apply without a warning.
    pub is_strong: bool,
}

/// The kind of conversion being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// No conversion needed.
    Identity,
    /// `char`/`byte` to `int`.
    IntWiden,
    /// `char` to `byte` or back.
    CharByte,
    /// Integer to `float`.
    IntToFloat,
    /// Derived class pointer to ancestor pointer.
    Upcast,
    /// Callable to a compatible callable.
    CallableVariance,
    /// Any pointer-like value to `*void`.
    ToVoidPointer,
    /// `int` to `char`/`byte`.
    IntNarrow,
    /// `float` to an integer.
    FloatToInt,
    /// `*void` to a typed pointer.
    FromVoidPointer,
    /// Pointer reinterpreted as `int`.
    PointerToInt,
    /// `int` reinterpreted as a pointer.
    IntToPointer,
}

impl Conversion {
    pub const IDENTITY_COST: u32 = 0;
    pub const WIDEN_COST: u32 = 1;
    pub const INT_TO_FLOAT_COST: u32 = 2;
    pub const UPCAST_COST: u32 = 3;
    pub const CALLABLE_COST: u32 = 40;
    pub const VOID_POINTER_COST: u32 = 50;
    pub const NARROW_COST: u32 = 100;
    pub const FROM_VOID_POINTER_COST: u32 = 110;
    pub const POINTER_INT_COST: u32 = 120;

    pub fn identity() -> Self {
        Self::strong(ConversionKind::Identity, Self::IDENTITY_COST)
    }

    fn strong(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            is_strong: true,
        }
    }

    fn weak(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            is_strong: false,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.kind == ConversionKind::Identity
    }
}

/// Find the conversion from `from` to `to`, if any.
pub fn find_conversion(registry: &TypeRegistry, from: &Type, to: &Type) -> Option<Conversion> {
    if from == to {
        return Some(Conversion::identity());
    }

    match (from, to) {
        (Type::Primitive(f), Type::Primitive(t)) => primitive_conversion(*f, *t),

        (Type::Pointer(f), Type::Pointer(t)) => {
            if t.is_void() {
                Some(Conversion::strong(
                    ConversionKind::ToVoidPointer,
                    Conversion::VOID_POINTER_COST,
                ))
            } else if f.is_void() {
                Some(Conversion::weak(
                    ConversionKind::FromVoidPointer,
                    Conversion::FROM_VOID_POINTER_COST,
                ))
            } else {
                upcast_distance(registry, f, t).map(|distance| {
                    Conversion::strong(ConversionKind::Upcast, Conversion::UPCAST_COST + distance)
                })
            }
        }

        (Type::Array(_) | Type::Callable(_), Type::Pointer(t)) if t.is_void() => Some(
            Conversion::strong(ConversionKind::ToVoidPointer, Conversion::VOID_POINTER_COST),
        ),

        (Type::Pointer(f), Type::Array(_) | Type::Callable(_)) if f.is_void() => Some(
            Conversion::weak(
                ConversionKind::FromVoidPointer,
                Conversion::FROM_VOID_POINTER_COST,
            ),
        ),

        (Type::Callable(f), Type::Callable(t)) => callable_strong(registry, f, t).then(|| {
            Conversion::strong(ConversionKind::CallableVariance, Conversion::CALLABLE_COST)
        }),

        (f, Type::Primitive(Primitive::Int)) if f.is_pointer_like() => Some(Conversion::weak(
            ConversionKind::PointerToInt,
            Conversion::POINTER_INT_COST,
        )),

        (Type::Primitive(Primitive::Int), t) if t.is_pointer_like() => Some(Conversion::weak(
            ConversionKind::IntToPointer,
            Conversion::POINTER_INT_COST,
        )),

        _ => None,
    }
}

fn primitive_conversion(from: Primitive, to: Primitive) -> Option<Conversion> {
    use Primitive::*;
    match (from, to) {
        (Char | Byte, Int) => Some(Conversion::strong(
            ConversionKind::IntWiden,
            Conversion::WIDEN_COST,
        )),
        (Char, Byte) | (Byte, Char) => Some(Conversion::strong(
            ConversionKind::CharByte,
            Conversion::WIDEN_COST,
        )),
        (Int | Char | Byte, Float) => Some(Conversion::strong(
            ConversionKind::IntToFloat,
            Conversion::INT_TO_FLOAT_COST,
        )),
        (Int, Char | Byte) => Some(Conversion::weak(
            ConversionKind::IntNarrow,
            Conversion::NARROW_COST,
        )),
        (Float, Int | Char | Byte) => Some(Conversion::weak(
            ConversionKind::FloatToInt,
            Conversion::NARROW_COST,
        )),
        _ => None,
    }
}

/// Identity, widening and upcasts.
pub fn strong_convertible(registry: &TypeRegistry, from: &Type, to: &Type) -> bool {
    find_conversion(registry, from, to).is_some_and(|c| c.is_strong)
}

/// Everything strong plus narrowing and pointer/int reinterpretation.
pub fn weak_convertible(registry: &TypeRegistry, from: &Type, to: &Type) -> bool {
    find_conversion(registry, from, to).is_some()
}

/// MRO distance from class-like `from` up to `to`, if `to` is an ancestor
/// with matching template bindings.
pub fn upcast_distance(registry: &TypeRegistry, from: &Type, to: &Type) -> Option<u32> {
    // A template parameter only matches itself.
    if matches!(to, Type::GenericParam { .. }) {
        return (from == to).then_some(0);
    }
    let from_hash = from.class_hash()?;
    let to_hash = to.class_hash()?;
    let class = registry.class(from_hash)?;
    let distance = class.mro.iter().position(|h| *h == to_hash)? as u32;

    let wanted = to.bindings();
    if wanted.is_empty() {
        return Some(distance);
    }
    let seen = if from_hash == to_hash {
        from.bindings().to_vec()
    } else {
        let inherited = class.inherited_bindings.get(&to_hash)?;
        inherited
            .iter()
            .map(|t| substitute(t, &class.param_names(), from.bindings()))
            .collect()
    };
    (seen == wanted).then_some(distance)
}

/// Callable compatibility: same kind and arity, parameters contravariant,
/// return covariant. A method's receiver is not compared.
fn callable_strong(registry: &TypeRegistry, from: &CallableType, to: &CallableType) -> bool {
    if from.kind != to.kind || from.params.len() != to.params.len() {
        return false;
    }
    let skip = usize::from(from.kind == CallableKind::Method);
    let params_ok = from
        .params
        .iter()
        .zip(&to.params)
        .skip(skip)
        .all(|(f, t)| strong_convertible(registry, t, f));
    params_ok && strong_convertible(registry, &from.ret, &to.ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassType;
    use tern_core::Span;

    fn registry_with_chain() -> (TypeRegistry, Type, Type) {
        let mut registry = TypeRegistry::new(8);
        let object = registry.object();
        let mut a = ClassType::new("A", "m", Span::default());
        a.mro = vec![a.hash, object];
        let a_hash = registry.add_class(a);
        let mut b = ClassType::new("B", "m", Span::default());
        b.mro = vec![b.hash, a_hash, object];
        let b_hash = registry.add_class(b);
        (registry, Type::Class(a_hash), Type::Class(b_hash))
    }

    #[test]
    fn int_to_float_is_strong() {
        let registry = TypeRegistry::new(8);
        assert!(strong_convertible(&registry, &Type::INT, &Type::FLOAT));
    }

    #[test]
    fn float_to_int_is_only_weak() {
        let registry = TypeRegistry::new(8);
        assert!(!strong_convertible(&registry, &Type::FLOAT, &Type::INT));
        assert!(weak_convertible(&registry, &Type::FLOAT, &Type::INT));
    }

    #[test]
    fn pointer_int_reinterpretation_is_weak() {
        let registry = TypeRegistry::new(8);
        let p = Type::INT.pointer_to();
        let to_int = find_conversion(&registry, &p, &Type::INT).unwrap();
        assert!(!to_int.is_strong);
        let from_int = find_conversion(&registry, &Type::INT, &p).unwrap();
        assert!(!from_int.is_strong);
    }

    #[test]
    fn unrelated_pointers_are_rejected() {
        let registry = TypeRegistry::new(8);
        let p = Type::INT.pointer_to();
        let q = Type::FLOAT.pointer_to();
        assert!(!weak_convertible(&registry, &p, &q));
    }

    #[test]
    fn upcast_is_strong_downcast_rejected() {
        let (registry, a, b) = registry_with_chain();
        let pa = a.pointer_to();
        let pb = b.pointer_to();
        assert!(strong_convertible(&registry, &pb, &pa));
        assert!(!weak_convertible(&registry, &pa, &pb));
    }

    #[test]
    fn closer_ancestor_costs_less() {
        let (registry, a, b) = registry_with_chain();
        let object = Type::Class(registry.object()).pointer_to();
        let to_a = find_conversion(&registry, &b.clone().pointer_to(), &a.pointer_to()).unwrap();
        let to_object = find_conversion(&registry, &b.pointer_to(), &object).unwrap();
        assert!(to_a.cost < to_object.cost);
    }

    #[test]
    fn void_pointer_rules() {
        let registry = TypeRegistry::new(8);
        let p = Type::CHAR.pointer_to();
        assert!(strong_convertible(&registry, &p, &Type::void_ptr()));
        let back = find_conversion(&registry, &Type::void_ptr(), &p).unwrap();
        assert!(!back.is_strong);
    }

    #[test]
    fn callable_params_are_contravariant() {
        let (registry, a, b) = registry_with_chain();
        let takes_a = Type::Callable(Box::new(CallableType {
            params: vec![a.pointer_to()],
            ret: Type::VOID,
            kind: CallableKind::Func,
        }));
        let takes_b = Type::Callable(Box::new(CallableType {
            params: vec![b.pointer_to()],
            ret: Type::VOID,
            kind: CallableKind::Func,
        }));
        assert!(strong_convertible(&registry, &takes_a, &takes_b));
        assert!(!weak_convertible(&registry, &takes_b, &takes_a));
    }

    #[test]
    fn callable_kinds_do_not_mix() {
        let registry = TypeRegistry::new(8);
        let func = Type::Callable(Box::new(CallableType {
            params: vec![],
            ret: Type::INT,
            kind: CallableKind::Func,
        }));
        let native = Type::Callable(Box::new(CallableType {
            params: vec![],
            ret: Type::INT,
            kind: CallableKind::NativeFunc,
        }));
        assert!(!weak_convertible(&registry, &func, &native));
    }
}
