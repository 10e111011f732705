//! Overload resolution.
//!
//! ## Algorithm
//!
//! 1. Drop candidates whose signature repeats an earlier one (the earlier
//!    candidate is the more specific: own declarations before inherited ones)
//! 2. Keep candidates whose arity matches and whose every parameter accepts
//!    its argument (strongly or weakly)
//! 3. Pick the lowest total conversion cost
//! 4. Break a cost tie by the number of exact matches, else report the call
//!    as ambiguous

use tern_core::{CompilationError, Span};

use crate::types::{Conversion, Type, TypeRegistry, find_conversion};

/// A function or method that a call might resolve to.
#[derive(Debug, Clone)]
pub struct Candidate<K> {
    pub key: K,
    /// Parameter types, without the receiver.
    pub params: Vec<Type>,
}

/// The selected candidate and the conversion applied to each argument.
#[derive(Debug, Clone)]
pub struct OverloadMatch<K> {
    pub key: K,
    pub params: Vec<Type>,
    pub conversions: Vec<Conversion>,
    pub total_cost: u32,
}

impl<K> OverloadMatch<K> {
    fn exact_matches(&self) -> usize {
        self.conversions.iter().filter(|c| c.is_exact()).count()
    }
}

/// Select the best candidate for a call with `args`.
pub fn resolve_overload<K: Clone>(
    registry: &TypeRegistry,
    name: &str,
    candidates: &[Candidate<K>],
    args: &[Type],
    span: Span,
) -> Result<OverloadMatch<K>, CompilationError> {
    let mut unique: Vec<&Candidate<K>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.iter().any(|u| u.params == candidate.params) {
            unique.push(candidate);
        }
    }

    if unique.is_empty() {
        return Err(CompilationError::internal(format!(
            "no candidates for '{name}'"
        )));
    }

    if let [only] = unique.as_slice() {
        if only.params.len() != args.len() {
            return Err(CompilationError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: only.params.len(),
                got: args.len(),
                span,
            });
        }
        return match_candidate(registry, only, args).ok_or_else(|| {
            let (from, to) = args
                .iter()
                .zip(&only.params)
                .find(|(a, p)| find_conversion(registry, a, p).is_none())
                .map_or_else(
                    || (String::new(), String::new()),
                    |(a, p)| (registry.type_name(a), registry.type_name(p)),
                );
            CompilationError::InvalidConversion { from, to, span }
        });
    }

    let viable: Vec<OverloadMatch<K>> = unique
        .iter()
        .filter_map(|c| match_candidate(registry, c, args))
        .collect();

    let Some(min_cost) = viable.iter().map(|m| m.total_cost).min() else {
        return Err(CompilationError::NoMatchingOverload {
            name: name.to_string(),
            args: type_list(registry, args),
            span,
        });
    };

    let mut best: Vec<&OverloadMatch<K>> =
        viable.iter().filter(|m| m.total_cost == min_cost).collect();
    if best.len() > 1 {
        let most_exact = best.iter().map(|m| m.exact_matches()).max().unwrap_or(0);
        best.retain(|m| m.exact_matches() == most_exact);
    }

    match best.as_slice() {
        [winner] => Ok((*winner).clone()),
        tied => Err(CompilationError::AmbiguousOverload {
            name: name.to_string(),
            candidates: tied
                .iter()
                .map(|m| format!("{name}({})", type_list(registry, &m.params)))
                .collect::<Vec<_>>()
                .join(", "),
            span,
        }),
    }
}

fn match_candidate<K: Clone>(
    registry: &TypeRegistry,
    candidate: &Candidate<K>,
    args: &[Type],
) -> Option<OverloadMatch<K>> {
    if candidate.params.len() != args.len() {
        return None;
    }
    let mut conversions = Vec::with_capacity(args.len());
    let mut total_cost = 0u32;
    for (arg, param) in args.iter().zip(&candidate.params) {
        let conversion = find_conversion(registry, arg, param)?;
        total_cost = total_cost.saturating_add(conversion.cost);
        conversions.push(conversion);
    }
    Some(OverloadMatch {
        key: candidate.key.clone(),
        params: candidate.params.clone(),
        conversions,
        total_cost,
    })
}

fn type_list(registry: &TypeRegistry, types: &[Type]) -> String {
    types
        .iter()
        .map(|t| registry.type_name(t))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: u32, params: Vec<Type>) -> Candidate<u32> {
        Candidate { key, params }
    }

    #[test]
    fn exact_match_wins() {
        let registry = TypeRegistry::new(8);
        let candidates = [
            candidate(0, vec![Type::FLOAT]),
            candidate(1, vec![Type::INT]),
        ];
        let m = resolve_overload(&registry, "f", &candidates, &[Type::INT], Span::default()).unwrap();
        assert_eq!(m.key, 1);
        assert_eq!(m.total_cost, 0);
    }

    #[test]
    fn widening_beats_narrowing() {
        let registry = TypeRegistry::new(8);
        let candidates = [
            candidate(0, vec![Type::CHAR]),
            candidate(1, vec![Type::FLOAT]),
        ];
        let m = resolve_overload(&registry, "f", &candidates, &[Type::INT], Span::default()).unwrap();
        assert_eq!(m.key, 1);
    }

    #[test]
    fn single_candidate_arity() {
        let registry = TypeRegistry::new(8);
        let err = resolve_overload(
            &registry,
            "f",
            &[candidate(0, vec![Type::INT])],
            &[],
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompilationError::ArgumentCountMismatch { expected: 1, got: 0, .. }
        ));
    }

    #[test]
    fn single_candidate_bad_argument() {
        let registry = TypeRegistry::new(8);
        let err = resolve_overload(
            &registry,
            "f",
            &[candidate(0, vec![Type::INT.pointer_to()])],
            &[Type::FLOAT],
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidConversion { .. }));
    }

    #[test]
    fn nothing_viable() {
        let registry = TypeRegistry::new(8);
        let candidates = [
            candidate(0, vec![Type::INT]),
            candidate(1, vec![Type::INT, Type::INT]),
        ];
        let err = resolve_overload(&registry, "f", &candidates, &[Type::VOID], Span::default())
            .unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));
    }

    #[test]
    fn equal_cost_is_ambiguous() {
        let registry = TypeRegistry::new(8);
        let candidates = [
            candidate(0, vec![Type::INT, Type::FLOAT]),
            candidate(1, vec![Type::FLOAT, Type::INT]),
        ];
        let err = resolve_overload(
            &registry,
            "f",
            &candidates,
            &[Type::CHAR, Type::CHAR],
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousOverload { .. }));
    }

    #[test]
    fn repeated_signature_keeps_first() {
        let registry = TypeRegistry::new(8);
        let candidates = [
            candidate(7, vec![Type::INT]),
            candidate(3, vec![Type::INT]),
        ];
        let m = resolve_overload(&registry, "f", &candidates, &[Type::INT], Span::default()).unwrap();
        assert_eq!(m.key, 7);
    }
}
