//! C3 linearization.
//!
//! The MRO of a class with no superclasses is `[self]`. Otherwise it is
//! `self` followed by the C3 merge of each direct base's MRO and the list of
//! direct bases. The merge repeatedly takes the first head that appears in no
//! other list's tail; if none qualifies the hierarchy is inconsistent.

use rustc_hash::{FxHashMap, FxHashSet};
use tern_core::TypeHash;
use thiserror::Error;

/// Why a hierarchy could not be linearized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MroError {
    /// No candidate head was valid during the merge.
    #[error("inconsistent hierarchy")]
    Inconsistent {
        class: TypeHash,
        /// Heads left when the merge got stuck.
        remaining: Vec<TypeHash>,
    },
    /// `class` is its own ancestor.
    #[error("circular inheritance")]
    Circular { class: TypeHash },
}

/// Linearize `class` given every class's direct bases.
///
/// Results for `class` and all its ancestors are cached in `memo`.
pub fn linearize(
    class: TypeHash,
    bases: &FxHashMap<TypeHash, Vec<TypeHash>>,
    memo: &mut FxHashMap<TypeHash, Vec<TypeHash>>,
) -> Result<Vec<TypeHash>, MroError> {
    let mut visiting = FxHashSet::default();
    linearize_inner(class, bases, memo, &mut visiting)
}

fn linearize_inner(
    class: TypeHash,
    bases: &FxHashMap<TypeHash, Vec<TypeHash>>,
    memo: &mut FxHashMap<TypeHash, Vec<TypeHash>>,
    visiting: &mut FxHashSet<TypeHash>,
) -> Result<Vec<TypeHash>, MroError> {
    if let Some(done) = memo.get(&class) {
        return Ok(done.clone());
    }
    if !visiting.insert(class) {
        return Err(MroError::Circular { class });
    }

    let direct = bases.get(&class).map(Vec::as_slice).unwrap_or_default();
    let mut mro = vec![class];
    if !direct.is_empty() {
        let mut sequences = Vec::with_capacity(direct.len() + 1);
        for base in direct {
            sequences.push(linearize_inner(*base, bases, memo, visiting)?);
        }
        sequences.push(direct.to_vec());
        mro.extend(c3_merge(class, sequences)?);
    }

    visiting.remove(&class);
    memo.insert(class, mro.clone());
    Ok(mro)
}

/// Merge step of C3.
pub fn c3_merge(
    class: TypeHash,
    mut sequences: Vec<Vec<TypeHash>>,
) -> Result<Vec<TypeHash>, MroError> {
    let mut out = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Ok(out);
        }

        let head = sequences
            .iter()
            .map(|s| s[0])
            .find(|candidate| !sequences.iter().any(|s| s[1..].contains(candidate)));

        let Some(head) = head else {
            let mut remaining = Vec::new();
            for s in &sequences {
                if !remaining.contains(&s[0]) {
                    remaining.push(s[0]);
                }
            }
            return Err(MroError::Inconsistent { class, remaining });
        };

        out.push(head);
        for s in &mut sequences {
            if s[0] == head {
                s.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str) -> TypeHash {
        TypeHash::from_name(name)
    }

    fn hierarchy(edges: &[(&str, &[&str])]) -> FxHashMap<TypeHash, Vec<TypeHash>> {
        edges
            .iter()
            .map(|(class, bases)| (h(class), bases.iter().map(|b| h(b)).collect()))
            .collect()
    }

    #[test]
    fn root_is_alone() {
        let bases = hierarchy(&[("Object", &[])]);
        let mut memo = FxHashMap::default();
        assert_eq!(
            linearize(h("Object"), &bases, &mut memo).unwrap(),
            vec![h("Object")]
        );
    }

    #[test]
    fn diamond() {
        let bases = hierarchy(&[
            ("Object", &[]),
            ("A", &["Object"]),
            ("B", &["A"]),
            ("C", &["A"]),
            ("D", &["B", "C"]),
        ]);
        let mut memo = FxHashMap::default();
        let mro = linearize(h("D"), &bases, &mut memo).unwrap();
        assert_eq!(mro, vec![h("D"), h("B"), h("C"), h("A"), h("Object")]);
        // Ancestors are cached along the way.
        assert!(memo.contains_key(&h("B")));
    }

    #[test]
    fn inconsistent_order_is_rejected() {
        let bases = hierarchy(&[
            ("Object", &[]),
            ("A", &["Object"]),
            ("B", &["Object"]),
            ("X", &["A", "B"]),
            ("Y", &["B", "A"]),
            ("Z", &["X", "Y"]),
        ]);
        let mut memo = FxHashMap::default();
        let err = linearize(h("Z"), &bases, &mut memo).unwrap_err();
        assert!(matches!(err, MroError::Inconsistent { class, .. } if class == h("Z")));
    }

    #[test]
    fn cycle_is_detected() {
        let bases = hierarchy(&[("A", &["B"]), ("B", &["A"])]);
        let mut memo = FxHashMap::default();
        assert!(matches!(
            linearize(h("A"), &bases, &mut memo),
            Err(MroError::Circular { .. })
        ));
    }

    #[test]
    fn classic_c3_example() {
        // Object <- {O1, O2, O3}; K1(O1, O2, O3); K2(O2, O3); Z(K1, K2)
        let bases = hierarchy(&[
            ("Object", &[]),
            ("O1", &["Object"]),
            ("O2", &["Object"]),
            ("O3", &["Object"]),
            ("K1", &["O1", "O2", "O3"]),
            ("K2", &["O2", "O3"]),
            ("Z", &["K1", "K2"]),
        ]);
        let mut memo = FxHashMap::default();
        let mro = linearize(h("Z"), &bases, &mut memo).unwrap();
        let expected: Vec<_> = ["Z", "K1", "O1", "K2", "O2", "O3", "Object"]
            .iter()
            .map(|n| h(n))
            .collect();
        assert_eq!(mro, expected);
    }
}
