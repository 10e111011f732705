//! Linkable names.
//!
//! - free function: `<path>$<name>`
//! - method: `<path>$<Class>.<name>`
//!
//! Overloaded names get `~<hash>` appended, where the hash is derived from
//! the parameter type spellings, so each overload links separately.

use tern_core::TypeHash;

use crate::types::{Type, TypeRegistry};

pub fn function_name(path: &str, name: &str) -> String {
    format!("{path}${name}")
}

pub fn method_name(path: &str, class: &str, name: &str) -> String {
    format!("{path}${class}.{name}")
}

/// Append the overload suffix for `params` to `base`.
pub fn overloaded(base: &str, registry: &TypeRegistry, params: &[Type]) -> String {
    let names: Vec<String> = params.iter().map(|p| registry.type_name(p)).collect();
    format!("{base}~{}", TypeHash::from_signature(&names).short_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert_eq!(function_name("src/main.tn", "main"), "src/main.tn$main");
        assert_eq!(method_name("shapes.tn", "Circle", "area"), "shapes.tn$Circle.area");
    }

    #[test]
    fn overloads_get_distinct_suffixes() {
        let registry = TypeRegistry::new(8);
        let a = overloaded("m$f", &registry, &[Type::INT]);
        let b = overloaded("m$f", &registry, &[Type::FLOAT]);
        assert!(a.starts_with("m$f~"));
        assert_ne!(a, b);
        assert_eq!(a, overloaded("m$f", &registry, &[Type::INT]));
    }
}
