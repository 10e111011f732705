//! Deterministic hash-based class identity.
//!
//! [`TypeHash`] is a 64-bit hash computed from a qualified name. Classes are
//! keyed by it in the registry, which lets a class be referenced before its
//! declaration has been processed (forward references across modules).
//!
//! # Examples
//!
//! ```
//! use tern_core::TypeHash;
//!
//! let a = TypeHash::from_name("main.tn$Point");
//! let b = TypeHash::from_name("main.tn$Point");
//! assert_eq!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for signature hashes.
    pub const SIGNATURE: u64 = 0x5ea77ffbcdf5f302;

    /// Parameter position mixing constants.
    ///
    /// Each position gets its own constant so `(int, float)` and
    /// `(float, int)` hash differently.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a hash of an ordered list of parameter type names.
    ///
    /// Used to derive the overload suffix of mangled names, so the result
    /// only depends on the textual parameter types.
    pub fn from_signature<S: AsRef<str>>(params: &[S]) -> Self {
        let mut hash = hash_constants::SIGNATURE;
        for (i, param) in params.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
            let param_hash = xxh64(param.as_ref().as_bytes(), 0);
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(marker ^ param_hash);
        }
        TypeHash(hash)
    }

    /// Check whether this is the empty hash.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Short hexadecimal form used in mangled names.
    pub fn short_hex(&self) -> String {
        format!("{:08x}", (self.0 >> 32) as u32 ^ self.0 as u32)
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(TypeHash::from_name("a$Foo"), TypeHash::from_name("a$Foo"));
        assert_ne!(TypeHash::from_name("a$Foo"), TypeHash::from_name("b$Foo"));
    }

    #[test]
    fn signature_order_matters() {
        let a = TypeHash::from_signature(&["int", "float"]);
        let b = TypeHash::from_signature(&["float", "int"]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_signature_is_stable() {
        let empty: [&str; 0] = [];
        assert_eq!(
            TypeHash::from_signature(&empty),
            TypeHash::from_signature(&empty)
        );
    }

    #[test]
    fn short_hex_has_fixed_width() {
        assert_eq!(TypeHash::from_name("x").short_hex().len(), 8);
    }
}
