//! The literal pool.
//!
//! Literal placeholders are interned on first use into one deduplicated byte
//! pool, addressed as `&n`. Encodings are little-endian:
//!
//! - `int`, `float`: 8 bytes
//! - `char`: 1 byte
//! - string: an 8-byte length followed by the characters, i.e. a `[char]`

use std::fmt::Write as _;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::frame::Address;

/// Identity of an interned literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralKey {
    Int(i64),
    Float(OrderedFloat<f64>),
    Char(u8),
    Str(String),
}

/// Deduplicated literal bytes.
#[derive(Debug, Clone, Default)]
pub struct LiteralPool {
    bytes: Vec<u8>,
    offsets: FxHashMap<LiteralKey, u32>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(&mut self, value: i64) -> Address {
        self.intern(LiteralKey::Int(value), &value.to_le_bytes())
    }

    pub fn float(&mut self, value: f64) -> Address {
        self.intern(LiteralKey::Float(OrderedFloat(value)), &value.to_le_bytes())
    }

    pub fn char(&mut self, value: u8) -> Address {
        self.intern(LiteralKey::Char(value), &[value])
    }

    /// A string as a `[char]` block; the address is that of the length word.
    pub fn string(&mut self, value: &str) -> Address {
        let mut encoded = Vec::with_capacity(8 + value.len());
        encoded.extend_from_slice(&(value.len() as u64).to_le_bytes());
        encoded.extend_from_slice(value.as_bytes());
        self.intern(LiteralKey::Str(value.to_string()), &encoded)
    }

    fn intern(&mut self, key: LiteralKey, encoded: &[u8]) -> Address {
        if let Some(offset) = self.offsets.get(&key) {
            return Address::Literal(*offset);
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(encoded);
        self.offsets.insert(key, offset);
        Address::Literal(offset)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-case hex of the whole pool.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 2);
        for byte in &self.bytes {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_deduplicated() {
        let mut pool = LiteralPool::new();
        let a = pool.int(5);
        let b = pool.char(b'x');
        assert_eq!(pool.int(5), a);
        assert_eq!(a, Address::Literal(0));
        assert_eq!(b, Address::Literal(8));
        assert_eq!(pool.len(), 9);
    }

    #[test]
    fn floats_and_ints_do_not_collide() {
        let mut pool = LiteralPool::new();
        let i = pool.int(0);
        let f = pool.float(0.0);
        assert_ne!(i, f);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut pool = LiteralPool::new();
        pool.string("hi");
        assert_eq!(pool.to_hex(), "02000000000000006869");
    }
}
