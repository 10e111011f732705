//! Results of compiling expressions.

use crate::frame::Address;
use crate::types::Type;

/// A compiled expression: its static type and where its value lives.
///
/// The address may belong to a variable or the literal pool, so a value
/// must be copied before it is modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprValue {
    pub ty: Type,
    pub addr: Address,
}

impl ExprValue {
    pub fn new(ty: Type, addr: Address) -> Self {
        Self { ty, addr }
    }
}

/// A destination offered to an expression.
///
/// An expression whose result type equals `ty` may write straight into
/// `addr` instead of a temporary.
#[derive(Debug, Clone, PartialEq)]
pub struct Dest {
    pub ty: Type,
    pub addr: Address,
}

impl Dest {
    pub fn new(ty: Type, addr: Address) -> Self {
        Self { ty, addr }
    }
}

/// Where an assignable expression lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A slot known at compile time.
    Static(Address),
    /// `offset` bytes past the pointer stored at `ptr`.
    Indirect { ptr: Address, offset: u32 },
}

/// An assignable expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub ty: Type,
    pub loc: Location,
    pub is_const: bool,
    /// Variable name, for diagnostics.
    pub name: Option<String>,
}

impl Place {
    pub fn new(ty: Type, loc: Location) -> Self {
        Self {
            ty,
            loc,
            is_const: false,
            name: None,
        }
    }

    /// The place `by` bytes further into this one.
    pub fn field(&self, ty: Type, by: u32) -> Place {
        let loc = match self.loc {
            Location::Static(addr) => Location::Static(addr.offset(by)),
            Location::Indirect { ptr, offset } => Location::Indirect {
                ptr,
                offset: offset + by,
            },
        };
        Place {
            ty,
            loc,
            is_const: false,
            name: None,
        }
    }
}
