//! Input tree for the tern compiler.
//!
//! This crate provides:
//! - AST node definitions for every tern construct
//! - [`AstBuilder`] for assembling trees in a bump arena
//!
//! All nodes borrow from an arena allocator and remain valid for its
//! lifetime. Tokenization, macro expansion and parsing happen upstream; the
//! compiler only ever sees this tree.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use tern_ast::AstBuilder;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let point = b.class(
//!     "Point",
//!     &[],
//!     vec![b.field("x", b.ty("int")), b.field("y", b.ty("int"))],
//!     vec![],
//! );
//! let program = b.program(vec![b.module("geom.tn", vec![point])]);
//! assert_eq!(program.modules[0].items.len(), 1);
//! ```

pub mod builder;
pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod types;

pub use builder::AstBuilder;
pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use stmt::*;
pub use types::*;
