//! Core types shared by the tern crates.
//!
//! - [`Span`]: source positions
//! - [`TypeHash`]: deterministic class identity
//! - [`CompilationError`], [`CompileFailure`], [`CompileWarning`]: diagnostics

mod error;
mod span;
mod type_hash;

pub use error::{CompilationError, CompileFailure, CompileWarning, ErrorKind};
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants};
