//! Tern: semantic analysis and code generation for a small class-based
//! language.
//!
//! The compiler consumes an already-parsed tree (see [`ast`]) and produces
//! a textual pseudo-assembly program for a register/stack virtual machine.
//!
//! # Example
//!
//! ```
//! use tern::ast::AstBuilder;
//! use tern::{Bump, CompilerOptions, Unit};
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let main = b.function("main", vec![], Some(b.ty("int")), vec![b.ret(Some(b.int(0)))]);
//!
//! let mut unit = Unit::new(CompilerOptions::default());
//! unit.add_module(b.module("main.tn", vec![main])).unwrap();
//! unit.build().unwrap();
//! assert!(unit.text().unwrap().contains("call_fn main.tn$main"));
//! ```

mod unit;

pub use unit::{BuildError, Unit, UnitError};

pub use bumpalo::Bump;
pub use tern_compiler::{
    CompiledProgram, Compiler, CompilerOptions, Type, TypeRegistry,
};
pub use tern_core::{CompilationError, CompileFailure, CompileWarning, ErrorKind, Span};

/// The input tree.
pub mod ast {
    pub use tern_ast::*;
}

/// Compiler internals: class model, environment, frame and passes.
pub mod compiler {
    pub use tern_compiler::*;
}

/// Compile `program` in one call.
pub fn compile(
    program: &ast::Program<'_>,
    options: CompilerOptions,
) -> Result<CompiledProgram, CompileFailure> {
    let compiler = Compiler::new(options).map_err(|err| CompileFailure::new("", err))?;
    compiler.compile(program)
}
