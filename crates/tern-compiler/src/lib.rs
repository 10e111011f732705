//! Tern Compiler
//!
//! Semantic analysis and code generation for tern programs.
//!
//! ## Architecture
//!
//! - **Pass 1 (Registration)**: register every class, signature and global
//!   of every module, linearize hierarchies and assign dispatch slots
//! - **Pass 2 (Compilation)**: type check function bodies and lower them to
//!   pseudo-assembly, then emit the entry section
//!
//! Compilation is fail-fast: the first error aborts the program and no text
//! is produced.
//!
//! ## Modules
//!
//! - [`types`]: type model, registry and conversions
//! - [`class`]: class layout, MRO, dispatch slots
//! - [`env`]: scope chain
//! - [`frame`]: stack slots, labels, instructions and program text
//! - [`expr`], [`stmt`]: lowering of each node form
//! - [`overload`]: overload resolution
//! - [`return_checker`]: "every path returns" analysis
//! - [`passes`]: the two passes

pub mod class;
pub mod compiler;
pub mod env;
pub mod expr;
mod expr_info;
pub mod frame;
pub mod literals;
pub mod mangle;
pub mod natives;
pub mod options;
pub mod overload;
pub mod passes;
pub mod return_checker;
pub mod stmt;
pub mod types;

pub use class::{ClassType, Field, MethodEntry, RankEntry};
pub use compiler::AstCompiler;
pub use env::{Environment, Scope, ScopeKind, Symbol};
pub use frame::{Address, FrameManager, Instr, Label, LabelKind};
pub use options::CompilerOptions;
pub use passes::{CompilationOutput, CompilationPass, RegistrationOutput, RegistrationPass};
pub use return_checker::ChecksReturn;
pub use types::{Conversion, ConversionKind, FunctionSig, Type, TypeRegistry};

// Re-export errors from core for convenience
pub use tern_core::{CompilationError, CompileFailure, CompileWarning, ErrorKind};

use tern_ast::Program;

/// A successfully compiled program.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    text: String,
    warnings: Vec<CompileWarning>,
    registry: TypeRegistry,
}

impl CompiledProgram {
    /// The complete pseudo-assembly text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Every class and function signature of the program.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// The main compiler entry point.
#[derive(Debug, Clone)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Result<Self, CompilationError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile every module of `program` into one program text.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, program: &Program<'_>) -> Result<CompiledProgram, CompileFailure> {
        let mut compiler =
            AstCompiler::new(self.options.clone()).map_err(|err| CompileFailure::new("", err))?;

        if let Err(err) = compiler.compile_program(program) {
            let path = compiler.failed_path.take().unwrap_or_default();
            tracing::debug!(%path, error = %err, "compilation failed");
            return Err(CompileFailure::new(path, err));
        }

        let text = compiler.output.render(
            &compiler.options,
            &compiler.registry,
            &compiler.literals,
            compiler.frame.global_len(),
        );
        tracing::debug!(
            functions = compiler.output.functions().len(),
            warnings = compiler.warnings.len(),
            "program rendered"
        );
        Ok(CompiledProgram {
            text,
            warnings: compiler.warnings,
            registry: compiler.registry,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use tern_core::Span;

    use crate::compiler::AstCompiler;
    use crate::env::ScopeKind;
    use crate::options::CompilerOptions;
    use crate::types::Type;

    /// Route `tracing` output to the test harness; `RUST_LOG` filters it.
    pub fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// A compiler with `vars` bound to consecutive stack slots from `$0`.
    pub fn compiler_with<'a>(vars: &[(&str, Type)]) -> AstCompiler<'a> {
        compiler_with_options(CompilerOptions::default(), vars)
    }

    /// Like [`compiler_with`], with explicit options.
    pub fn compiler_with_options<'a>(
        options: CompilerOptions,
        vars: &[(&str, Type)],
    ) -> AstCompiler<'a> {
        init_test_logging();
        let mut compiler = AstCompiler::new(options).unwrap();
        for (name, ty) in vars {
            let len = compiler.length_of(ty);
            let addr = compiler.frame.alloc(len);
            compiler
                .env
                .define_variable(name, ty.clone(), addr, false, Span::default())
                .unwrap();
        }
        compiler
    }

    /// A compiler inside the body of `fn f() ret`, return slot allocated.
    pub fn function_compiler<'a>(ret: Type) -> AstCompiler<'a> {
        let mut compiler = compiler_with(&[]);
        let len = compiler.length_of(&ret);
        compiler.env.push(ScopeKind::Function {
            name: "f".to_string(),
            ret,
        });
        compiler.frame.alloc(len);
        compiler
    }

    pub fn code(compiler: &AstCompiler<'_>) -> Vec<String> {
        compiler.frame.code().iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;

    #[test]
    fn invalid_options_are_rejected() {
        assert!(Compiler::new(CompilerOptions::default().with_bits(12)).is_err());
    }

    #[test]
    fn failure_names_the_module() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let program = b.program(vec![
            b.module("ok.tn", vec![b.function("main", vec![], None, vec![])]),
            b.module(
                "broken.tn",
                vec![b.function("f", vec![], Some(b.ty("int")), vec![])],
            ),
        ]);
        let failure = Compiler::new(CompilerOptions::default())
            .unwrap()
            .compile(&program)
            .unwrap_err();
        assert_eq!(failure.path, "broken.tn");
        assert_eq!(failure.kind, ErrorKind::Compile);
        assert!(matches!(failure.error, CompilationError::MissingReturn { .. }));
    }

    #[test]
    fn text_starts_with_header() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let program = b.program(vec![b.module("m.tn", vec![b.function("main", vec![], None, vec![])])]);
        let compiled = Compiler::new(CompilerOptions::default())
            .unwrap()
            .compile(&program)
            .unwrap();
        let mut lines = compiled.text().lines();
        assert!(lines.next().unwrap().starts_with("version "));
        assert_eq!(lines.next(), Some("bits 64"));
        assert!(compiled.text().contains("fn m.tn$main $0"));
        assert!(compiled.text().ends_with("entry\n  call_fn m.tn$main, $0\n  stop\n"));
        assert!(compiled.warnings().is_empty());
    }
}
