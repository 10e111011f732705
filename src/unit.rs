//! Compilation unit API.
//!
//! A [`Unit`] collects the modules of one program, compiles them together
//! and keeps the result.
//!
//! # Example
//!
//! ```
//! use tern::ast::AstBuilder;
//! use tern::{Bump, CompilerOptions, Unit};
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//!
//! let mut unit = Unit::new(CompilerOptions::default());
//! unit.add_module(b.module(
//!     "shapes.tn",
//!     vec![b.class("Point", &[], vec![b.field("x", b.ty("int"))], vec![])],
//! ))
//! .unwrap();
//! unit.add_module(b.module("main.tn", vec![b.function("main", vec![], None, vec![])]))
//!     .unwrap();
//!
//! unit.build().unwrap();
//! assert_eq!(unit.type_count(), 2);
//! ```

use tern_ast::{Module, Program};
use tern_compiler::{CompiledProgram, Compiler, CompilerOptions};
use tern_core::{CompilationError, CompileFailure, CompileWarning};

/// A set of modules compiled as one program.
///
/// 1. Create a unit with [`Unit::new`]
/// 2. Add modules with [`Unit::add_module`]
/// 3. Build with [`Unit::build`]
/// 4. Read the program text with [`Unit::text`]
pub struct Unit<'ast> {
    options: CompilerOptions,
    /// Modules in discovery order.
    modules: Vec<Module<'ast>>,
    /// Compiled program (available after build)
    compiled: Option<CompiledProgram>,
}

impl<'ast> Unit<'ast> {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            modules: Vec::new(),
            compiled: None,
        }
    }

    /// Add a module to the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit has already been built or a module with
    /// the same path was already added.
    pub fn add_module(&mut self, module: Module<'ast>) -> Result<(), UnitError> {
        if self.is_built() {
            return Err(UnitError::AlreadyBuilt);
        }
        if self.modules.iter().any(|m| m.path == module.path) {
            return Err(UnitError::DuplicateModule(module.path.to_string()));
        }
        tracing::debug!(path = module.path, items = module.items.len(), "module added");
        self.modules.push(module);
        Ok(())
    }

    /// Compile every module.
    ///
    /// # Errors
    ///
    /// Returns the first compilation error with the path of the module it
    /// occurred in. No partial output is kept.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<(), BuildError> {
        if self.is_built() {
            return Err(BuildError::AlreadyBuilt);
        }
        if self.modules.is_empty() {
            return Err(BuildError::NoModules);
        }

        let compiler = Compiler::new(self.options.clone()).map_err(BuildError::InvalidOptions)?;
        let program = Program {
            modules: &self.modules,
        };
        let compiled = compiler.compile(&program)?;
        for warning in compiled.warnings() {
            tracing::warn!(%warning, "compiled with warning");
        }
        self.compiled = Some(compiled);
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.compiled.is_some()
    }

    /// The compiled program (available after build).
    pub fn compiled(&self) -> Option<&CompiledProgram> {
        self.compiled.as_ref()
    }

    /// The program text (available after build).
    pub fn text(&self) -> Option<&str> {
        self.compiled.as_ref().map(CompiledProgram::text)
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        self.compiled
            .as_ref()
            .map(CompiledProgram::warnings)
            .unwrap_or(&[])
    }

    /// Forget every module and the build result.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.compiled = None;
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of registered functions and methods (available after build).
    pub fn function_count(&self) -> usize {
        self.compiled
            .as_ref()
            .map_or(0, |c| c.registry().functions().len())
    }

    /// Number of registered classes, `Object` included (available after
    /// build).
    pub fn type_count(&self) -> usize {
        self.compiled
            .as_ref()
            .map_or(0, |c| c.registry().class_count())
    }
}

/// Errors that can occur when adding modules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("unit has already been built; call clear() to start over")]
    AlreadyBuilt,

    #[error("module '{0}' was already added")]
    DuplicateModule(String),
}

/// Errors that can occur during unit building.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("no modules added to unit")]
    NoModules,

    #[error("unit has already been built")]
    AlreadyBuilt,

    #[error("invalid compiler options: {0}")]
    InvalidOptions(CompilationError),

    #[error(transparent)]
    Compile(#[from] CompileFailure),
}

impl BuildError {
    /// The underlying compilation error, if any.
    pub fn compilation_error(&self) -> Option<&CompilationError> {
        match self {
            BuildError::InvalidOptions(err) => Some(err),
            BuildError::Compile(failure) => Some(&failure.error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;

    #[test]
    fn build_without_modules() {
        let mut unit = Unit::new(CompilerOptions::default());
        assert!(matches!(unit.build(), Err(BuildError::NoModules)));
    }

    #[test]
    fn duplicate_module_path() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut unit = Unit::new(CompilerOptions::default());
        unit.add_module(b.module("a.tn", vec![])).unwrap();
        assert_eq!(
            unit.add_module(b.module("a.tn", vec![])),
            Err(UnitError::DuplicateModule("a.tn".into()))
        );
    }

    #[test]
    fn built_unit_is_frozen_until_cleared() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut unit = Unit::new(CompilerOptions::default());
        unit.add_module(b.module("m.tn", vec![b.function("main", vec![], None, vec![])]))
            .unwrap();
        unit.build().unwrap();
        assert!(unit.is_built());
        assert_eq!(unit.function_count(), 1);
        assert_eq!(unit.add_module(b.module("n.tn", vec![])), Err(UnitError::AlreadyBuilt));
        assert!(matches!(unit.build(), Err(BuildError::AlreadyBuilt)));

        unit.clear();
        assert!(!unit.is_built());
        assert_eq!(unit.module_count(), 0);
        assert!(unit.text().is_none());
    }

    #[test]
    fn failed_build_keeps_no_output() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut unit = Unit::new(CompilerOptions::default());
        unit.add_module(b.module("m.tn", vec![b.function("helper", vec![], None, vec![])]))
            .unwrap();
        let err = unit.build().unwrap_err();
        assert!(matches!(
            err.compilation_error(),
            Some(CompilationError::UnknownName { .. })
        ));
        assert!(!unit.is_built());
        assert!(unit.text().is_none());
    }
}
