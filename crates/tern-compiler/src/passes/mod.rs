//! Compiler passes.
//!
//! - [`registration`]: Pass 1 - register classes, signatures and globals
//! - [`compilation`]: Pass 2 - compile function bodies and the entry section
//!
//! Pass 1 sees every declaration of every module before any body is
//! compiled, so functions, classes and modules may refer to each other in
//! any order.

pub mod compilation;
pub mod registration;

pub use compilation::{CompilationOutput, CompilationPass};
pub use registration::{RegistrationOutput, RegistrationPass};

use tern_ast::Program;
use tern_core::TypeHash;

use crate::compiler::{AstCompiler, Result};
use crate::env::{ScopeKind, Symbol};
use crate::types::Type;

impl<'ast> AstCompiler<'ast> {
    /// Run both passes over `program`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_program(&mut self, program: &Program<'ast>) -> Result<()> {
        let registered = RegistrationPass::new(self).run(program)?;
        tracing::debug!(
            classes = registered.classes_registered,
            functions = registered.functions_registered,
            globals = registered.globals_registered,
            "registration complete"
        );
        let compiled = CompilationPass::new(self).run()?;
        tracing::debug!(functions = compiled.functions_compiled, "compilation complete");
        Ok(())
    }

    /// Bind the template parameters of `class` in the current scope.
    pub(crate) fn define_type_params(&mut self, class: TypeHash) -> Result<()> {
        let params = self.registry.get_class(class)?.template_params.clone();
        let span = self.registry.get_class(class)?.span;
        for param in params {
            let ty = Type::GenericParam {
                name: param.name.clone(),
                bound: param.bound,
            };
            self.env.define(&param.name, Symbol::TypeParam(ty), span)?;
        }
        Ok(())
    }

    /// Run `f` where the template parameters of `class` are visible.
    pub(crate) fn in_class<T>(
        &mut self,
        class: TypeHash,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scoped(ScopeKind::Block, |c| {
            c.define_type_params(class)?;
            f(c)
        })
    }
}
