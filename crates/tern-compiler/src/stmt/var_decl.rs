//! Variable declarations.
//!
//! - `var x: T = e;` converts `e` to `T`
//! - `var x = e;` takes the type of `e`
//! - `var x: T;` zero-fills the slot
//! - `const` bindings reject later assignment
//!
//! A class-typed variable holds the object itself; its tag is written when
//! it is declared without an initializer.

use tern_ast::VarDecl;
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::frame::{Address, Instr};
use crate::types::Type;

impl<'ast> AstCompiler<'ast> {
    /// Compile a local declaration and bind the name in the current scope.
    pub fn compile_var_decl(&mut self, decl: &VarDecl<'ast>) -> Result<()> {
        let ty = self.declared_type(decl)?;
        let len = self.length_of(&ty);
        let address = self.frame.alloc(len);
        self.initialize(decl, address, &ty)?;
        self.env
            .define_variable(decl.name.name, ty, address, decl.is_const, decl.span)
    }

    /// The type of a declaration, from its annotation or its initializer.
    pub(crate) fn declared_type(&mut self, decl: &VarDecl<'ast>) -> Result<Type> {
        let ty = match (&decl.ty, &decl.init) {
            (Some(ty), _) => self.resolve_type(ty)?,
            (None, Some(init)) => self.probe_type(init)?,
            (None, None) => {
                return Err(CompilationError::Syntax {
                    message: format!("'{}' needs a type or an initializer", decl.name.name),
                    span: decl.span,
                });
            }
        };

        match &ty {
            Type::Primitive(_) if ty.is_void() => Err(CompilationError::type_error(
                format!("variable '{}' cannot have type 'void'", decl.name.name),
                decl.span,
            )),
            Type::CompileTimeFunc { .. } => Err(CompilationError::type_error(
                format!("'{}' cannot hold a compile-time function", decl.name.name),
                decl.span,
            )),
            Type::GenericParam { name, .. } => Err(CompilationError::type_error(
                format!("template parameter '{name}' can only be held through a pointer"),
                decl.span,
            )),
            Type::Class(hash) | Type::GenericClass { base: hash, .. } => {
                let class = self.registry.get_class(*hash)?;
                if class.is_abstract {
                    return Err(CompilationError::AbstractInstantiation {
                        class: class.name.clone(),
                        span: decl.span,
                    });
                }
                Ok(ty)
            }
            _ => Ok(ty),
        }
    }

    /// Write the initial value of a declaration into `address`.
    pub(crate) fn initialize(&mut self, decl: &VarDecl<'ast>, address: Address, ty: &Type) -> Result<()> {
        match &decl.init {
            Some(init) => self.with_temps(|c| c.compile_into(init, address, ty)),
            None if decl.is_const => Err(CompilationError::Syntax {
                message: format!("constant '{}' needs an initializer", decl.name.name),
                span: decl.span,
            }),
            None => self.zero_fill(address, ty),
        }
    }

    /// Zero a fresh slot; class values also get their tag.
    pub(crate) fn zero_fill(&mut self, address: Address, ty: &Type) -> Result<()> {
        let len = self.length_of(ty);
        self.frame.emit(Instr::Imm {
            dst: address,
            value: 0,
            len,
        });
        if ty.is_class_like() {
            self.tag_class_value(address, ty)?;
        }
        Ok(())
    }
}
