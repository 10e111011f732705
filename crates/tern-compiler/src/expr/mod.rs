//! Expression compilation.
//!
//! Every expression compiles to an [`ExprValue`]: its static type and the
//! address holding the result. Callers may offer a [`Dest`]; a node whose
//! result type matches writes its result there directly and the caller's
//! copy becomes a no-op.
//!
//! Each node form lives in its own file as a free function taking the
//! compiler, dispatched from [`AstCompiler::compile_hinted`].

mod array;
mod assign;
mod binary;
mod call;
mod cast;
mod control;
mod literals;
mod object;
mod place;
mod unary;

pub(crate) use binary::compile_equality;
pub(crate) use object::compile_delete;

use tern_ast::Expr;
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::Address;
use crate::types::Type;

impl<'ast> AstCompiler<'ast> {
    /// Compile `expr` into a fresh or existing slot.
    pub fn compile_expr(&mut self, expr: &Expr<'ast>) -> Result<ExprValue> {
        self.compile_hinted(expr, None)
    }

    /// Compile `expr`, writing into `dest` when the result type matches.
    pub fn compile_hinted(&mut self, expr: &Expr<'ast>, dest: Option<&Dest>) -> Result<ExprValue> {
        match expr {
            Expr::Literal(lit) => literals::compile_literal(self, lit),
            Expr::Ident(ident) => place::compile_ident(self, ident),
            Expr::This(span) => {
                let binding = self.this_binding(*span)?;
                Ok(ExprValue::new(binding.ty, binding.address))
            }
            Expr::Binary(binary) => binary::compile_binary(self, binary, dest),
            Expr::Unary(unary) => unary::compile_unary(self, unary, dest),
            Expr::Assign(assign) => assign::compile_assign(self, assign),
            Expr::Call(call) => call::compile_call(self, call, dest),
            Expr::Member(_) | Expr::Index(_) => {
                let place = self.compile_place(expr)?;
                self.read_place(&place, dest)
            }
            Expr::Scoped(scoped) => call::compile_scoped_value(self, scoped),
            Expr::New(new) => object::compile_new(self, new, dest),
            Expr::NewArray(new) => array::compile_new_array(self, new, dest),
            Expr::ArrayLit(lit) => array::compile_array_literal(self, lit, dest),
            Expr::Cast(cast) => cast::compile_cast(self, cast, dest),
            Expr::InstanceOf(test) => cast::compile_instance_of(self, test, dest),
            Expr::If(if_expr) => control::compile_if_expr(self, if_expr, dest),
            Expr::Switch(switch) => control::compile_switch_expr(self, switch, dest),
            Expr::Placeholder(ident) => Err(CompilationError::NotCompilable {
                node: ident.name.to_string(),
                span: ident.span,
            }),
        }
    }

    /// Compile `expr` and leave its value, converted to `ty`, at `dst`.
    pub(crate) fn compile_into(&mut self, expr: &Expr<'ast>, dst: Address, ty: &Type) -> Result<()> {
        let dest = Dest::new(ty.clone(), dst);
        let value = self.compile_hinted(expr, Some(&dest))?;
        if value.addr == dst && value.ty == *ty {
            return Ok(());
        }
        let conversion = self.check_conversion(&value.ty, ty, expr.span())?;
        self.convert_into(&value, ty, dst, conversion)
    }

    /// Where a node producing a `ty` should write its result.
    pub(crate) fn result_slot(&mut self, ty: &Type, dest: Option<&Dest>) -> Address {
        match dest {
            Some(dest) if self.options.optimize && dest.ty == *ty => dest.addr,
            _ => self.frame.alloc(self.length_of(ty)),
        }
    }

    /// Compile `expr`, which must produce a value.
    pub(crate) fn compile_value(&mut self, expr: &Expr<'ast>) -> Result<ExprValue> {
        let value = self.compile_expr(expr)?;
        if value.ty.is_void() {
            return Err(CompilationError::type_error(
                format!("{} has no value", expr.node_name()),
                expr.span(),
            ));
        }
        Ok(value)
    }
}
