//! Assignment.

use tern_ast::{AssignExpr, Expr, UnaryOp};
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::ExprValue;

/// `target = value`; the result is the assigned value.
pub fn compile_assign<'ast>(compiler: &mut AstCompiler<'ast>, expr: &AssignExpr<'ast>) -> Result<ExprValue> {
    let assignable = match expr.target {
        Expr::Ident(_) | Expr::This(_) | Expr::Member(_) | Expr::Index(_) => true,
        Expr::Unary(unary) => unary.op == UnaryOp::Deref,
        _ => false,
    };
    if !assignable {
        return Err(CompilationError::type_error(
            format!("cannot assign to {}", expr.target.node_name()),
            expr.span,
        ));
    }

    let place = compiler.compile_place(expr.target)?;
    if let Expr::Ident(ident) = expr.target
        && place.name.is_none()
    {
        return Err(CompilationError::type_error(
            format!("cannot assign to '{}'", ident.name),
            ident.span,
        ));
    }
    compiler.write_place(&place, expr.value, expr.span)
}
