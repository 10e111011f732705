//! Unary operators.

use tern_ast::{Expr, UnaryExpr, UnaryOp};
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::{Instr, UnaryOpcode};
use crate::types::Type;

pub fn compile_unary<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &UnaryExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    match expr.op {
        UnaryOp::Neg => {
            let value = compiler.compile_value(expr.operand)?;
            if value.ty.is_float() {
                return Ok(emit(compiler, UnaryOpcode::FNeg, value, Type::FLOAT, dest));
            }
            if !value.ty.is_integral() {
                return Err(operand_error(compiler, expr, &value.ty));
            }
            let value = compiler.coerce(value, &Type::INT, expr.span)?;
            Ok(emit(compiler, UnaryOpcode::INeg, value, Type::INT, dest))
        }
        UnaryOp::Not => {
            let cond = compiler.condition(expr.operand)?;
            let value = ExprValue::new(Type::INT, cond);
            Ok(emit(compiler, UnaryOpcode::Not, value, Type::INT, dest))
        }
        UnaryOp::BitNot => {
            let value = compiler.compile_value(expr.operand)?;
            if !value.ty.is_integral() {
                return Err(operand_error(compiler, expr, &value.ty));
            }
            let value = compiler.coerce(value, &Type::INT, expr.span)?;
            Ok(emit(compiler, UnaryOpcode::BNot, value, Type::INT, dest))
        }
        UnaryOp::Deref => {
            let place = compiler.deref_place(expr.operand)?;
            compiler.read_place(&place, dest)
        }
        UnaryOp::AddrOf => compile_address_of(compiler, expr, dest),
    }
}

fn emit(
    compiler: &mut AstCompiler<'_>,
    op: UnaryOpcode,
    operand: ExprValue,
    ty: Type,
    dest: Option<&Dest>,
) -> ExprValue {
    let dst = compiler.result_slot(&ty, dest);
    compiler.frame.emit(Instr::Unary {
        op,
        dst,
        src: operand.addr,
    });
    ExprValue::new(ty, dst)
}

fn operand_error(compiler: &AstCompiler<'_>, expr: &UnaryExpr<'_>, ty: &Type) -> CompilationError {
    CompilationError::type_error(
        format!(
            "operator '{}' cannot be applied to '{}'",
            expr.op,
            compiler.type_name(ty)
        ),
        expr.span,
    )
}

/// `&place`
fn compile_address_of<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &UnaryExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let addressable = match expr.operand {
        Expr::Ident(_) | Expr::Member(_) | Expr::Index(_) => true,
        Expr::Unary(inner) => inner.op == UnaryOp::Deref,
        _ => false,
    };
    let place = compiler.compile_place(expr.operand)?;
    if !addressable || (matches!(expr.operand, Expr::Ident(_)) && place.name.is_none()) {
        return Err(CompilationError::type_error(
            format!("cannot take the address of {}", expr.operand.node_name()),
            expr.span,
        ));
    }

    compiler.address_of_place(&place, dest)
}
