//! Binary operators.
//!
//! Operand types pick the path:
//!
//! - either side `float`, both numeric: float instruction, comparisons yield
//!   `int`
//! - both integral: widened to `int`, integer instruction
//! - `==`/`!=` on two pointer-like values: compared as machine words
//!
//! `and`/`or` lower to branches: `x and y` is `if x then y else 0`,
//! `x or y` is `if x then 1 else y`.

use tern_ast::{BinaryExpr, BinaryOp};
use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::{Address, FloatOp, Instr, IntOp, LabelKind};
use crate::types::{Primitive, Type};

pub fn compile_binary<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &BinaryExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    if expr.op.is_lazy() {
        return compile_lazy(compiler, expr, dest);
    }
    let lhs = compiler.compile_value(expr.left)?;
    let rhs = compiler.compile_value(expr.right)?;
    compile_operation(compiler, expr.op, lhs, rhs, expr.span, dest)
}

/// `lhs == rhs` as an `int` slot.
pub(crate) fn compile_equality(
    compiler: &mut AstCompiler<'_>,
    lhs: ExprValue,
    rhs: ExprValue,
    span: Span,
) -> Result<Address> {
    compile_operation(compiler, BinaryOp::Equal, lhs, rhs, span, None).map(|value| value.addr)
}

fn compile_operation(
    compiler: &mut AstCompiler<'_>,
    op: BinaryOp,
    lhs: ExprValue,
    rhs: ExprValue,
    span: Span,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    if lhs.ty.is_numeric() && rhs.ty.is_numeric() {
        if lhs.ty.is_float() || rhs.ty.is_float() {
            let Some(float_op) = float_op(op) else {
                return Err(CompilationError::type_error(
                    format!("operator '{op}' is not defined for 'float'"),
                    span,
                ));
            };
            let lhs = compiler.coerce(lhs, &Type::FLOAT, span)?;
            let rhs = compiler.coerce(rhs, &Type::FLOAT, span)?;
            let ty = if float_op.is_comparison() {
                Type::INT
            } else {
                Type::FLOAT
            };
            let dst = compiler.result_slot(&ty, dest);
            compiler.frame.emit(Instr::Float {
                op: float_op,
                dst,
                lhs: lhs.addr,
                rhs: rhs.addr,
            });
            return Ok(ExprValue::new(ty, dst));
        }

        let lhs = compiler.coerce(lhs, &Type::INT, span)?;
        let rhs = compiler.coerce(rhs, &Type::INT, span)?;
        return Ok(emit_int(compiler, int_op(op), lhs.addr, rhs.addr, dest));
    }

    if op.is_equality() && lhs.ty.is_pointer_like() && rhs.ty.is_pointer_like() {
        let lhs = compiler.as_word(lhs);
        let rhs = compiler.as_word(rhs);
        return Ok(emit_int(compiler, int_op(op), lhs.addr, rhs.addr, dest));
    }

    Err(CompilationError::type_error(
        format!(
            "operator '{op}' cannot be applied to '{}' and '{}'",
            compiler.type_name(&lhs.ty),
            compiler.type_name(&rhs.ty)
        ),
        span,
    ))
}

fn emit_int(
    compiler: &mut AstCompiler<'_>,
    op: IntOp,
    lhs: Address,
    rhs: Address,
    dest: Option<&Dest>,
) -> ExprValue {
    let dst = compiler.result_slot(&Type::INT, dest);
    compiler.frame.emit(Instr::Int { op, dst, lhs, rhs });
    ExprValue::new(Type::INT, dst)
}

fn compile_lazy<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &BinaryExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let dst = compiler.result_slot(&Type::INT, dest);
    let else_label = compiler.frame.label(LabelKind::Else);
    let end_label = compiler.frame.label(LabelKind::EndIf);

    let cond = compiler.condition(expr.left)?;
    compiler.frame.emit(Instr::IfFalse {
        cond,
        target: else_label,
    });
    let int_len = Primitive::Int.size();
    if expr.op == BinaryOp::And {
        compile_int_operand(compiler, expr, dst)?;
        compiler.frame.goto(end_label);
        compiler.frame.place(else_label);
        compiler.frame.emit(Instr::Imm {
            dst,
            value: 0,
            len: int_len,
        });
    } else {
        compiler.frame.emit(Instr::Imm {
            dst,
            value: 1,
            len: int_len,
        });
        compiler.frame.goto(end_label);
        compiler.frame.place(else_label);
        compile_int_operand(compiler, expr, dst)?;
    }
    compiler.frame.place(end_label);
    Ok(ExprValue::new(Type::INT, dst))
}

/// The right operand of a lazy operator, converted to `int` at `dst`.
fn compile_int_operand<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &BinaryExpr<'ast>,
    dst: Address,
) -> Result<()> {
    compiler.with_temps(|c| c.compile_into(expr.right, dst, &Type::INT))
}

fn int_op(op: BinaryOp) -> IntOp {
    match op {
        BinaryOp::Add => IntOp::Add,
        BinaryOp::Sub => IntOp::Sub,
        BinaryOp::Mul => IntOp::Mul,
        BinaryOp::Div => IntOp::Div,
        BinaryOp::Mod => IntOp::Mod,
        BinaryOp::Equal => IntOp::Eq,
        BinaryOp::NotEqual => IntOp::Ne,
        BinaryOp::Less => IntOp::Lt,
        BinaryOp::LessEqual => IntOp::Le,
        BinaryOp::Greater => IntOp::Gt,
        BinaryOp::GreaterEqual => IntOp::Ge,
        BinaryOp::BitAnd => IntOp::And,
        BinaryOp::BitOr => IntOp::Or,
        BinaryOp::BitXor => IntOp::Xor,
        BinaryOp::ShiftLeft => IntOp::Shl,
        BinaryOp::ShiftRight => IntOp::Shr,
        // Lowered to branches before reaching here.
        BinaryOp::And => IntOp::And,
        BinaryOp::Or => IntOp::Or,
    }
}

fn float_op(op: BinaryOp) -> Option<FloatOp> {
    Some(match op {
        BinaryOp::Add => FloatOp::Add,
        BinaryOp::Sub => FloatOp::Sub,
        BinaryOp::Mul => FloatOp::Mul,
        BinaryOp::Div => FloatOp::Div,
        BinaryOp::Mod => FloatOp::Mod,
        BinaryOp::Equal => FloatOp::Eq,
        BinaryOp::NotEqual => FloatOp::Ne,
        BinaryOp::Less => FloatOp::Lt,
        BinaryOp::LessEqual => FloatOp::Le,
        BinaryOp::Greater => FloatOp::Gt,
        BinaryOp::GreaterEqual => FloatOp::Ge,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;
    use crate::test_utils::{code, compiler_with};

    #[test]
    fn int_plus_float_is_float() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("i", Type::INT), ("f", Type::FLOAT)]);
        let value = compiler
            .compile_expr(&b.binary(b.name("i"), BinaryOp::Add, b.name("f")))
            .unwrap();
        assert_eq!(value.ty, Type::FLOAT);
        assert_eq!(code(&compiler), vec!["i2f $16, $0", "fadd $24, $16, $8"]);
        assert!(compiler.warnings.is_empty());
    }

    #[test]
    fn char_operands_widen_to_int() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("a", Type::CHAR), ("c", Type::CHAR)]);
        let value = compiler
            .compile_expr(&b.binary(b.name("a"), BinaryOp::Less, b.name("c")))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(
            code(&compiler),
            vec!["c2i $2, $0", "c2i $10, $1", "ilt $18, $2, $10"]
        );
    }

    #[test]
    fn float_comparison_yields_int() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("f", Type::FLOAT)]);
        let value = compiler
            .compile_expr(&b.binary(b.name("f"), BinaryOp::GreaterEqual, b.float(1.5)))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
    }

    #[test]
    fn bitwise_on_float_is_a_type_error() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("f", Type::FLOAT)]);
        let err = compiler
            .compile_expr(&b.binary(b.name("f"), BinaryOp::BitAnd, b.int(1)))
            .unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn pointer_equality() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let ptr = Type::INT.pointer_to();
        let mut compiler = compiler_with(&[("p", ptr.clone()), ("q", ptr)]);
        let value = compiler
            .compile_expr(&b.binary(b.name("p"), BinaryOp::NotEqual, b.name("q")))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(code(&compiler), vec!["ine $16, $0, $8"]);

        let err = compiler
            .compile_expr(&b.binary(b.name("p"), BinaryOp::Add, b.name("q")))
            .unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn and_short_circuits() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("x", Type::INT), ("y", Type::INT)]);
        compiler
            .compile_expr(&b.binary(b.name("x"), BinaryOp::And, b.name("y")))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec![
                "if_false $0, else_0",
                "mov $16, $8, #8",
                "goto endif_0",
                "label else_0",
                "imm $16, #0, #8",
                "label endif_0",
            ]
        );
    }

    #[test]
    fn or_short_circuits() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("x", Type::INT), ("y", Type::INT)]);
        compiler
            .compile_expr(&b.binary(b.name("x"), BinaryOp::Or, b.name("y")))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec![
                "if_false $0, else_0",
                "imm $16, #1, #8",
                "goto endif_0",
                "label else_0",
                "mov $16, $8, #8",
                "label endif_0",
            ]
        );
    }
}
