//! If-expressions and switch-expressions.
//!
//! Every branch is compiled once where it stands and jumps to its own join
//! block. Once all branch types are known the shared result slot is picked
//! and each join block converts its branch into it. The result type is the
//! branch type every other branch converts to, strong conversions preferred.

use tern_ast::{Expr, IfExpr, SwitchExpr};
use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::{Address, Instr, Label, LabelKind};
use crate::types::{Type, find_conversion, strong_convertible};

use super::binary::compile_equality;

/// ```text
///   if_false cond, else
///   <then>   goto join
/// else:
///   <else>   <convert else>  goto endif
/// join:
///   <convert then>
/// endif:
/// ```
pub fn compile_if_expr<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &IfExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let else_label = compiler.frame.label(LabelKind::Else);
    let end_label = compiler.frame.label(LabelKind::EndIf);
    let then_join = compiler.frame.label(LabelKind::General);

    let cond = compiler.condition(expr.condition)?;
    compiler.frame.emit(Instr::IfFalse {
        cond,
        target: else_label,
    });
    let then_value = compile_branch(compiler, expr.then_expr, dest)?;
    compiler.frame.goto(then_join);
    compiler.frame.place(else_label);
    let else_value = compile_branch(compiler, expr.else_expr, dest)?;

    let ty = unify_types(compiler, &[then_value.ty.clone(), else_value.ty.clone()], expr.span)?;
    let dst = compiler.result_slot(&ty, dest);
    join_into(compiler, &else_value, &ty, dst, expr.else_expr.span())?;
    compiler.frame.goto(end_label);
    compiler.frame.place(then_join);
    join_into(compiler, &then_value, &ty, dst, expr.then_expr.span())?;
    compiler.frame.place(end_label);
    Ok(ExprValue::new(ty, dst))
}

/// ```text
///   <tests of arm 0>  if_true eq, casebody_0
///   <tests of arm 1>  if_true eq, casebody_1
///   <default>         goto join_d
/// casebody_0: <arm 0> goto join_0
/// casebody_1: <arm 1> goto join_1
/// join_d: <convert default> goto endcase
/// join_0: <convert arm 0>   goto endcase
/// join_1: <convert arm 1>   goto endcase
/// endcase:
/// ```
pub fn compile_switch_expr<'ast>(
    compiler: &mut AstCompiler<'ast>,
    expr: &SwitchExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let subject = compiler.compile_value(expr.subject)?;
    let end_label = compiler.frame.label(LabelKind::EndCase);
    let mut bodies = Vec::with_capacity(expr.arms.len());
    for arm in expr.arms {
        let body_label = compiler.frame.label(LabelKind::CaseBody);
        for value in arm.values {
            compiler.with_temps(|c| {
                let candidate = c.compile_value(value)?;
                let cond = compile_equality(c, subject.clone(), candidate, value.span())?;
                c.frame.emit(Instr::IfTrue {
                    cond,
                    target: body_label,
                });
                Ok(())
            })?;
        }
        bodies.push(body_label);
    }

    let mut branches: Vec<(ExprValue, Label, Span)> = Vec::with_capacity(expr.arms.len() + 1);
    let default_join = compiler.frame.label(LabelKind::General);
    let default_value = compile_branch(compiler, expr.default, dest)?;
    compiler.frame.goto(default_join);
    branches.push((default_value, default_join, expr.default.span()));
    for (arm, body_label) in expr.arms.iter().zip(bodies) {
        compiler.frame.place(body_label);
        let join = compiler.frame.label(LabelKind::General);
        let value = compile_branch(compiler, &arm.result, dest)?;
        compiler.frame.goto(join);
        branches.push((value, join, arm.result.span()));
    }

    let types: Vec<Type> = branches.iter().map(|(value, ..)| value.ty.clone()).collect();
    let ty = unify_types(compiler, &types, expr.span)?;
    let dst = compiler.result_slot(&ty, dest);
    for (value, join, span) in &branches {
        compiler.frame.place(*join);
        join_into(compiler, value, &ty, dst, *span)?;
        compiler.frame.goto(end_label);
    }
    compiler.frame.place(end_label);
    Ok(ExprValue::new(ty, dst))
}

/// Compile one branch in place; it must produce a value.
fn compile_branch<'ast>(
    compiler: &mut AstCompiler<'ast>,
    branch: &Expr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let value = compiler.compile_hinted(branch, dest)?;
    if value.ty.is_void() {
        return Err(CompilationError::type_error(
            format!("{} has no value", branch.node_name()),
            branch.span(),
        ));
    }
    Ok(value)
}

/// Convert a compiled branch into the shared result slot.
fn join_into(
    compiler: &mut AstCompiler<'_>,
    value: &ExprValue,
    ty: &Type,
    dst: Address,
    span: Span,
) -> Result<()> {
    let conversion = compiler.check_conversion(&value.ty, ty, span)?;
    compiler.convert_into(value, ty, dst, conversion)
}

/// The common type of several branches.
fn unify_types(compiler: &AstCompiler<'_>, types: &[Type], span: Span) -> Result<Type> {
    let accepts_all = |candidate: &Type, strong: bool| {
        types.iter().all(|ty| {
            if strong {
                strong_convertible(&compiler.registry, ty, candidate)
            } else {
                find_conversion(&compiler.registry, ty, candidate).is_some()
            }
        })
    };
    let found = types
        .iter()
        .find(|candidate| accepts_all(*candidate, true))
        .or_else(|| types.iter().find(|candidate| accepts_all(*candidate, false)))
        .cloned();

    found.ok_or_else(|| {
        let names: Vec<String> = types.iter().map(|ty| compiler.type_name(ty)).collect();
        CompilationError::type_error(
            format!("branches have incompatible types: {}", names.join(", ")),
            span,
        )
    })
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;
    use crate::test_utils::{code, compiler_with};

    #[test]
    fn if_expr_widens_to_float() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT)]);
        let value = compiler
            .compile_expr(&b.if_expr(b.name("c"), b.int(1), b.float(2.5)))
            .unwrap();
        assert_eq!(value.ty, Type::FLOAT);
        assert_eq!(
            code(&compiler),
            vec![
                "if_false $0, else_0",
                "goto label_0",
                "label else_0",
                "mov $8, &8, #8",
                "goto endif_0",
                "label label_0",
                "i2f $8, &0",
                "label endif_0",
            ]
        );
        assert!(compiler.warnings.is_empty());
    }

    #[test]
    fn else_if_chain_compiles_each_branch_once() {
        const DEPTH: usize = 40;
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT)]);
        let mut chain = b.float(0.5);
        for i in 0..DEPTH {
            chain = b.if_expr(b.name("c"), b.int(i as i64), chain);
        }
        let value = compiler.compile_expr(&chain).unwrap();
        assert_eq!(value.ty, Type::FLOAT);

        let text = code(&compiler);
        assert_eq!(text.iter().filter(|l| l.starts_with("if_false")).count(), DEPTH);
        assert!(text.contains(&format!("label else_{}", DEPTH - 1)));
        assert!(!text.iter().any(|l| l.contains(&format!("else_{DEPTH}"))));
    }

    #[test]
    fn if_expr_rejects_unrelated_branches() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT), ("p", Type::FLOAT.pointer_to())]);
        let err = compiler
            .compile_expr(&b.if_expr(b.name("c"), b.name("p"), b.float(1.0)))
            .unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn switch_expr_tests_then_bodies() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("x", Type::INT)]);
        let switch = b.switch_expr(
            b.name("x"),
            vec![b.arm(vec![b.int(1), b.int(2)], b.int(10))],
            b.int(0),
        );
        let value = compiler.compile_expr(&switch).unwrap();
        assert_eq!(value.ty, Type::INT);
        let text = code(&compiler);
        assert_eq!(text.iter().filter(|l| l.starts_with("if_true")).count(), 2);
        assert!(text.contains(&"label casebody_0".to_string()));
        assert_eq!(text.last().map(String::as_str), Some("label endcase_0"));
    }
}
