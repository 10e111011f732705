//! `as` casts and `instanceof`.
//!
//! Allowed casts:
//!
//! | from | to | lowering |
//! |---|---|---|
//! | `T` | `T` | none |
//! | `int`/`char`/`byte`/`float` | any of those | conversion, no warning |
//! | `*A` (class or `void`) | `*B` (class or `void`) | bit copy |
//! | `int` | `*void`, and back | bit copy |

use tern_ast::{CastExpr, InstanceOfExpr};
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::Instr;
use crate::types::{Type, find_conversion};

pub fn compile_cast<'ast>(
    compiler: &mut AstCompiler<'ast>,
    cast: &CastExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let value = compiler.compile_value(cast.expr)?;
    let target = compiler.resolve_type(&cast.target)?;
    if value.ty == target {
        return Ok(value);
    }

    if value.ty.is_numeric() && target.is_numeric() {
        let conversion = find_conversion(&compiler.registry, &value.ty, &target)
            .ok_or_else(|| CompilationError::internal("numeric types without a conversion"))?;
        let dst = compiler.result_slot(&target, dest);
        compiler.convert_into(&value, &target, dst, conversion)?;
        return Ok(ExprValue::new(target, dst));
    }

    if is_reinterpretable(&value.ty, &target) {
        let dst = compiler.result_slot(&target, dest);
        let from_len = compiler.length_of(&value.ty);
        let to_len = compiler.length_of(&target);
        compiler.copy_bits(dst, value.addr, from_len, to_len);
        return Ok(ExprValue::new(target, dst));
    }

    Err(CompilationError::InvalidCast {
        from: compiler.type_name(&value.ty),
        to: compiler.type_name(&target),
        span: cast.span,
    })
}

fn is_reinterpretable(from: &Type, to: &Type) -> bool {
    let object_or_void = |ty: &Type| ty.is_void() || ty.is_class_like();
    match (from, to) {
        (Type::Pointer(f), Type::Pointer(t)) => object_or_void(f) && object_or_void(t),
        (Type::Primitive(_), Type::Pointer(p)) | (Type::Pointer(p), Type::Primitive(_)) => {
            p.is_void() && (*from == Type::INT || *to == Type::INT)
        }
        _ => false,
    }
}

/// `expr instanceof C`: a runtime check of the object's class tag against
/// the ancestors of `C`.
pub fn compile_instance_of<'ast>(
    compiler: &mut AstCompiler<'ast>,
    test: &InstanceOfExpr<'ast>,
    dest: Option<&Dest>,
) -> Result<ExprValue> {
    let value = compiler.compile_value(test.expr)?;
    if value.ty.pointee_class().is_none() {
        return Err(CompilationError::type_error(
            format!(
                "instanceof expects a pointer to an object, got '{}'",
                compiler.type_name(&value.ty)
            ),
            test.expr.span(),
        ));
    }
    let class_ty = compiler.resolve_class_type(&test.class)?;
    let class_id = compiler.class_id(&class_ty)?;

    let dst = compiler.result_slot(&Type::INT, dest);
    let reg = compiler.frame.acquire_reg()?;
    compiler.frame.emit(Instr::Ptr {
        reg,
        src: value.addr,
    });
    compiler.frame.emit(Instr::InstanceOf { dst, reg, class_id });
    compiler.frame.release_reg(reg);
    Ok(ExprValue::new(Type::INT, dst))
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;
    use crate::options::CompilerOptions;
    use crate::test_utils::{code, compiler_with, compiler_with_options};

    #[test]
    fn float_to_int_cast_does_not_warn() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("f", Type::FLOAT)]);
        let value = compiler
            .compile_expr(&b.cast(b.name("f"), b.ty("int")))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(code(&compiler), vec!["f2i $8, $0"]);
        assert!(compiler.warnings.is_empty());
    }

    #[test]
    fn int_to_void_pointer() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("n", Type::INT)]);
        let value = compiler
            .compile_expr(&b.cast(b.name("n"), b.ptr(b.ty("void"))))
            .unwrap();
        assert_eq!(value.ty, Type::void_ptr());
        assert_eq!(code(&compiler), vec!["mov $8, $0, #8"]);
    }

    #[test]
    fn narrow_pointer_to_int_is_zero_extended() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let options = CompilerOptions::default().with_bits(32);
        let mut compiler = compiler_with_options(
            options,
            &[("p", Type::void_ptr()), ("q", Type::void_ptr())],
        );
        let value = compiler
            .compile_expr(&b.cast(b.name("p"), b.ty("int")))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(code(&compiler), vec!["imm $8, #0, #8", "mov $8, $0, #4"]);
    }

    #[test]
    fn int_to_narrow_pointer_keeps_low_word() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let options = CompilerOptions::default().with_bits(32);
        let mut compiler = compiler_with_options(options, &[("n", Type::INT)]);
        compiler
            .compile_expr(&b.cast(b.name("n"), b.ptr(b.ty("void"))))
            .unwrap();
        assert_eq!(code(&compiler), vec!["mov $8, $0, #4"]);
    }

    #[test]
    fn object_pointer_reinterpretation() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let object = Type::Class(compiler_with(&[]).registry().object());
        let mut compiler = compiler_with(&[("p", Type::void_ptr())]);
        let value = compiler
            .compile_expr(&b.cast(b.name("p"), b.ptr(b.ty("Object"))))
            .unwrap();
        assert_eq!(value.ty, object.pointer_to());
    }

    #[test]
    fn unrelated_cast_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("p", Type::INT.pointer_to())]);
        let err = compiler
            .compile_expr(&b.cast(b.name("p"), b.ptr(b.ty("float"))))
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidCast { .. }));
    }

    #[test]
    fn instance_of_checks_tag() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let object = Type::Class(compiler_with(&[]).registry().object());
        let mut compiler = compiler_with(&[("o", object.pointer_to())]);
        let value = compiler
            .compile_expr(&b.instance_of(b.name("o"), b.ty("Object")))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(code(&compiler), vec!["ptr %r0, $0", "instanceof $8, %r0, #0"]);
    }

    #[test]
    fn instance_of_needs_an_object_pointer() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("n", Type::INT)]);
        let err = compiler
            .compile_expr(&b.instance_of(b.name("n"), b.ty("Object")))
            .unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }
}
