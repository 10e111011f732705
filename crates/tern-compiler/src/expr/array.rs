//! Array allocation and array literals.
//!
//! Every array level is a `heap_array` block: a length word followed by the
//! elements. For `new T[a][b]` the outer block holds `a` pointers, each to
//! a freshly allocated block of `b` elements:
//!
//! ```text
//! outer = heap_array(a, sizeof [T])
//! for i in 0..a:
//!     outer[i] = heap_array(b, sizeof T)
//! ```

use tern_ast::{ArrayLitExpr, Expr, LiteralKind, NewArrayExpr};
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::{Address, Instr, IntOp, LabelKind, Mem};
use crate::natives::Native;
use crate::types::{ARRAY_HEADER_LEN, Primitive, Type};

use super::call::{CallTarget, emit_call};

pub fn compile_new_array<'ast>(
    compiler: &mut AstCompiler<'ast>,
    new: &NewArrayExpr<'ast>,
    _dest: Option<&Dest>,
) -> Result<ExprValue> {
    let Some(outer) = new.dims.first() else {
        return Err(CompilationError::Syntax {
            message: "array allocation needs at least one dimension".to_string(),
            span: new.span,
        });
    };
    if !matches!(outer, Expr::Literal(lit) if matches!(lit.kind, LiteralKind::Int(_))) {
        return Err(CompilationError::other(
            "the outermost array dimension must be an integer constant",
            outer.span(),
        ));
    }
    compiler.require_native(Native::HeapArray, new.span)?;

    let mut ty = compiler.resolve_type(&new.element)?;
    if ty.is_void() {
        return Err(CompilationError::type_error("array of void", new.element.span));
    }
    for _ in new.dims {
        ty = ty.array_of();
    }

    let mut dims = Vec::with_capacity(new.dims.len());
    for dim in new.dims {
        let value = compiler.compile_value(dim)?;
        if !value.ty.is_integral() {
            return Err(CompilationError::type_error(
                format!("array dimension must be an integer, not '{}'", compiler.type_name(&value.ty)),
                dim.span(),
            ));
        }
        dims.push(compiler.coerce(value, &Type::INT, dim.span())?.addr);
    }

    let addr = allocate_level(compiler, &ty, &dims)?;
    Ok(ExprValue::new(ty, addr))
}

/// Allocate one level of `ty` with `dims[0]` elements, then fill each
/// element with the next level.
fn allocate_level(compiler: &mut AstCompiler<'_>, ty: &Type, dims: &[Address]) -> Result<Address> {
    let (count, rest) = dims
        .split_first()
        .ok_or_else(|| CompilationError::internal("array level without a dimension"))?;
    let element = ty
        .element()
        .cloned()
        .ok_or_else(|| CompilationError::internal("array level of a non-array type"))?;
    let array = heap_array(compiler, *count, &element)?;
    if rest.is_empty() {
        return Ok(array);
    }

    let int_len = Primitive::Int.size();
    let pointer_size = compiler.pointer_size();
    let one = compiler.literals.int(1);
    let index = compiler.frame.alloc(int_len);
    let cond = compiler.frame.alloc(int_len);
    let top = compiler.frame.label(LabelKind::Loop);
    let end = compiler.frame.label(LabelKind::EndLoop);

    compiler.frame.emit(Instr::Imm {
        dst: index,
        value: 0,
        len: int_len,
    });
    compiler.frame.place(top);
    compiler.frame.emit(Instr::Int {
        op: IntOp::Lt,
        dst: cond,
        lhs: index,
        rhs: *count,
    });
    compiler.frame.emit(Instr::IfFalse { cond, target: end });
    compiler.with_temps(|c| {
        let inner = allocate_level(c, &element, rest)?;
        let reg = c.frame.acquire_reg()?;
        c.frame.emit(Instr::Ptr { reg, src: array });
        c.frame.emit(Instr::Index {
            reg,
            index,
            elem: pointer_size,
            header: ARRAY_HEADER_LEN,
        });
        c.frame.emit(Instr::Store {
            dst: Mem::new(reg, 0),
            src: inner,
            len: pointer_size,
        });
        c.frame.release_reg(reg);
        Ok(())
    })?;
    compiler.frame.emit(Instr::Int {
        op: IntOp::Add,
        dst: index,
        lhs: index,
        rhs: one,
    });
    compiler.frame.goto(top);
    compiler.frame.place(end);
    Ok(array)
}

/// `heap_array(count, sizeof element)`
fn heap_array(compiler: &mut AstCompiler<'_>, count: Address, element: &Type) -> Result<Address> {
    let elem_len = compiler.length_of(element);
    let elem_len = compiler.literals.int(i64::from(elem_len));
    let args = [
        ExprValue::new(Type::INT, count),
        ExprValue::new(Type::INT, elem_len),
    ];
    let block = emit_call(
        compiler,
        CallTarget::Native(Native::HeapArray),
        &Type::void_ptr(),
        None,
        &args,
    )?;
    Ok(block.addr)
}

/// `[a, b, c]`: the element type is that of the first element.
pub fn compile_array_literal<'ast>(
    compiler: &mut AstCompiler<'ast>,
    lit: &ArrayLitExpr<'ast>,
    _dest: Option<&Dest>,
) -> Result<ExprValue> {
    let Some(first) = lit.elements.first() else {
        return Err(CompilationError::type_error(
            "cannot infer the element type of an empty array literal",
            lit.span,
        ));
    };
    compiler.require_native(Native::HeapArray, lit.span)?;

    let first = compiler.compile_value(first)?;
    let element = first.ty.clone();
    let mut values = vec![first];
    for expr in &lit.elements[1..] {
        let value = compiler.compile_value(expr)?;
        values.push(compiler.coerce(value, &element, expr.span())?);
    }

    let count = compiler.literals.int(values.len() as i64);
    let array = heap_array(compiler, count, &element)?;
    let elem = compiler.length_of(&element);
    for (i, value) in values.iter().enumerate() {
        let position = compiler.literals.int(i as i64);
        let reg = compiler.frame.acquire_reg()?;
        compiler.frame.emit(Instr::Ptr { reg, src: array });
        compiler.frame.emit(Instr::Index {
            reg,
            index: position,
            elem,
            header: ARRAY_HEADER_LEN,
        });
        compiler.frame.emit(Instr::Store {
            dst: Mem::new(reg, 0),
            src: value.addr,
            len: elem,
        });
        compiler.frame.release_reg(reg);
    }
    Ok(ExprValue::new(element.array_of(), array))
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;
    use tern_core::Span;

    use super::*;
    use crate::env::Symbol;
    use crate::test_utils::{code, compiler_with};

    fn require_heap_array(compiler: &mut AstCompiler<'_>) {
        compiler
            .env
            .define("heap_array", Symbol::Native(Native::HeapArray), Span::default())
            .unwrap();
    }

    #[test]
    fn one_dimension() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        require_heap_array(&mut compiler);
        let value = compiler
            .compile_expr(&b.new_array(b.ty("float"), vec![b.int(3)]))
            .unwrap();
        assert_eq!(value.ty, Type::FLOAT.array_of());
        assert_eq!(
            code(&compiler),
            vec!["mov $8, &0, #8", "mov $16, &8, #8", "call_native #13, $0"]
        );
    }

    #[test]
    fn nested_dimensions_loop() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("n", Type::INT)]);
        require_heap_array(&mut compiler);
        let value = compiler
            .compile_expr(&b.new_array(b.ty("char"), vec![b.int(2), b.name("n")]))
            .unwrap();
        assert_eq!(value.ty, Type::CHAR.array_of().array_of());
        let text = code(&compiler);
        assert!(text.contains(&"label loop_0".to_string()));
        assert!(text.contains(&"goto loop_0".to_string()));
        assert_eq!(text.last().map(String::as_str), Some("label endloop_0"));
        assert_eq!(text.iter().filter(|l| l.starts_with("call_native #13")).count(), 2);
    }

    #[test]
    fn outer_dimension_must_be_constant() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("n", Type::INT)]);
        require_heap_array(&mut compiler);
        let err = compiler
            .compile_expr(&b.new_array(b.ty("int"), vec![b.name("n")]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::Other { .. }));
    }

    #[test]
    fn literal_elements_convert_to_first_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        require_heap_array(&mut compiler);
        let value = compiler
            .compile_expr(&b.array_lit(vec![b.float(1.5), b.int(2)]))
            .unwrap();
        assert_eq!(value.ty, Type::FLOAT.array_of());
        let text = code(&compiler);
        assert_eq!(text[0], "i2f $0, &8");
        assert!(text.contains(&"index %r0, &24, #8, +8".to_string()));
    }

    #[test]
    fn empty_literal_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        require_heap_array(&mut compiler);
        let err = compiler.compile_expr(&b.array_lit(vec![])).unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }
}
