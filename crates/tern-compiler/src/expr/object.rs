//! Object lifecycle: `new C(args)` and `del p`.
//!
//! ```text
//! new C(a)   =>  call_native malloc(sizeof C)
//!                settag *result, #id(C)
//!                call_fn C.__new__(result, a)
//!
//! del p      =>  vtable/call_ptr p.__del__()
//!                call_native free(p)
//! ```

use tern_ast::{Expr, NewExpr};
use tern_core::{CompilationError, Span};

use crate::class::{CONSTRUCTOR, DESTRUCTOR};
use crate::compiler::{AstCompiler, Result};
use crate::expr_info::{Dest, ExprValue};
use crate::frame::Instr;
use crate::natives::Native;
use crate::types::Type;

use super::call::{CallTarget, coerce_args, compile_args, emit_call, implementation, select_method};

pub fn compile_new<'ast>(
    compiler: &mut AstCompiler<'ast>,
    new: &NewExpr<'ast>,
    _dest: Option<&Dest>,
) -> Result<ExprValue> {
    let class_ty = compiler.resolve_class_type(&new.class)?;
    let hash = class_ty
        .class_hash()
        .ok_or_else(|| CompilationError::internal("new of a non-class type"))?;
    let class = compiler.registry.get_class(hash)?;
    if class.is_abstract {
        return Err(CompilationError::AbstractInstantiation {
            class: class.name.clone(),
            span: new.span,
        });
    }
    let class_id = class.id;
    compiler.require_native(Native::Malloc, new.span)?;

    let size = compiler.length_of(&class_ty);
    let size = ExprValue::new(Type::INT, compiler.literals.int(i64::from(size)));
    let raw = emit_call(
        compiler,
        CallTarget::Native(Native::Malloc),
        &Type::void_ptr(),
        None,
        &[size],
    )?;
    let object = ExprValue::new(class_ty.clone().pointer_to(), raw.addr);

    let reg = compiler.frame.acquire_reg()?;
    compiler.frame.emit(Instr::Ptr {
        reg,
        src: object.addr,
    });
    compiler.frame.emit(Instr::SetTag { reg, class_id });
    compiler.frame.release_reg(reg);

    if compiler.registry.methods_of(&class_ty, CONSTRUCTOR).is_empty() {
        if !new.args.is_empty() {
            return Err(CompilationError::ArgumentCountMismatch {
                name: format!("{}.{CONSTRUCTOR}", compiler.type_name(&class_ty)),
                expected: 0,
                got: new.args.len(),
                span: new.span,
            });
        }
    } else {
        let args = compile_args(compiler, new.args)?;
        let selected = select_method(compiler, &class_ty, CONSTRUCTOR, &args, new.span)?;
        let args = coerce_args(compiler, args, &selected.params, new.args)?;
        let function = implementation(compiler, &class_ty, CONSTRUCTOR, selected.key, new.span)?;
        let sig = compiler.registry.get_function(function)?;
        let (mangled, ret) = (sig.mangled.clone(), sig.ret.clone());
        emit_call(
            compiler,
            CallTarget::Function(mangled),
            &ret,
            Some(object.addr),
            &args,
        )?;
    }

    tracing::trace!(class = %compiler.type_name(&class_ty), "object constructed");
    Ok(object)
}

/// `del target`: run the destructor, if any, and release the memory.
pub(crate) fn compile_delete<'ast>(
    compiler: &mut AstCompiler<'ast>,
    target: &Expr<'ast>,
    span: Span,
) -> Result<()> {
    let value = compiler.compile_value(target)?;
    if !value.ty.is_pointer_like() || matches!(value.ty, Type::Callable(_)) {
        return Err(CompilationError::type_error(
            format!("cannot delete '{}'", compiler.type_name(&value.ty)),
            target.span(),
        ));
    }
    compiler.require_native(Native::Free, span)?;

    if let Some(class_ty) = value.ty.pointee_class().cloned()
        && !compiler.registry.methods_of(&class_ty, DESTRUCTOR).is_empty()
    {
        let selected = select_method(compiler, &class_ty, DESTRUCTOR, &[], span)?;
        let ret = compiler
            .registry
            .methods_of(&class_ty, DESTRUCTOR)
            .into_iter()
            .find(|rank| rank.slot == selected.key)
            .map_or(Type::VOID, |rank| rank.ret);
        emit_call(
            compiler,
            CallTarget::Virtual(selected.key),
            &ret,
            Some(value.addr),
            &[],
        )?;
    }

    let raw = ExprValue::new(Type::void_ptr(), value.addr);
    emit_call(compiler, CallTarget::Native(Native::Free), &Type::VOID, None, &[raw])?;
    Ok(())
}
