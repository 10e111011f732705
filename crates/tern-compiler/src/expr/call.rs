//! Calls.
//!
//! ## Calling Convention
//!
//! A call region is carved out at the current stack top:
//!
//! ```text
//! base -> [return slot][this (methods)][arg 0][arg 1]...
//! ```
//!
//! The callee addresses the region as its own `$0..`, and the result is read
//! back from `base` once the call returns.
//!
//! ## Dispatch
//!
//! - free functions: `call_fn` with the mangled name
//! - natives: `call_native` with the fixed id
//! - methods through a pointer: `vtable` lookup by dispatch slot, `call_ptr`
//! - methods on a class value and `Class::method`: resolved statically
//! - callable values: `call_ptr`

use tern_ast::{CallExpr, Expr, Ident, MemberExpr, ScopedExpr};
use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::env::Symbol;
use crate::expr_info::{Dest, ExprValue};
use crate::frame::{Address, Instr, Mem};
use crate::natives::{Intrinsic, Native};
use crate::overload::{Candidate, OverloadMatch, resolve_overload};
use crate::types::{CallableKind, CallableType, FunctionId, Primitive, Type};

/// How a call reaches its callee.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallTarget {
    /// A compiled function, by mangled name.
    Function(String),
    Native(Native),
    /// A function pointer held in a slot.
    Pointer(Address),
    /// A dispatch slot of the receiver's class.
    Virtual(u32),
}

/// Lay out the call region, emit the call and return the result slot.
///
/// `args` must already have the parameter types.
pub(crate) fn emit_call(
    compiler: &mut AstCompiler<'_>,
    target: CallTarget,
    ret: &Type,
    receiver: Option<Address>,
    args: &[ExprValue],
) -> Result<ExprValue> {
    let pointer_size = compiler.pointer_size();
    let base = compiler.frame.top();
    let ret_len = compiler.length_of(ret);
    compiler.frame.alloc(ret_len);
    if let Some(receiver) = receiver {
        let slot = compiler.frame.alloc(pointer_size);
        compiler.mov(slot, receiver, pointer_size);
    }
    for arg in args {
        let len = compiler.length_of(&arg.ty);
        let slot = compiler.frame.alloc(len);
        compiler.mov(slot, arg.addr, len);
    }

    match target {
        CallTarget::Function(function) => {
            compiler.frame.emit(Instr::CallFn { function, base });
        }
        CallTarget::Native(native) => {
            compiler.frame.emit(Instr::CallNative {
                native: native.id(),
                base,
            });
        }
        CallTarget::Pointer(slot) => {
            let reg = compiler.frame.acquire_reg()?;
            compiler.frame.emit(Instr::Ptr { reg, src: slot });
            compiler.frame.emit(Instr::CallPtr { reg, base });
            compiler.frame.release_reg(reg);
        }
        CallTarget::Virtual(slot) => {
            let receiver = receiver
                .ok_or_else(|| CompilationError::internal("virtual call without a receiver"))?;
            let obj = compiler.frame.acquire_reg()?;
            let func = compiler.frame.acquire_reg()?;
            compiler.frame.emit(Instr::Ptr {
                reg: obj,
                src: receiver,
            });
            compiler.frame.emit(Instr::VTable {
                dst: func,
                obj,
                slot,
            });
            compiler.frame.emit(Instr::CallPtr { reg: func, base });
            compiler.frame.release_reg(func);
            compiler.frame.release_reg(obj);
        }
    }
    Ok(ExprValue::new(ret.clone(), base))
}

pub fn compile_call<'ast>(
    compiler: &mut AstCompiler<'ast>,
    call: &CallExpr<'ast>,
    _dest: Option<&Dest>,
) -> Result<ExprValue> {
    match *call.callee {
        Expr::Ident(ident) => compile_named_call(compiler, &ident, call),
        Expr::Member(member) => compile_method_call(compiler, member, call.args, call.span),
        Expr::Scoped(scoped) => compile_scoped_call(compiler, scoped, call.args, call.span),
        callee => {
            let value = compiler.compile_value(&callee)?;
            call_value(compiler, value, call.args, call.span)
        }
    }
}

fn compile_named_call<'ast>(
    compiler: &mut AstCompiler<'ast>,
    ident: &Ident<'ast>,
    call: &CallExpr<'ast>,
) -> Result<ExprValue> {
    match compiler.lookup_symbol(ident.name, ident.span)? {
        Symbol::Functions(ids) => {
            let args = compile_args(compiler, call.args)?;
            let candidates = function_candidates(compiler, &ids)?;
            let selected = select(compiler, ident.name, &candidates, &args, call.span)?;
            let args = coerce_args(compiler, args, &selected.params, call.args)?;
            let sig = compiler.registry.get_function(selected.key)?;
            let ret = sig.ret.clone();
            let mangled = sig.mangled.clone();
            emit_call(compiler, CallTarget::Function(mangled), &ret, None, &args)
        }
        Symbol::Native(native) => {
            let signature = native.signature();
            let args = compile_args(compiler, call.args)?;
            let candidates = [Candidate {
                key: native,
                params: signature.params.clone(),
            }];
            let selected = select(compiler, ident.name, &candidates, &args, call.span)?;
            let args = coerce_args(compiler, args, &selected.params, call.args)?;
            emit_call(compiler, CallTarget::Native(native), &signature.ret, None, &args)
        }
        Symbol::Intrinsic(intrinsic) => compile_intrinsic(compiler, intrinsic, call),
        Symbol::Variable(binding) => {
            let value = ExprValue::new(binding.ty, binding.address);
            call_value(compiler, value, call.args, call.span)
        }
        Symbol::Class(_) | Symbol::TypeParam(_) => Err(CompilationError::type_error(
            format!("'{}' is a type; use 'new {}(...)' to construct it", ident.name, ident.name),
            ident.span,
        )),
    }
}

/// `obj.method(args)`
fn compile_method_call<'ast>(
    compiler: &mut AstCompiler<'ast>,
    member: &'ast MemberExpr<'ast>,
    args: &'ast [Expr<'ast>],
    span: Span,
) -> Result<ExprValue> {
    let name = member.member.name;
    let object = compiler.compile_place(member.object)?;

    if let Some(class_ty) = object.ty.pointee_class().cloned()
        && !compiler.registry.methods_of(&class_ty, name).is_empty()
    {
        let receiver = compiler.read_place(&object, None)?;
        let values = compile_args(compiler, args)?;
        let selected = select_method(compiler, &class_ty, name, &values, span)?;
        let values = coerce_args(compiler, values, &selected.params, args)?;
        let ret = method_ret(compiler, &class_ty, name, selected.key);
        return emit_call(
            compiler,
            CallTarget::Virtual(selected.key),
            &ret,
            Some(receiver.addr),
            &values,
        );
    }

    if object.ty.is_class_like() && !compiler.registry.methods_of(&object.ty, name).is_empty() {
        let class_ty = object.ty.clone();
        let this = compiler.address_of_place(&object, None)?;
        let values = compile_args(compiler, args)?;
        let selected = select_method(compiler, &class_ty, name, &values, span)?;
        let values = coerce_args(compiler, values, &selected.params, args)?;
        let ret = method_ret(compiler, &class_ty, name, selected.key);
        let function = implementation(compiler, &class_ty, name, selected.key, span)?;
        let mangled = compiler.registry.get_function(function)?.mangled.clone();
        return emit_call(
            compiler,
            CallTarget::Function(mangled),
            &ret,
            Some(this.addr),
            &values,
        );
    }

    // A field holding a callable.
    let class_ty = object
        .ty
        .pointee_class()
        .cloned()
        .or_else(|| object.ty.is_class_like().then(|| object.ty.clone()));
    if let Some(class_ty) = class_ty
        && compiler.registry.field_of(&class_ty, name).is_some()
    {
        let callee = Expr::Member(member);
        let value = compiler.compile_value(&callee)?;
        return call_value(compiler, value, args, span);
    }

    Err(CompilationError::UnknownMethod {
        method: name.to_string(),
        type_name: compiler.type_name(&object.ty),
        span: member.member.span,
    })
}

/// `Class::method(args)`: static dispatch to the implementation `Class`
/// sees. Inside a method of a subclass the receiver is `this`; elsewhere
/// it is the first argument.
fn compile_scoped_call<'ast>(
    compiler: &mut AstCompiler<'ast>,
    scoped: &ScopedExpr<'ast>,
    args: &'ast [Expr<'ast>],
    span: Span,
) -> Result<ExprValue> {
    let class_ty = compiler.resolve_class_type(&scoped.class)?;
    let name = scoped.member.name;
    if compiler.registry.methods_of(&class_ty, name).is_empty() {
        return Err(unknown_method(compiler, &class_ty, name, scoped.member.span));
    }

    let implicit_this = compiler
        .env
        .enclosing_class()
        .and_then(Type::class_hash)
        .zip(class_ty.class_hash())
        .is_some_and(|(current, target)| compiler.registry.is_subclass(current, target));

    let (receiver, rest) = if implicit_this {
        let this = compiler.this_binding(span)?;
        (this.address, args)
    } else {
        let [first, rest @ ..] = args else {
            return Err(CompilationError::ArgumentCountMismatch {
                name: format!("{}::{name}", compiler.type_name(&class_ty)),
                expected: 1,
                got: 0,
                span,
            });
        };
        let value = compiler.compile_value(first)?;
        let value = compiler.coerce(value, &class_ty.clone().pointer_to(), first.span())?;
        (value.addr, rest)
    };

    let values = compile_args(compiler, rest)?;
    let selected = select_method(compiler, &class_ty, name, &values, span)?;
    let values = coerce_args(compiler, values, &selected.params, rest)?;
    let ret = method_ret(compiler, &class_ty, name, selected.key);
    let function = implementation(compiler, &class_ty, name, selected.key, span)?;
    let mangled = compiler.registry.get_function(function)?.mangled.clone();
    emit_call(
        compiler,
        CallTarget::Function(mangled),
        &ret,
        Some(receiver),
        &values,
    )
}

/// `Class::method` as a value: the address of the implementation `Class`
/// sees, callable with an explicit receiver.
pub fn compile_scoped_value<'ast>(
    compiler: &mut AstCompiler<'ast>,
    scoped: &ScopedExpr<'ast>,
) -> Result<ExprValue> {
    let class_ty = compiler.resolve_class_type(&scoped.class)?;
    let name = scoped.member.name;
    let ranks = compiler.registry.methods_of(&class_ty, name);
    let rank = match ranks.as_slice() {
        [] => return Err(unknown_method(compiler, &class_ty, name, scoped.member.span)),
        [rank] => rank.clone(),
        _ => {
            return Err(CompilationError::type_error(
                format!("cannot take the address of overloaded method '{name}'"),
                scoped.span,
            ));
        }
    };
    let function = implementation(compiler, &class_ty, name, rank.slot, scoped.span)?;
    let mangled = compiler.registry.get_function(function)?.mangled.clone();

    let mut params = Vec::with_capacity(rank.signature.len() + 1);
    params.push(class_ty.pointer_to());
    params.extend(rank.signature);
    let ty = Type::Callable(Box::new(CallableType {
        params,
        ret: rank.ret,
        kind: CallableKind::Method,
    }));
    let dst = compiler.frame.alloc(compiler.pointer_size());
    compiler.frame.emit(Instr::FnAddr {
        dst,
        function: mangled,
    });
    Ok(ExprValue::new(ty, dst))
}

/// Call through a callable value. A method value takes its receiver as the
/// first argument.
fn call_value<'ast>(
    compiler: &mut AstCompiler<'ast>,
    callee: ExprValue,
    args: &'ast [Expr<'ast>],
    span: Span,
) -> Result<ExprValue> {
    let Type::Callable(callable) = &callee.ty else {
        return Err(CompilationError::type_error(
            format!("'{}' is not callable", compiler.type_name(&callee.ty)),
            span,
        ));
    };
    let callable = (**callable).clone();
    let values = compile_args(compiler, args)?;
    let candidates = [Candidate {
        key: (),
        params: callable.params.clone(),
    }];
    let selected = select(compiler, "function value", &candidates, &values, span)?;
    let values = coerce_args(compiler, values, &selected.params, args)?;
    emit_call(
        compiler,
        CallTarget::Pointer(callee.addr),
        &callable.ret,
        None,
        &values,
    )
}

// ============================================================================
// Intrinsics
// ============================================================================

fn compile_intrinsic<'ast>(
    compiler: &mut AstCompiler<'ast>,
    intrinsic: Intrinsic,
    call: &CallExpr<'ast>,
) -> Result<ExprValue> {
    let [operand] = call.args else {
        return Err(CompilationError::ArgumentCountMismatch {
            name: intrinsic.name().to_string(),
            expected: 1,
            got: call.args.len(),
            span: call.span,
        });
    };

    match intrinsic {
        Intrinsic::SizeOf => {
            let ty = match operand {
                Expr::Ident(ident) => match compiler.env.lookup(ident.name).map(|e| &e.symbol) {
                    Some(Symbol::Class(hash)) => Type::Class(*hash),
                    Some(Symbol::TypeParam(ty)) => ty.clone(),
                    _ => compiler.probe_type(operand)?,
                },
                _ => compiler.probe_type(operand)?,
            };
            let len = compiler.length_of(&ty);
            let addr = compiler.literals.int(i64::from(len));
            Ok(ExprValue::new(Type::INT, addr))
        }
        Intrinsic::Len => {
            let array = compiler.compile_value(operand)?;
            if array.ty.element().is_none() {
                return Err(CompilationError::type_error(
                    format!("len() expects an array, got '{}'", compiler.type_name(&array.ty)),
                    operand.span(),
                ));
            }
            let dst = compiler.frame.alloc(Primitive::Int.size());
            let reg = compiler.frame.acquire_reg()?;
            compiler.frame.emit(Instr::Ptr {
                reg,
                src: array.addr,
            });
            compiler.frame.emit(Instr::Load {
                dst,
                src: Mem::new(reg, 0),
                len: Primitive::Int.size(),
            });
            compiler.frame.release_reg(reg);
            Ok(ExprValue::new(Type::INT, dst))
        }
    }
}

// ============================================================================
// Arguments and overloads
// ============================================================================

pub(crate) fn compile_args<'ast>(
    compiler: &mut AstCompiler<'ast>,
    args: &[Expr<'ast>],
) -> Result<Vec<ExprValue>> {
    args.iter().map(|arg| compiler.compile_value(arg)).collect()
}

/// Convert each argument to its parameter type, warning on weak conversions.
pub(crate) fn coerce_args(
    compiler: &mut AstCompiler<'_>,
    args: Vec<ExprValue>,
    params: &[Type],
    exprs: &[Expr<'_>],
) -> Result<Vec<ExprValue>> {
    args.into_iter()
        .zip(params)
        .zip(exprs)
        .map(|((arg, param), expr)| compiler.coerce(arg, param, expr.span()))
        .collect()
}

fn function_candidates(
    compiler: &AstCompiler<'_>,
    ids: &[FunctionId],
) -> Result<Vec<Candidate<FunctionId>>> {
    ids.iter()
        .map(|id| {
            let sig = compiler.registry.get_function(*id)?;
            Ok(Candidate {
                key: *id,
                params: sig.params.clone(),
            })
        })
        .collect()
}

fn select<K: Clone>(
    compiler: &AstCompiler<'_>,
    name: &str,
    candidates: &[Candidate<K>],
    args: &[ExprValue],
    span: Span,
) -> Result<OverloadMatch<K>> {
    let types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
    resolve_overload(&compiler.registry, name, candidates, &types, span)
}

/// Resolve `name` among the dispatch slots visible on `class_ty`; the key
/// of the match is the slot.
pub(crate) fn select_method(
    compiler: &AstCompiler<'_>,
    class_ty: &Type,
    name: &str,
    args: &[ExprValue],
    span: Span,
) -> Result<OverloadMatch<u32>> {
    let candidates: Vec<Candidate<u32>> = compiler
        .registry
        .methods_of(class_ty, name)
        .into_iter()
        .map(|rank| Candidate {
            key: rank.slot,
            params: rank.signature,
        })
        .collect();
    if candidates.is_empty() {
        return Err(unknown_method(compiler, class_ty, name, span));
    }
    let qualified = format!("{}.{name}", compiler.type_name(class_ty));
    select(compiler, &qualified, &candidates, args, span)
}

fn method_ret(compiler: &AstCompiler<'_>, class_ty: &Type, name: &str, slot: u32) -> Type {
    compiler
        .registry
        .methods_of(class_ty, name)
        .into_iter()
        .find(|rank| rank.slot == slot)
        .map_or(Type::VOID, |rank| rank.ret)
}

/// The function bound to `slot` in the vtable of `class_ty`.
pub(crate) fn implementation(
    compiler: &AstCompiler<'_>,
    class_ty: &Type,
    name: &str,
    slot: u32,
    span: Span,
) -> Result<FunctionId> {
    let hash = class_ty
        .class_hash()
        .ok_or_else(|| CompilationError::internal("static call on a non-class type"))?;
    let class = compiler.registry.get_class(hash)?;
    match class.implementation(slot) {
        Some(Some(function)) => Ok(function),
        Some(None) => Err(CompilationError::other(
            format!("cannot call abstract method '{}::{name}'", class.name),
            span,
        )),
        None => Err(CompilationError::internal(format!(
            "slot {slot} missing from the vtable of '{}'",
            class.name
        ))),
    }
}

fn unknown_method(compiler: &AstCompiler<'_>, class_ty: &Type, name: &str, span: Span) -> CompilationError {
    CompilationError::UnknownMethod {
        method: name.to_string(),
        type_name: compiler.type_name(class_ty),
        span,
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;
    use crate::test_utils::{code, compiler_with};
    use crate::types::ARRAY_HEADER_LEN;

    #[test]
    fn native_call_lays_out_region() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("n", Type::INT)]);
        compiler
            .env
            .define("print_int", Symbol::Native(Native::PrintInt), Span::default())
            .unwrap();
        let value = compiler
            .compile_expr(&b.call_named("print_int", vec![b.name("n")]))
            .unwrap();
        assert_eq!(value.ty, Type::VOID);
        assert_eq!(code(&compiler), vec!["mov $8, $0, #8", "call_native #0, $8"]);
    }

    #[test]
    fn unrequired_native_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        let err = compiler
            .compile_expr(&b.call_named("clock", vec![]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::NativeNotRequired { .. }));
    }

    #[test]
    fn sizeof_is_a_literal() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::CHAR)]);
        let value = compiler
            .compile_expr(&b.call_named("sizeof", vec![b.name("c")]))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert!(matches!(value.addr, Address::Literal(_)));
        assert!(code(&compiler).is_empty());
        assert_eq!(compiler.literals.bytes(), &1i64.to_le_bytes());
    }

    #[test]
    fn len_reads_header_word() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("xs", Type::FLOAT.array_of())]);
        let value = compiler
            .compile_expr(&b.call_named("len", vec![b.name("xs")]))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(code(&compiler), vec!["ptr %r0, $0", "load $8, [%r0+0], #8"]);

        // Elements start past the header word that holds the count.
        compiler
            .compile_expr(&b.index(b.name("xs"), b.int(0)))
            .unwrap();
        let text = code(&compiler);
        assert!(text.contains(&"index %r0, &0, #8, +8".to_string()));
        assert_eq!(ARRAY_HEADER_LEN, Primitive::Int.size());
    }

    #[test]
    fn intrinsic_arity() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        let err = compiler
            .compile_expr(&b.call_named("len", vec![]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::ArgumentCountMismatch { .. }));
    }

    #[test]
    fn calling_a_non_callable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("x", Type::INT)]);
        let err = compiler
            .compile_expr(&b.call_named("x", vec![]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn function_pointer_call() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let callable = Type::Callable(Box::new(CallableType {
            params: vec![Type::FLOAT],
            ret: Type::INT,
            kind: CallableKind::Func,
        }));
        let mut compiler = compiler_with(&[("f", callable)]);
        let value = compiler
            .compile_expr(&b.call_named("f", vec![b.int(2)]))
            .unwrap();
        assert_eq!(value.ty, Type::INT);
        assert_eq!(
            code(&compiler),
            vec![
                "i2f $8, &0",
                "mov $24, $8, #8",
                "ptr %r0, $0",
                "call_ptr %r0, $16",
            ]
        );
    }
}
