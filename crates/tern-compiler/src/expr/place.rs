//! Names, places and memory access.
//!
//! A [`Place`] is either a slot known at compile time or a displacement from
//! a pointer held in a slot. Reading an indirect place copies its bytes into
//! a slot; writing one stores through the pointer.

use tern_ast::{Expr, Ident, IndexExpr, MemberExpr, UnaryOp};
use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::env::Symbol;
use crate::expr_info::{Dest, ExprValue, Location, Place};
use crate::frame::{Instr, Mem};
use crate::types::{ARRAY_HEADER_LEN, FunctionOwner, Type};

/// A name used as a value.
pub fn compile_ident<'ast>(compiler: &mut AstCompiler<'ast>, ident: &Ident<'ast>) -> Result<ExprValue> {
    match compiler.lookup_symbol(ident.name, ident.span)? {
        Symbol::Variable(binding) => Ok(ExprValue::new(binding.ty, binding.address)),
        Symbol::Functions(ids) => function_value(compiler, ident.name, &ids, ident.span),
        Symbol::Class(_) | Symbol::TypeParam(_) => Err(CompilationError::type_error(
            format!("'{}' is a type, not a value", ident.name),
            ident.span,
        )),
        Symbol::Native(_) | Symbol::Intrinsic(_) => Err(CompilationError::type_error(
            format!("'{}' can only be called", ident.name),
            ident.span,
        )),
    }
}

/// The address of a free function, which must not be overloaded.
fn function_value(
    compiler: &mut AstCompiler<'_>,
    name: &str,
    ids: &[u32],
    span: Span,
) -> Result<ExprValue> {
    let [id] = ids else {
        return Err(CompilationError::type_error(
            format!("cannot take the address of overloaded function '{name}'"),
            span,
        ));
    };
    let sig = compiler.registry.get_function(*id)?;
    debug_assert!(matches!(sig.owner, FunctionOwner::Module(_)));
    let ty = sig.callable_type();
    let function = sig.mangled.clone();
    let dst = compiler.frame.alloc(compiler.pointer_size());
    compiler.frame.emit(Instr::FnAddr { dst, function });
    Ok(ExprValue::new(ty, dst))
}

impl<'ast> AstCompiler<'ast> {
    /// Compile an expression as a place. Expressions that are not places
    /// are evaluated into a temporary.
    pub(crate) fn compile_place(&mut self, expr: &Expr<'ast>) -> Result<Place> {
        match expr {
            Expr::Ident(ident) => match self.lookup_symbol(ident.name, ident.span)? {
                Symbol::Variable(binding) => Ok(Place {
                    ty: binding.ty,
                    loc: Location::Static(binding.address),
                    is_const: binding.is_const,
                    name: Some(ident.name.to_string()),
                }),
                _ => {
                    let value = compile_ident(self, ident)?;
                    Ok(Place::new(value.ty, Location::Static(value.addr)))
                }
            },
            Expr::This(span) => {
                let binding = self.this_binding(*span)?;
                Ok(Place {
                    ty: binding.ty,
                    loc: Location::Static(binding.address),
                    is_const: true,
                    name: Some("this".to_string()),
                })
            }
            Expr::Unary(unary) if unary.op == UnaryOp::Deref => self.deref_place(unary.operand),
            Expr::Member(member) => self.member_place(member),
            Expr::Index(index) => self.index_place(index),
            _ => {
                let value = self.compile_expr(expr)?;
                Ok(Place::new(value.ty, Location::Static(value.addr)))
            }
        }
    }

    pub(crate) fn deref_place(&mut self, operand: &Expr<'ast>) -> Result<Place> {
        let pointer = self.compile_expr(operand)?;
        match &pointer.ty {
            Type::Pointer(inner) if !inner.is_void() => Ok(Place::new(
                (**inner).clone(),
                Location::Indirect {
                    ptr: pointer.addr,
                    offset: 0,
                },
            )),
            other => Err(CompilationError::type_error(
                format!("cannot dereference '{}'", self.type_name(other)),
                operand.span(),
            )),
        }
    }

    fn member_place(&mut self, member: &MemberExpr<'ast>) -> Result<Place> {
        let object = self.compile_place(member.object)?;
        let name = member.member.name;

        if object.ty.is_class_like() {
            let (offset, ty) = self.field(&object.ty, name, member.member.span)?;
            let mut place = object.field(ty, offset);
            place.is_const = object.is_const;
            place.name = object.name.clone();
            return Ok(place);
        }

        if let Some(class) = object.ty.pointee_class().cloned() {
            let (offset, ty) = self.field(&class, name, member.member.span)?;
            let pointer = self.read_place(&object, None)?;
            return Ok(Place::new(
                ty,
                Location::Indirect {
                    ptr: pointer.addr,
                    offset,
                },
            ));
        }

        Err(CompilationError::UnknownField {
            field: name.to_string(),
            type_name: self.type_name(&object.ty),
            span: member.member.span,
        })
    }

    fn index_place(&mut self, index: &IndexExpr<'ast>) -> Result<Place> {
        let array = self.compile_expr(index.object)?;
        let Some(element) = array.ty.element().cloned() else {
            return Err(CompilationError::type_error(
                format!("cannot index '{}'", self.type_name(&array.ty)),
                index.object.span(),
            ));
        };
        let position = self.compile_expr(index.index)?;
        if !position.ty.is_integral() {
            return Err(CompilationError::type_error(
                format!("array index must be an integer, not '{}'", self.type_name(&position.ty)),
                index.index.span(),
            ));
        }
        let position = self.coerce(position, &Type::INT, index.index.span())?;

        let elem = self.length_of(&element);
        let reg = self.frame.acquire_reg()?;
        self.frame.emit(Instr::Ptr { reg, src: array.addr });
        self.frame.emit(Instr::Index {
            reg,
            index: position.addr,
            elem,
            header: ARRAY_HEADER_LEN,
        });
        let slot = self.spill_pointer(reg);
        self.frame.release_reg(reg);
        Ok(Place::new(element, Location::Indirect { ptr: slot, offset: 0 }))
    }

    /// Offset and type of field `name` on a class-like type.
    pub(crate) fn field(&self, class: &Type, name: &str, span: Span) -> Result<(u32, Type)> {
        self.registry
            .field_of(class, name)
            .ok_or_else(|| CompilationError::UnknownField {
                field: name.to_string(),
                type_name: self.type_name(class),
                span,
            })
    }

    /// A pointer to `place`.
    pub(crate) fn address_of_place(&mut self, place: &Place, dest: Option<&Dest>) -> Result<ExprValue> {
        let reg = self.frame.acquire_reg()?;
        match place.loc {
            Location::Static(addr) => self.frame.emit(Instr::Addr { reg, src: addr }),
            Location::Indirect { ptr, offset } => {
                self.frame.emit(Instr::Ptr { reg, src: ptr });
                if offset > 0 {
                    self.frame.emit(Instr::Offset {
                        reg,
                        amount: offset,
                    });
                }
            }
        }
        let ty = place.ty.clone().pointer_to();
        let dst = self.result_slot(&ty, dest);
        self.frame.emit(Instr::SetPtr { dst, reg });
        self.frame.release_reg(reg);
        Ok(ExprValue::new(ty, dst))
    }

    /// The value stored in `place`.
    pub(crate) fn read_place(&mut self, place: &Place, dest: Option<&Dest>) -> Result<ExprValue> {
        match place.loc {
            Location::Static(addr) => Ok(ExprValue::new(place.ty.clone(), addr)),
            Location::Indirect { ptr, offset } => {
                let dst = self.result_slot(&place.ty, dest);
                let len = self.length_of(&place.ty);
                let reg = self.frame.acquire_reg()?;
                self.frame.emit(Instr::Ptr { reg, src: ptr });
                self.frame.emit(Instr::Load {
                    dst,
                    src: Mem::new(reg, offset),
                    len,
                });
                self.frame.release_reg(reg);
                Ok(ExprValue::new(place.ty.clone(), dst))
            }
        }
    }

    /// Store `value` into `place`; the result is the stored value.
    pub(crate) fn write_place(&mut self, place: &Place, value: &Expr<'ast>, span: Span) -> Result<ExprValue> {
        if place.is_const {
            return Err(CompilationError::AssignToConst {
                name: place.name.clone().unwrap_or_else(|| "value".to_string()),
                span,
            });
        }
        match place.loc {
            Location::Static(addr) => {
                self.compile_into(value, addr, &place.ty)?;
                Ok(ExprValue::new(place.ty.clone(), addr))
            }
            Location::Indirect { ptr, offset } => {
                let stored = self.compile_value(value)?;
                let stored = self.coerce(stored, &place.ty, value.span())?;
                let len = self.length_of(&place.ty);
                let reg = self.frame.acquire_reg()?;
                self.frame.emit(Instr::Ptr { reg, src: ptr });
                self.frame.emit(Instr::Store {
                    dst: Mem::new(reg, offset),
                    src: stored.addr,
                    len,
                });
                self.frame.release_reg(reg);
                Ok(stored)
            }
        }
    }
}
