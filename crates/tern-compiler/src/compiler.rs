//! The AST compiler: state shared by every compile call.
//!
//! [`AstCompiler`] owns the Type Registry, the Environment, the Frame Manager
//! and the output buffers of one compilation. The lowering of each node form
//! lives in [`crate::expr`] and [`crate::stmt`]; the two passes that drive
//! it live in [`crate::passes`].
//!
//! Scope entry and exit go through [`AstCompiler::scoped`], which restores
//! the stack pointer and pops the environment on every exit path, errors
//! included.

use rustc_hash::FxHashMap;
use tern_ast::{Expr, FunctionDecl, TypeExpr, TypeExprKind};
use tern_core::{CompilationError, CompileWarning, Span, TypeHash};

use crate::class::OBJECT_NAME;
use crate::env::{Binding, Environment, Scope, ScopeKind, Symbol};
use crate::expr_info::ExprValue;
use crate::frame::{Address, ConvertOp, FrameManager, Instr, Output};
use crate::literals::LiteralPool;
use crate::natives::{Intrinsic, Native};
use crate::options::CompilerOptions;
use crate::types::conversion::upcast_distance;
use crate::types::{
    CallableKind, CallableType, Conversion, ConversionKind, FunctionId, Primitive, Type,
    TypeRegistry, find_conversion,
};

pub(crate) type Result<T> = std::result::Result<T, CompilationError>;

/// A function body waiting for pass 2.
#[derive(Debug, Clone)]
pub struct FunctionBody<'ast> {
    pub decl: &'ast FunctionDecl<'ast>,
    /// Owning class for methods.
    pub class: Option<TypeHash>,
    /// Defining module path.
    pub path: String,
}

/// A global variable and its initializer, emitted in the entry section.
#[derive(Debug, Clone)]
pub struct GlobalInit<'ast> {
    pub name: String,
    pub address: Address,
    pub ty: Type,
    pub init: Option<Expr<'ast>>,
    pub path: String,
    pub span: Span,
}

/// Compiles one program.
pub struct AstCompiler<'ast> {
    pub(crate) options: CompilerOptions,
    pub(crate) registry: TypeRegistry,
    pub(crate) env: Environment,
    pub(crate) frame: FrameManager,
    pub(crate) output: Output,
    pub(crate) literals: LiteralPool,
    pub(crate) warnings: Vec<CompileWarning>,
    /// Warnings are dropped while non-zero (type probes).
    suppress_warnings: u32,
    /// Path of the module being compiled.
    pub(crate) path: String,
    module_scopes: FxHashMap<String, Scope>,
    pub(crate) bodies: FxHashMap<FunctionId, FunctionBody<'ast>>,
    pub(crate) globals: Vec<GlobalInit<'ast>>,
    /// While set, template bounds are recorded instead of checked; class
    /// hierarchies are not linearized yet.
    pub(crate) defer_bounds: bool,
    pub(crate) deferred_bounds: Vec<DeferredBound>,
    /// Module being compiled when the first error was raised.
    pub(crate) failed_path: Option<String>,
}

/// A template argument whose bound is checked once every MRO is known.
#[derive(Debug, Clone)]
pub struct DeferredBound {
    pub arg: Type,
    pub bound: Type,
    pub param: String,
    pub class: String,
    /// Module the argument was written in.
    pub path: String,
    pub span: Span,
}

impl<'ast> AstCompiler<'ast> {
    pub fn new(options: CompilerOptions) -> Result<Self> {
        options.validate()?;
        let registry = TypeRegistry::new(options.pointer_size());
        let mut env = Environment::new();
        env.define(OBJECT_NAME, Symbol::Class(registry.object()), Span::default())?;
        for intrinsic in Intrinsic::ALL {
            env.define(intrinsic.name(), Symbol::Intrinsic(intrinsic), Span::default())?;
        }
        let frame = FrameManager::new(options.register_count);
        Ok(Self {
            options,
            registry,
            env,
            frame,
            output: Output::new(),
            literals: LiteralPool::new(),
            warnings: Vec::new(),
            suppress_warnings: 0,
            path: String::new(),
            module_scopes: FxHashMap::default(),
            bodies: FxHashMap::default(),
            globals: Vec::new(),
            defer_bounds: false,
            deferred_bounds: Vec::new(),
            failed_path: None,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn pointer_size(&self) -> u32 {
        self.registry.pointer_size()
    }

    pub(crate) fn type_name(&self, ty: &Type) -> String {
        self.registry.type_name(ty)
    }

    pub(crate) fn length_of(&self, ty: &Type) -> u32 {
        self.registry.memory_length(ty)
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    /// Run `f` inside the module scope of `path`, creating it on first use.
    pub(crate) fn in_module<T>(
        &mut self,
        path: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let scope = self
            .module_scopes
            .remove(path)
            .unwrap_or_else(|| Scope::new(ScopeKind::Module { path: path.to_string() }));
        let depth = self.env.depth();
        self.env.push_scope(scope);
        let previous = std::mem::replace(&mut self.path, path.to_string());

        let result = f(self);
        if result.is_err() && self.failed_path.is_none() {
            self.failed_path = Some(path.to_string());
        }

        self.env.truncate(depth + 1);
        let scope = self.env.pop()?;
        self.module_scopes.insert(path.to_string(), scope);
        self.path = previous;
        result
    }

    /// Run `f` in a new scope of `kind` with its own stack block.
    pub(crate) fn scoped<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let depth = self.env.depth();
        self.env.push(kind);
        let checkpoint = self.frame.push_block();

        let result = f(self);

        self.frame.restore(checkpoint)?;
        self.env.truncate(depth);
        result
    }

    /// Run `f` and release every temporary it allocated.
    pub(crate) fn with_temps<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.frame.push_block();
        let result = f(self);
        self.frame.restore(checkpoint)?;
        result
    }

    /// Define a top-level name in the current module and export it.
    pub(crate) fn define_top_level(&mut self, name: &str, symbol: Symbol, span: Span) -> Result<()> {
        self.env.define(name, symbol.clone(), span)?;
        self.env.define_global(name, symbol, span)
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    pub(crate) fn warn(&mut self, span: Span, message: impl Into<String>) {
        if self.suppress_warnings > 0 {
            return;
        }
        let message = message.into();
        tracing::warn!(path = %self.path, %span, "{message}");
        self.warnings.push(CompileWarning {
            path: self.path.clone(),
            span,
            message,
        });
    }

    /// Static type of `expr` without keeping any code it generates.
    pub(crate) fn probe_type(&mut self, expr: &Expr<'ast>) -> Result<Type> {
        let checkpoint = self.frame.push_block();
        let code_len = self.frame.code_len();
        self.suppress_warnings += 1;

        let result = self.compile_expr(expr);

        self.suppress_warnings -= 1;
        self.frame.truncate_code(code_len);
        self.frame.restore(checkpoint)?;
        result.map(|value| value.ty)
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    /// Resolve a name, reporting unrequired natives specially.
    pub(crate) fn lookup_symbol(&self, name: &str, span: Span) -> Result<Symbol> {
        match self.env.lookup(name) {
            Some(entry) => Ok(entry.symbol.clone()),
            None if Native::from_name(name).is_some() => Err(CompilationError::NativeNotRequired {
                name: name.to_string(),
                span,
            }),
            None => Err(CompilationError::UnknownName {
                name: name.to_string(),
                span,
            }),
        }
    }

    /// Fail unless the current module required `native`.
    pub(crate) fn require_native(&self, native: Native, span: Span) -> Result<()> {
        match self.env.lookup(native.name()) {
            Some(entry) if entry.symbol == Symbol::Native(native) => Ok(()),
            _ => Err(CompilationError::NativeNotRequired {
                name: native.name().to_string(),
                span,
            }),
        }
    }

    /// The `this` binding of the enclosing method.
    pub(crate) fn this_binding(&self, span: Span) -> Result<Binding> {
        let outside = CompilationError::OutsideOf {
            construct: "this",
            context: "a method",
            span,
        };
        if self.env.enclosing_class().is_none() {
            return Err(outside);
        }
        match self.env.lookup("this") {
            Some(entry) => match &entry.symbol {
                Symbol::Variable(binding) => Ok(binding.clone()),
                _ => Err(outside),
            },
            None => Err(outside),
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Resolve a type expression in the current scope.
    pub(crate) fn resolve_type(&mut self, expr: &TypeExpr<'_>) -> Result<Type> {
        match expr.kind {
            TypeExprKind::Named { name, args } => {
                if let Some(primitive) = Primitive::from_name(name) {
                    if !args.is_empty() {
                        return Err(CompilationError::type_error(
                            format!("'{name}' takes no template arguments"),
                            expr.span,
                        ));
                    }
                    return Ok(Type::Primitive(primitive));
                }
                let symbol = self.env.lookup(name).map(|entry| entry.symbol.clone());
                match symbol {
                    Some(Symbol::Class(hash)) => self.instantiate(hash, args, expr.span),
                    Some(Symbol::TypeParam(ty)) if args.is_empty() => Ok(ty),
                    Some(_) => Err(CompilationError::type_error(
                        format!("'{expr}' is not a type"),
                        expr.span,
                    )),
                    None => Err(CompilationError::UnknownType {
                        name: name.to_string(),
                        span: expr.span,
                    }),
                }
            }
            TypeExprKind::Pointer(inner) => Ok(self.resolve_type(inner)?.pointer_to()),
            TypeExprKind::Array(inner) => Ok(self.resolve_type(inner)?.array_of()),
            TypeExprKind::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p))
                    .collect::<Result<Vec<_>>>()?;
                let ret = self.resolve_type(ret)?;
                Ok(Type::Callable(Box::new(CallableType {
                    params,
                    ret,
                    kind: CallableKind::Func,
                })))
            }
        }
    }

    /// Resolve a type expression that must name a class.
    pub(crate) fn resolve_class_type(&mut self, expr: &TypeExpr<'_>) -> Result<Type> {
        let ty = self.resolve_type(expr)?;
        if matches!(ty, Type::Class(_) | Type::GenericClass { .. }) {
            Ok(ty)
        } else {
            Err(CompilationError::type_error(
                format!("'{}' is not a class", self.type_name(&ty)),
                expr.span,
            ))
        }
    }

    /// `Name<args>`; a generic class named without arguments leaves its
    /// parameters unbound.
    fn instantiate(&mut self, hash: TypeHash, args: &[TypeExpr<'_>], span: Span) -> Result<Type> {
        if args.is_empty() {
            return Ok(Type::Class(hash));
        }
        let class = self.registry.get_class(hash)?;
        let params = class.template_params.clone();
        let class_name = class.name.clone();
        if params.len() != args.len() {
            return Err(CompilationError::type_error(
                format!(
                    "'{class_name}' expects {} template argument(s), got {}",
                    params.len(),
                    args.len()
                ),
                span,
            ));
        }

        let mut bindings = Vec::with_capacity(args.len());
        for (param, arg) in params.iter().zip(args) {
            let ty = self.resolve_type(arg)?;
            let check = DeferredBound {
                arg: ty.clone(),
                bound: Type::Class(param.bound),
                param: param.name.clone(),
                class: class_name.clone(),
                path: self.path.clone(),
                span: arg.span,
            };
            if self.defer_bounds {
                self.deferred_bounds.push(check);
            } else {
                self.check_bound(&check)?;
            }
            bindings.push(ty);
        }
        Ok(Type::GenericClass {
            base: hash,
            bindings,
        })
    }

    pub(crate) fn check_bound(&self, check: &DeferredBound) -> Result<()> {
        if check.arg.is_class_like()
            && upcast_distance(&self.registry, &check.arg, &check.bound).is_some()
        {
            return Ok(());
        }
        Err(CompilationError::type_error(
            format!(
                "'{}' does not satisfy the bound '{}' of '{}' in '{}'",
                self.type_name(&check.arg),
                self.type_name(&check.bound),
                check.param,
                check.class
            ),
            check.span,
        ))
    }

    /// Runtime class id of a class-like type.
    pub(crate) fn class_id(&self, ty: &Type) -> Result<u32> {
        let hash = ty
            .class_hash()
            .ok_or_else(|| CompilationError::internal("class id of a non-class type"))?;
        Ok(self.registry.get_class(hash)?.id)
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    /// The conversion from `from` to `to`, warning when it is weak.
    pub(crate) fn check_conversion(&mut self, from: &Type, to: &Type, span: Span) -> Result<Conversion> {
        let Some(conversion) = find_conversion(&self.registry, from, to) else {
            return Err(CompilationError::InvalidConversion {
                from: self.type_name(from),
                to: self.type_name(to),
                span,
            });
        };
        if !conversion.is_strong {
            let message = format!(
                "implicit conversion from '{}' to '{}'",
                self.type_name(from),
                self.type_name(to)
            );
            self.warn(span, message);
        }
        Ok(conversion)
    }

    /// Whether `from` converts to `to`, warning when only weakly.
    pub(crate) fn convertible_to(&mut self, from: &Type, to: &Type, span: Span) -> bool {
        self.check_conversion(from, to, span).is_ok()
    }

    /// Convert `value` into `dst`, which holds a `to`.
    pub(crate) fn convert_into(
        &mut self,
        value: &ExprValue,
        to: &Type,
        dst: Address,
        conversion: Conversion,
    ) -> Result<()> {
        let from_len = self.length_of(&value.ty);
        let to_len = self.length_of(to);
        match conversion.kind {
            ConversionKind::Identity | ConversionKind::CharByte => {
                self.mov(dst, value.addr, to_len);
            }
            ConversionKind::IntWiden => self.convert(ConvertOp::C2I, dst, value.addr),
            ConversionKind::IntToFloat => {
                if value.ty.is_integral() && !matches!(value.ty, Type::Primitive(Primitive::Int)) {
                    self.convert(ConvertOp::C2I, dst, value.addr);
                    self.convert(ConvertOp::I2F, dst, dst);
                } else {
                    self.convert(ConvertOp::I2F, dst, value.addr);
                }
            }
            ConversionKind::IntNarrow => self.convert(ConvertOp::I2C, dst, value.addr),
            ConversionKind::FloatToInt => {
                if to_len == Primitive::Int.size() {
                    self.convert(ConvertOp::F2I, dst, value.addr);
                } else {
                    let wide = self.frame.alloc(Primitive::Int.size());
                    self.convert(ConvertOp::F2I, wide, value.addr);
                    self.convert(ConvertOp::I2C, dst, wide);
                }
            }
            ConversionKind::Upcast
            | ConversionKind::CallableVariance
            | ConversionKind::ToVoidPointer
            | ConversionKind::FromVoidPointer
            | ConversionKind::PointerToInt
            | ConversionKind::IntToPointer => self.copy_bits(dst, value.addr, from_len, to_len),
        }
        Ok(())
    }

    /// Copy the same bits into a slot of a possibly different width; a
    /// wider destination is zero-filled first.
    pub(crate) fn copy_bits(&mut self, dst: Address, src: Address, from_len: u32, to_len: u32) {
        if to_len > from_len {
            self.frame.emit(Instr::Imm {
                dst,
                value: 0,
                len: to_len,
            });
        }
        self.mov(dst, src, from_len.min(to_len));
    }

    /// `value` as a `to`, converted into a temporary when needed.
    pub(crate) fn coerce(&mut self, value: ExprValue, to: &Type, span: Span) -> Result<ExprValue> {
        let conversion = self.check_conversion(&value.ty, to, span)?;
        if conversion.is_exact() {
            return Ok(value);
        }
        let dst = self.frame.alloc(self.length_of(to));
        self.convert_into(&value, to, dst, conversion)?;
        Ok(ExprValue::new(to.clone(), dst))
    }

    /// Pointer-like bits as an 8-byte integer, without a warning.
    pub(crate) fn as_word(&mut self, value: ExprValue) -> ExprValue {
        let len = self.length_of(&value.ty);
        if len == Primitive::Int.size() {
            return ExprValue::new(Type::INT, value.addr);
        }
        let dst = self.frame.alloc(Primitive::Int.size());
        self.frame.emit(Instr::Imm {
            dst,
            value: 0,
            len: Primitive::Int.size(),
        });
        self.mov(dst, value.addr, len);
        ExprValue::new(Type::INT, dst)
    }

    /// Compile a condition to an `int` slot.
    pub(crate) fn condition(&mut self, expr: &Expr<'ast>) -> Result<Address> {
        let value = self.compile_expr(expr)?;
        if value.ty.is_void() {
            return Err(CompilationError::type_error(
                "condition has no value",
                expr.span(),
            ));
        }
        Ok(self.coerce(value, &Type::INT, expr.span())?.addr)
    }

    // ==========================================================================
    // Emission helpers
    // ==========================================================================

    pub(crate) fn mov(&mut self, dst: Address, src: Address, len: u32) {
        if dst != src && len > 0 {
            self.frame.emit(Instr::Mov { dst, src, len });
        }
    }

    fn convert(&mut self, op: ConvertOp, dst: Address, src: Address) {
        self.frame.emit(Instr::Convert { op, dst, src });
    }

    /// Write the class tag of the class value at `addr`.
    pub(crate) fn tag_class_value(&mut self, addr: Address, ty: &Type) -> Result<()> {
        let class_id = self.class_id(ty)?;
        let reg = self.frame.acquire_reg()?;
        self.frame.emit(Instr::Addr { reg, src: addr });
        self.frame.emit(Instr::SetTag { reg, class_id });
        self.frame.release_reg(reg);
        Ok(())
    }

    /// Store a register's pointer value in a fresh slot.
    pub(crate) fn spill_pointer(&mut self, reg: crate::frame::Register) -> Address {
        let slot = self.frame.alloc(self.pointer_size());
        self.frame.emit(Instr::SetPtr { dst: slot, reg });
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_are_predefined() {
        let compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        assert!(matches!(
            compiler.env.lookup("Object").map(|e| &e.symbol),
            Some(Symbol::Class(_))
        ));
        assert!(matches!(
            compiler.env.lookup("sizeof").map(|e| &e.symbol),
            Some(Symbol::Intrinsic(Intrinsic::SizeOf))
        ));
    }

    #[test]
    fn invalid_options_are_rejected() {
        assert!(AstCompiler::new(CompilerOptions::default().with_bits(12)).is_err());
    }

    #[test]
    fn scoped_restores_on_error() {
        let mut compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        let depth = compiler.env.depth();
        let result: Result<()> = compiler.scoped(ScopeKind::Block, |c| {
            c.frame.alloc(16);
            c.env
                .define_variable("x", Type::INT, Address::Local(0), false, Span::default())?;
            Err(CompilationError::other("boom", Span::default()))
        });
        assert!(result.is_err());
        assert_eq!(compiler.env.depth(), depth);
        assert_eq!(compiler.frame.sp(), 0);
        assert!(compiler.env.lookup("x").is_none());
    }

    #[test]
    fn weak_conversion_warns() {
        let mut compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        compiler
            .check_conversion(&Type::FLOAT, &Type::INT, Span::point(3, 1))
            .unwrap();
        assert_eq!(compiler.warnings.len(), 1);
        compiler
            .check_conversion(&Type::INT, &Type::FLOAT, Span::point(4, 1))
            .unwrap();
        assert_eq!(compiler.warnings.len(), 1);
    }

    #[test]
    fn char_to_float_goes_through_int() {
        let mut compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        let value = ExprValue::new(Type::CHAR, Address::Local(0));
        let converted = compiler.coerce(value, &Type::FLOAT, Span::default()).unwrap();
        assert_eq!(converted.addr, Address::Local(0));
        let text: Vec<String> = compiler.frame.code().iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["c2i $0, $0", "i2f $0, $0"]);
    }
}
