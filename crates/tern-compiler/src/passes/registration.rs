//! Registration Pass (Pass 1) - register every declaration before any body
//! is compiled.
//!
//! Each step runs over all modules before the next one starts:
//!
//! 1. `require`d natives and class names
//! 2. template bounds and direct bases
//! 3. MRO of every class, then the template bounds deferred by step 2
//! 4. inherited template bindings and field layout
//! 5. function and method signatures, in source order
//! 6. method tables and dispatch slots, bases before subclasses
//! 7. linkable names
//! 8. globals
//!
//! Bases and bounds may name classes declared later or in other modules,
//! which is why layout waits until every hierarchy is linearized.

use rustc_hash::{FxHashMap, FxHashSet};
use tern_ast::{ClassDecl, FunctionDecl, Item, Module, Program};
use tern_core::{CompilationError, Span, TypeHash};

use crate::class::{self, ClassType, FieldDecl, MethodDecl, MroError, TemplateParam};
use crate::compiler::{AstCompiler, FunctionBody, GlobalInit, Result};
use crate::env::{Binding, Entry, Symbol};
use crate::mangle;
use crate::natives::Native;
use crate::types::{FunctionId, FunctionOwner, FunctionSig, Type, substitute};

/// Output of the registration pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutput {
    pub classes_registered: usize,
    pub functions_registered: usize,
    pub globals_registered: usize,
}

/// A declared class awaiting the later registration steps.
#[derive(Debug, Clone, Copy)]
struct PendingClass<'ast> {
    hash: TypeHash,
    decl: &'ast ClassDecl<'ast>,
    path: &'ast str,
}

/// Pass 1: register classes, signatures and globals.
pub struct RegistrationPass<'a, 'ast> {
    compiler: &'a mut AstCompiler<'ast>,
    classes: Vec<PendingClass<'ast>>,
    functions_registered: usize,
    globals_registered: usize,
}

impl<'a, 'ast> RegistrationPass<'a, 'ast> {
    pub fn new(compiler: &'a mut AstCompiler<'ast>) -> Self {
        Self {
            compiler,
            classes: Vec::new(),
            functions_registered: 0,
            globals_registered: 0,
        }
    }

    /// Run the registration pass over every module of `program`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'ast>) -> Result<RegistrationOutput> {
        for module in program.modules {
            self.declare_module(module)?;
        }

        self.compiler.defer_bounds = true;
        let headers = self.resolve_headers();
        self.compiler.defer_bounds = false;
        headers?;

        self.linearize_all()?;
        for check in std::mem::take(&mut self.compiler.deferred_bounds) {
            let path = check.path.clone();
            self.compiler.in_module(&path, |c| c.check_bound(&check))?;
        }

        // An ancestor's MRO is strictly shorter than its descendants'.
        let mut order = self.classes.clone();
        order.sort_by_key(|pending| {
            self.compiler
                .registry
                .class(pending.hash)
                .map_or(0, |class| class.mro.len())
        });

        for pending in &order {
            self.inherit_bindings(pending.hash)?;
        }
        self.lay_out_all()?;

        let mut methods = self.register_signatures(program)?;
        for pending in &order {
            let decls = methods.remove(&pending.hash).unwrap_or_default();
            self.build_method_table(*pending, &decls)?;
        }
        self.mangle_names()?;

        for module in program.modules {
            self.register_globals(module)?;
        }

        Ok(RegistrationOutput {
            classes_registered: self.classes.len(),
            functions_registered: self.functions_registered,
            globals_registered: self.globals_registered,
        })
    }

    // ==========================================================================
    // Step 1: requires and class names
    // ==========================================================================

    fn declare_module(&mut self, module: &Module<'ast>) -> Result<()> {
        let path = module.path;
        let declared = self.compiler.in_module(path, |c| {
            let mut declared = Vec::new();
            for item in module.items {
                match *item {
                    Item::Require(name) => require(c, name.name, name.span)?,
                    Item::Class(decl) => declared.push(declare_class(c, decl, path)?),
                    Item::Function(_) | Item::Global(_) => {}
                }
            }
            Ok(declared)
        })?;
        self.classes.extend(declared);
        Ok(())
    }

    // ==========================================================================
    // Step 2: bounds and bases
    // ==========================================================================

    /// Template parameters of every class first, so that a base may
    /// instantiate a generic class declared after it.
    fn resolve_headers(&mut self) -> Result<()> {
        for pending in self.classes.clone() {
            self.compiler.in_module(pending.path, |c| {
                let mut params = Vec::with_capacity(pending.decl.template_params.len());
                for param in pending.decl.template_params {
                    let bound = match &param.bound {
                        Some(bound) => match c.resolve_class_type(bound)? {
                            Type::Class(hash) => hash,
                            other => {
                                return Err(CompilationError::type_error(
                                    format!(
                                        "bound of '{}' must be a non-generic class, not '{}'",
                                        param.name.name,
                                        c.type_name(&other)
                                    ),
                                    bound.span,
                                ));
                            }
                        },
                        None => c.registry.object(),
                    };
                    params.push(TemplateParam {
                        name: param.name.name.to_string(),
                        bound,
                    });
                }
                class_mut(c, pending.hash)?.template_params = params;
                Ok(())
            })?;
        }

        for pending in self.classes.clone() {
            self.compiler.in_module(pending.path, |c| {
                let mut bases = c.in_class(pending.hash, |c| {
                    pending
                        .decl
                        .bases
                        .iter()
                        .map(|base| c.resolve_class_type(base))
                        .collect::<Result<Vec<_>>>()
                })?;
                if bases.is_empty() {
                    bases.push(Type::Class(c.registry.object()));
                }
                for (i, base) in bases.iter().enumerate() {
                    if bases[..i].iter().any(|b| b.class_hash() == base.class_hash()) {
                        return Err(CompilationError::other(
                            format!(
                                "class '{}' lists base '{}' more than once",
                                pending.decl.name.name,
                                c.type_name(base)
                            ),
                            pending.decl.span,
                        ));
                    }
                }
                class_mut(c, pending.hash)?.bases = bases;
                Ok(())
            })?;
        }
        Ok(())
    }

    // ==========================================================================
    // Step 3: linearization
    // ==========================================================================

    fn linearize_all(&mut self) -> Result<()> {
        let mut bases: FxHashMap<TypeHash, Vec<TypeHash>> = FxHashMap::default();
        for pending in &self.classes {
            let class = self.compiler.registry.get_class(pending.hash)?;
            bases.insert(
                pending.hash,
                class.bases.iter().filter_map(Type::class_hash).collect(),
            );
        }

        let mut memo = FxHashMap::default();
        for pending in self.classes.clone() {
            let mro = match class::linearize(pending.hash, &bases, &mut memo) {
                Ok(mro) => mro,
                Err(err) => {
                    return self
                        .compiler
                        .in_module(pending.path, |c| Err(mro_error(c, err, pending.decl.span)));
                }
            };
            tracing::debug!(
                class = pending.decl.name.name,
                depth = mro.len(),
                "MRO computed"
            );
            class_mut(self.compiler, pending.hash)?.mro = mro;
        }
        Ok(())
    }

    // ==========================================================================
    // Step 4: bindings and layout
    // ==========================================================================

    /// Template bindings of every generic ancestor, in the class's own terms.
    fn inherit_bindings(&mut self, hash: TypeHash) -> Result<()> {
        let registry = &self.compiler.registry;
        let class = registry.get_class(hash)?;
        let mut inherited: FxHashMap<TypeHash, Vec<Type>> = FxHashMap::default();
        for base_ty in &class.bases {
            let Some(base_hash) = base_ty.class_hash() else {
                continue;
            };
            let base = registry.get_class(base_hash)?;
            let names = base.param_names();
            let bindings = base_ty.bindings();
            if !bindings.is_empty() {
                inherited.insert(base_hash, bindings.to_vec());
            }
            for (ancestor, terms) in &base.inherited_bindings {
                let terms = terms
                    .iter()
                    .map(|t| substitute(t, &names, bindings))
                    .collect();
                inherited.entry(*ancestor).or_insert(terms);
            }
        }
        class_mut(self.compiler, hash)?.inherited_bindings = inherited;
        Ok(())
    }

    fn lay_out_all(&mut self) -> Result<()> {
        let mut state = LayoutState::default();
        for pending in self.classes.clone() {
            let fields = self.compiler.in_module(pending.path, |c| {
                c.in_class(pending.hash, |c| {
                    pending
                        .decl
                        .fields
                        .iter()
                        .map(|field| {
                            let ty = c.resolve_type(&field.ty)?;
                            check_storable(c, &ty, field.name.name, field.span)?;
                            Ok(FieldDecl {
                                name: field.name.name.to_string(),
                                ty,
                                span: field.span,
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                })
            })?;
            state.own.insert(pending.hash, fields);
            state.pending.insert(pending.hash, pending);
        }

        for pending in &self.classes {
            lay_out(self.compiler, &mut state, pending.hash)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Step 5: signatures
    // ==========================================================================

    /// Register every function and method signature in source order; method
    /// declarations are returned per class for the method-table step.
    fn register_signatures(
        &mut self,
        program: &Program<'ast>,
    ) -> Result<FxHashMap<TypeHash, Vec<MethodDecl>>> {
        let mut methods: FxHashMap<TypeHash, Vec<MethodDecl>> = FxHashMap::default();
        let mut registered = 0;
        for module in program.modules {
            let path = module.path;
            self.compiler.in_module(path, |c| {
                for item in module.items {
                    match *item {
                        Item::Function(decl) => {
                            register_function(c, decl, path)?;
                            registered += 1;
                        }
                        Item::Class(decl) => {
                            let hash = match c.env.current().get(decl.name.name) {
                                Some(Entry {
                                    symbol: Symbol::Class(hash),
                                    ..
                                }) => *hash,
                                _ => {
                                    return Err(CompilationError::internal(format!(
                                        "class '{}' was not declared",
                                        decl.name.name
                                    )));
                                }
                            };
                            for method in decl.methods {
                                let entry = register_method(c, hash, method, path)?;
                                methods.entry(hash).or_default().push(entry);
                                registered += 1;
                            }
                        }
                        Item::Require(_) | Item::Global(_) => {}
                    }
                }
                Ok(())
            })?;
        }
        self.functions_registered = registered;
        Ok(methods)
    }

    // ==========================================================================
    // Step 6: method tables
    // ==========================================================================

    fn build_method_table(&mut self, pending: PendingClass<'ast>, decls: &[MethodDecl]) -> Result<()> {
        let snapshot = self.compiler.registry.get_class(pending.hash)?.clone();
        let table = self.compiler.in_module(pending.path, |c| {
            class::assign_methods(&mut c.registry, &snapshot, decls)
        })?;

        for entry in table.methods.values().flatten() {
            if let Some(sig) = self.compiler.registry.function_mut(entry.function) {
                sig.slot = Some(entry.slot);
            }
        }
        tracing::debug!(
            class = %snapshot.name,
            slots = table.method_rank.len(),
            "method table built"
        );

        let class = class_mut(self.compiler, pending.hash)?;
        class.methods = table.methods;
        class.method_rank = table.method_rank;
        class.vtable = table.vtable;
        Ok(())
    }

    // ==========================================================================
    // Step 7: linkable names
    // ==========================================================================

    fn mangle_names(&mut self) -> Result<()> {
        let registry = &self.compiler.registry;
        let mut bases = Vec::with_capacity(registry.functions().len());
        for sig in registry.functions() {
            let base = match &sig.owner {
                FunctionOwner::Module(path) => mangle::function_name(path, &sig.name),
                FunctionOwner::Class(hash) => {
                    let class = registry.get_class(*hash)?;
                    mangle::method_name(&class.path, &class.name, &sig.name)
                }
            };
            bases.push((sig.id, base));
        }

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for (_, base) in &bases {
            *counts.entry(base.as_str()).or_default() += 1;
        }
        let mut names: Vec<(FunctionId, String)> = Vec::with_capacity(bases.len());
        for (id, base) in &bases {
            let name = if counts.get(base.as_str()).copied().unwrap_or(0) > 1 {
                let params = &registry.get_function(*id)?.params;
                mangle::overloaded(base, registry, params)
            } else {
                base.clone()
            };
            names.push((*id, name));
        }

        for (id, name) in names {
            if let Some(sig) = self.compiler.registry.function_mut(id) {
                sig.mangled = name;
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Step 8: globals
    // ==========================================================================

    fn register_globals(&mut self, module: &Module<'ast>) -> Result<()> {
        let path = module.path;
        let registered = self.compiler.in_module(path, |c| {
            let mut registered = 0;
            for item in module.items {
                let Item::Global(decl) = *item else {
                    continue;
                };
                if decl.is_const && decl.init.is_none() {
                    return Err(CompilationError::Syntax {
                        message: format!("constant '{}' needs an initializer", decl.name.name),
                        span: decl.span,
                    });
                }
                let ty = c.declared_type(decl)?;
                let len = c.length_of(&ty);
                let address = c.frame.alloc_global(len);
                let binding = Binding {
                    ty: ty.clone(),
                    address,
                    is_const: decl.is_const,
                    span: decl.span,
                };
                c.define_top_level(decl.name.name, Symbol::Variable(binding), decl.span)?;
                tracing::debug!(global = decl.name.name, %address, "global registered");
                c.globals.push(GlobalInit {
                    name: decl.name.name.to_string(),
                    address,
                    ty,
                    init: decl.init,
                    path: path.to_string(),
                    span: decl.span,
                });
                registered += 1;
            }
            Ok(registered)
        })?;
        self.globals_registered += registered;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn class_mut<'c>(compiler: &'c mut AstCompiler<'_>, hash: TypeHash) -> Result<&'c mut ClassType> {
    compiler
        .registry
        .class_mut(hash)
        .ok_or_else(|| CompilationError::internal(format!("unregistered class {hash:?}")))
}

/// `require name;` makes a native visible in the requiring module only.
fn require(compiler: &mut AstCompiler<'_>, name: &str, span: Span) -> Result<()> {
    let Some(native) = Native::from_name(name) else {
        return Err(CompilationError::UnknownName {
            name: name.to_string(),
            span,
        });
    };
    if matches!(compiler.env.current().get(name), Some(entry) if entry.symbol == Symbol::Native(native))
    {
        return Ok(());
    }
    compiler.env.define(name, Symbol::Native(native), span)
}

fn declare_class<'ast>(
    compiler: &mut AstCompiler<'ast>,
    decl: &'ast ClassDecl<'ast>,
    path: &'ast str,
) -> Result<PendingClass<'ast>> {
    let mut class = ClassType::new(decl.name.name, path, decl.span);
    class.is_abstract = decl.is_abstract();
    if let Some(existing) = compiler.registry.class(class.hash) {
        return Err(CompilationError::Redefinition {
            name: decl.name.name.to_string(),
            original: existing.span,
            span: decl.span,
        });
    }
    let hash = compiler.registry.add_class(class);
    compiler.define_top_level(decl.name.name, Symbol::Class(hash), decl.span)?;
    tracing::debug!(class = decl.name.name, path, "class registered");
    Ok(PendingClass { hash, decl, path })
}

fn mro_error(compiler: &AstCompiler<'_>, err: MroError, span: Span) -> CompilationError {
    let name = |hash: TypeHash| {
        compiler
            .registry
            .class(hash)
            .map_or_else(|| format!("{hash:?}"), |class| class.name.clone())
    };
    match err {
        MroError::Inconsistent { class, remaining } => CompilationError::InconsistentHierarchy {
            class: name(class),
            remaining: remaining.into_iter().map(name).collect::<Vec<_>>().join(", "),
            span,
        },
        MroError::Circular { class } => CompilationError::CircularInheritance {
            class: name(class),
            span,
        },
    }
}

/// Reject types that cannot be held by value in a field or parameter.
fn check_storable(compiler: &AstCompiler<'_>, ty: &Type, name: &str, span: Span) -> Result<()> {
    match ty {
        _ if ty.is_void() => Err(CompilationError::type_error(
            format!("'{name}' cannot have type 'void'"),
            span,
        )),
        Type::GenericParam { name: param, .. } => Err(CompilationError::type_error(
            format!("template parameter '{param}' can only be held through a pointer"),
            span,
        )),
        Type::Class(hash) | Type::GenericClass { base: hash, .. } => {
            let class = compiler.registry.get_class(*hash)?;
            if class.is_abstract {
                return Err(CompilationError::AbstractInstantiation {
                    class: class.name.clone(),
                    span,
                });
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[derive(Default)]
struct LayoutState<'ast> {
    own: FxHashMap<TypeHash, Vec<FieldDecl>>,
    pending: FxHashMap<TypeHash, PendingClass<'ast>>,
    done: FxHashSet<TypeHash>,
    visiting: FxHashSet<TypeHash>,
}

/// Lay out `hash` after its bases and the classes it holds by value.
fn lay_out(compiler: &mut AstCompiler<'_>, state: &mut LayoutState<'_>, hash: TypeHash) -> Result<()> {
    if state.done.contains(&hash) {
        return Ok(());
    }
    let Some(pending) = state.pending.get(&hash).copied() else {
        return Ok(());
    };
    if !state.visiting.insert(hash) {
        return compiler.in_module(pending.path, |_| {
            Err(CompilationError::other(
                format!("class '{}' contains itself by value", pending.decl.name.name),
                pending.decl.span,
            ))
        });
    }

    let own = state.own.get(&hash).cloned().unwrap_or_default();
    let mut deps: Vec<TypeHash> = compiler
        .registry
        .get_class(hash)?
        .bases
        .iter()
        .filter_map(Type::class_hash)
        .collect();
    deps.extend(
        own.iter()
            .filter(|field| matches!(field.ty, Type::Class(_) | Type::GenericClass { .. }))
            .filter_map(|field| field.ty.class_hash()),
    );
    for dep in deps {
        lay_out(compiler, state, dep)?;
    }

    let (fields, length) = compiler.in_module(pending.path, |c| {
        let class = c.registry.get_class(hash)?;
        class::lay_out_fields(&c.registry, class, &own)
    })?;
    tracing::debug!(class = pending.decl.name.name, length, "class laid out");
    let class = class_mut(compiler, hash)?;
    class.fields = fields;
    class.memory_length = length;

    state.visiting.remove(&hash);
    state.done.insert(hash);
    Ok(())
}

fn signature(compiler: &mut AstCompiler<'_>, decl: &FunctionDecl<'_>) -> Result<(Vec<Type>, Type)> {
    let mut params = Vec::with_capacity(decl.params.len());
    for param in decl.params {
        let ty = compiler.resolve_type(&param.ty)?;
        check_storable(compiler, &ty, param.name.name, param.span)?;
        params.push(ty);
    }
    let ret = match &decl.ret {
        Some(ret) => compiler.resolve_type(ret)?,
        None => Type::VOID,
    };
    if let Type::GenericParam { name, .. } = &ret {
        return Err(CompilationError::type_error(
            format!("template parameter '{name}' can only be returned through a pointer"),
            decl.span,
        ));
    }
    Ok((params, ret))
}

fn register_function<'ast>(
    compiler: &mut AstCompiler<'ast>,
    decl: &'ast FunctionDecl<'ast>,
    path: &str,
) -> Result<FunctionId> {
    let name = decl.name.name;
    if decl.is_abstract() {
        return Err(CompilationError::Syntax {
            message: format!("free function '{name}' cannot be abstract"),
            span: decl.span,
        });
    }
    if decl.body.is_none() {
        return Err(CompilationError::Syntax {
            message: format!("function '{name}' needs a body"),
            span: decl.span,
        });
    }
    let (params, ret) = signature(compiler, decl)?;

    if let Some(Entry {
        symbol: Symbol::Functions(ids),
        ..
    }) = compiler.env.current().get(name)
    {
        for id in ids {
            let existing = compiler.registry.get_function(*id)?;
            if existing.params == params {
                return Err(CompilationError::Redefinition {
                    name: name.to_string(),
                    original: existing.span,
                    span: decl.span,
                });
            }
        }
    }

    let id = compiler.registry.add_function(FunctionSig {
        id: 0,
        name: name.to_string(),
        mangled: String::new(),
        owner: FunctionOwner::Module(path.to_string()),
        param_names: decl.params.iter().map(|p| p.name.name.to_string()).collect(),
        params,
        ret,
        is_abstract: false,
        is_const: decl.is_const(),
        slot: None,
        span: decl.span,
    });
    compiler.bodies.insert(
        id,
        FunctionBody {
            decl,
            class: None,
            path: path.to_string(),
        },
    );
    compiler.define_top_level(name, Symbol::Functions(vec![id]), decl.span)?;
    Ok(id)
}

fn register_method<'ast>(
    compiler: &mut AstCompiler<'ast>,
    class: TypeHash,
    decl: &'ast FunctionDecl<'ast>,
    path: &str,
) -> Result<MethodDecl> {
    let name = decl.name.name;
    match (decl.is_abstract(), decl.body.is_some()) {
        (true, true) => {
            return Err(CompilationError::Syntax {
                message: format!("abstract method '{name}' cannot have a body"),
                span: decl.span,
            });
        }
        (false, false) => {
            return Err(CompilationError::Syntax {
                message: format!("method '{name}' needs a body"),
                span: decl.span,
            });
        }
        _ => {}
    }
    let (params, ret) = compiler.in_class(class, |c| signature(c, decl))?;

    let id = compiler.registry.add_function(FunctionSig {
        id: 0,
        name: name.to_string(),
        mangled: String::new(),
        owner: FunctionOwner::Class(class),
        params: params.clone(),
        param_names: decl.params.iter().map(|p| p.name.name.to_string()).collect(),
        ret: ret.clone(),
        is_abstract: decl.is_abstract(),
        is_const: decl.is_const(),
        slot: None,
        span: decl.span,
    });
    if decl.body.is_some() {
        compiler.bodies.insert(
            id,
            FunctionBody {
                decl,
                class: Some(class),
                path: path.to_string(),
            },
        );
    }
    Ok(MethodDecl {
        function: id,
        name: name.to_string(),
        signature: params,
        ret,
        is_const: decl.is_const(),
        is_abstract: decl.is_abstract(),
        span: decl.span,
    })
}
