//! Compilation Pass (Pass 2) - compile every function body, then the entry
//! section.
//!
//! Each function gets its own frame:
//!
//! ```text
//! $0        return slot
//! this      methods only
//! params    in declaration order
//! locals    and temporaries
//! ```
//!
//! The entry section initializes globals in declaration order, then calls
//! the entry point and stops.

use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::env::{ScopeKind, Symbol};
use crate::frame::{FunctionRecord, Instr};
use crate::return_checker::ChecksReturn;
use crate::types::{FunctionId, FunctionOwner, Type};

/// Output of the compilation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompilationOutput {
    pub functions_compiled: usize,
}

/// Pass 2: lower bodies into instructions.
pub struct CompilationPass<'a, 'ast> {
    compiler: &'a mut AstCompiler<'ast>,
    functions_compiled: usize,
}

impl<'a, 'ast> CompilationPass<'a, 'ast> {
    pub fn new(compiler: &'a mut AstCompiler<'ast>) -> Self {
        Self {
            compiler,
            functions_compiled: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Result<CompilationOutput> {
        let ids: Vec<FunctionId> = self
            .compiler
            .registry
            .functions()
            .iter()
            .map(|sig| sig.id)
            .filter(|id| self.compiler.bodies.contains_key(id))
            .collect();
        for id in ids {
            self.compile_function(id)?;
            self.functions_compiled += 1;
        }
        self.compile_entry()?;

        Ok(CompilationOutput {
            functions_compiled: self.functions_compiled,
        })
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    fn compile_function(&mut self, id: FunctionId) -> Result<()> {
        let Some(body) = self.compiler.bodies.get(&id).cloned() else {
            return Ok(());
        };
        let sig = self.compiler.registry.get_function(id)?.clone();
        let decl = body.decl;
        let Some(block) = &decl.body else {
            return Err(CompilationError::internal(format!(
                "'{}' was queued without a body",
                sig.name
            )));
        };
        tracing::debug!(function = %sig.mangled, "compiling function");

        let code = self.compiler.in_module(&body.path, |c| {
            c.frame.begin_function();
            let ret_len = c.length_of(&sig.ret);
            c.frame.alloc(ret_len);

            let kind = match body.class {
                Some(class) => ScopeKind::Method {
                    name: sig.name.clone(),
                    ret: sig.ret.clone(),
                    class: Type::Class(class),
                },
                None => ScopeKind::Function {
                    name: sig.name.clone(),
                    ret: sig.ret.clone(),
                },
            };
            c.scoped(kind, |c| {
                if let Some(class) = body.class {
                    c.define_type_params(class)?;
                    let len = c.pointer_size();
                    let this = c.frame.alloc(len);
                    c.env.define_variable(
                        "this",
                        Type::Class(class).pointer_to(),
                        this,
                        true,
                        decl.span,
                    )?;
                }
                for ((name, ty), param) in sig.param_names.iter().zip(&sig.params).zip(decl.params) {
                    let len = c.length_of(ty);
                    let address = c.frame.alloc(len);
                    c.env.define_variable(name, ty.clone(), address, false, param.span)?;
                }
                let len = c.frame.sp();
                c.frame.emit(Instr::Args { len });
                c.compile_stmts(block)
            })?;

            if sig.ret.is_void() {
                if !matches!(c.frame.code().last(), Some(Instr::Ret)) {
                    c.frame.emit(Instr::Ret);
                }
            } else if !block.always_returns() {
                return Err(CompilationError::MissingReturn {
                    function: sig.name.clone(),
                    span: decl.span,
                });
            }
            Ok(c.frame.take_code())
        })?;

        tracing::trace!(function = %sig.mangled, instructions = code.len(), "function compiled");
        self.compiler.output.add_function(FunctionRecord {
            id,
            mangled: sig.mangled,
            code,
        });
        Ok(())
    }

    // ==========================================================================
    // Entry section
    // ==========================================================================

    fn compile_entry(&mut self) -> Result<()> {
        let compiler = &mut *self.compiler;
        compiler.frame.begin_function();

        let globals = std::mem::take(&mut compiler.globals);
        let initialized = globals.iter().try_for_each(|global| {
            compiler.in_module(&global.path, |c| {
                c.with_temps(|c| match &global.init {
                    Some(init) => c.compile_into(init, global.address, &global.ty),
                    None => c.zero_fill(global.address, &global.ty),
                })
            })
        });
        compiler.globals = globals;
        initialized?;

        let entry = find_entry_point(compiler)?;
        let sig = compiler.registry.get_function(entry)?.clone();
        let base = compiler.frame.top();
        let ret_len = compiler.length_of(&sig.ret);
        compiler.frame.alloc(ret_len);
        if !sig.params.is_empty() {
            let len = compiler.pointer_size();
            let dst = compiler.frame.alloc(len);
            compiler.frame.emit(Instr::Argv { dst });
        }
        compiler.frame.emit(Instr::CallFn {
            function: sig.mangled.clone(),
            base,
        });
        compiler.frame.emit(Instr::Stop);

        let code = compiler.frame.take_code();
        tracing::debug!(entry = %sig.mangled, instructions = code.len(), "entry section compiled");
        compiler.output.set_entry(code);
        Ok(())
    }
}

/// The exported free function named by the entry-point option. It takes no
/// arguments or the command line as `[[char]]`.
fn find_entry_point(compiler: &AstCompiler<'_>) -> Result<FunctionId> {
    let name = compiler.options.entry_point.as_str();
    let Some(entry) = compiler.env.lookup(name) else {
        return Err(CompilationError::UnknownName {
            name: name.to_string(),
            span: Span::default(),
        });
    };
    let Symbol::Functions(ids) = &entry.symbol else {
        return Err(CompilationError::other(
            format!("entry point '{name}' is not a function"),
            entry.span,
        ));
    };

    let argv = Type::CHAR.array_of().array_of();
    let mut candidates = Vec::new();
    for id in ids {
        let sig = compiler.registry.get_function(*id)?;
        if !matches!(sig.owner, FunctionOwner::Module(_)) {
            continue;
        }
        if sig.params.is_empty() || sig.params == [argv.clone()] {
            candidates.push(*id);
        }
    }
    match candidates.as_slice() {
        [id] => Ok(*id),
        [] => Err(CompilationError::other(
            format!("entry point '{name}' must take no arguments or '[[char]]'"),
            entry.span,
        )),
        _ => Err(CompilationError::other(
            format!("entry point '{name}' is ambiguous"),
            entry.span,
        )),
    }
}
