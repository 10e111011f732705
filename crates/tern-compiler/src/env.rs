//! The environment: a chain of lexical scopes.
//!
//! Scopes are kept innermost-last in a `Vec` and looked up from the top down.
//! Besides the name table each scope carries a [`ScopeKind`] that gives it
//! extra capabilities:
//!
//! - `Function`/`Method`: declared return type, enclosing class and `this`
//! - `Loop`: `break`/`continue` targets
//! - `Case`: the `fallthrough` target
//! - `Module`: the defining-file path; its entries are the module's exports
//!
//! Shadowing a name from an outer scope is allowed; defining it twice in the
//! same scope is an error.

use rustc_hash::FxHashMap;
use tern_core::{CompilationError, Span, TypeHash};

use crate::frame::{Address, Label};
use crate::natives::{Intrinsic, Native};
use crate::types::{FunctionId, Type};

// ============================================================================
// Symbols
// ============================================================================

/// A variable bound in a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: Type,
    pub address: Address,
    pub is_const: bool,
    pub span: Span,
}

/// What a name refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(Binding),
    /// An overload set of free functions.
    Functions(Vec<FunctionId>),
    Class(TypeHash),
    /// A required native entry point.
    Native(Native),
    /// `sizeof` or `len`.
    Intrinsic(Intrinsic),
    /// A template parameter inside a generic class body.
    TypeParam(Type),
}

impl Symbol {
    fn describe(&self) -> &'static str {
        match self {
            Symbol::Variable(_) => "variable",
            Symbol::Functions(_) => "function",
            Symbol::Class(_) => "class",
            Symbol::Native(_) => "native",
            Symbol::Intrinsic(_) => "intrinsic",
            Symbol::TypeParam(_) => "type parameter",
        }
    }
}

/// A named entry and where it was defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub symbol: Symbol,
    pub span: Span,
}

// ============================================================================
// Scopes
// ============================================================================

/// What kind of construct opened a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    Global,
    Module {
        path: String,
    },
    Function {
        name: String,
        ret: Type,
    },
    Method {
        name: String,
        ret: Type,
        /// The receiver's class type, as seen from inside the body.
        class: Type,
    },
    Block,
    Loop {
        break_label: Label,
        continue_label: Label,
    },
    Case {
        /// Next case body, `None` for the last case and the default.
        fallthrough: Option<Label>,
    },
}

/// One level of the scope chain.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    entries: FxHashMap<String, Entry>,
    /// Definition order, for deterministic iteration.
    order: Vec<String>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            entries: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Entries in definition order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|e| (name.as_str(), e)))
    }

    fn define(&mut self, name: &str, symbol: Symbol, span: Span) -> Result<(), CompilationError> {
        if let Some(existing) = self.entries.get_mut(name) {
            // Overloads of one function name share an entry.
            if let (Symbol::Functions(ids), Symbol::Functions(more)) = (&mut existing.symbol, &symbol)
            {
                for id in more {
                    if !ids.contains(id) {
                        ids.push(*id);
                    }
                }
                return Ok(());
            }
            return Err(CompilationError::Redefinition {
                name: name.to_string(),
                original: existing.span,
                span,
            });
        }
        self.entries.insert(name.to_string(), Entry { symbol, span });
        self.order.push(name.to_string());
        Ok(())
    }
}

/// The enclosing function as seen from a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionContext<'a> {
    pub name: &'a str,
    pub ret: &'a Type,
    /// Receiver class for methods.
    pub class: Option<&'a Type>,
}

// ============================================================================
// Environment
// ============================================================================

/// The scope chain of a compilation.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global)],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    /// Re-enter a scope previously returned by [`Environment::pop`].
    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Leave the innermost scope. The global scope cannot be popped.
    pub fn pop(&mut self) -> Result<Scope, CompilationError> {
        if self.scopes.len() <= 1 {
            return Err(CompilationError::internal("popped the global scope"));
        }
        self.scopes
            .pop()
            .ok_or_else(|| CompilationError::internal("empty scope chain"))
    }

    /// Pop scopes until `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    pub fn current(&self) -> &Scope {
        // The global scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    /// Define `name` in the innermost scope.
    pub fn define(&mut self, name: &str, symbol: Symbol, span: Span) -> Result<(), CompilationError> {
        tracing::trace!(name, kind = symbol.describe(), depth = self.depth(), "define");
        let last = self.scopes.len() - 1;
        self.scopes[last].define(name, symbol, span)
    }

    /// Define `name` in the global scope.
    pub fn define_global(
        &mut self,
        name: &str,
        symbol: Symbol,
        span: Span,
    ) -> Result<(), CompilationError> {
        self.scopes[0].define(name, symbol, span)
    }

    pub fn define_variable(
        &mut self,
        name: &str,
        ty: Type,
        address: Address,
        is_const: bool,
        span: Span,
    ) -> Result<(), CompilationError> {
        self.define(
            name,
            Symbol::Variable(Binding {
                ty,
                address,
                is_const,
                span,
            }),
            span,
        )
    }

    /// Resolve `name`, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Like [`Environment::lookup`], failing with `UnknownName`.
    pub fn resolve(&self, name: &str, span: Span) -> Result<&Entry, CompilationError> {
        self.lookup(name).ok_or_else(|| CompilationError::UnknownName {
            name: name.to_string(),
            span,
        })
    }

    // ==========================================================================
    // Capabilities
    // ==========================================================================

    /// The nearest enclosing function or method.
    pub fn function(&self) -> Option<FunctionContext<'_>> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Function { name, ret } => Some(FunctionContext {
                name,
                ret,
                class: None,
            }),
            ScopeKind::Method { name, ret, class } => Some(FunctionContext {
                name,
                ret,
                class: Some(class),
            }),
            _ => None,
        })
    }

    /// The receiver class when inside a method body.
    pub fn enclosing_class(&self) -> Option<&Type> {
        self.function().and_then(|f| f.class)
    }

    /// `(break, continue)` targets of the nearest loop in this function.
    ///
    /// Case scopes are transparent: `break` inside a switch leaves the loop.
    pub fn loop_labels(&self) -> Option<(Label, Label)> {
        for scope in self.scopes.iter().rev() {
            match &scope.kind {
                ScopeKind::Loop {
                    break_label,
                    continue_label,
                } => return Some((*break_label, *continue_label)),
                ScopeKind::Function { .. } | ScopeKind::Method { .. } => return None,
                _ => {}
            }
        }
        None
    }

    /// Fallthrough target of the nearest case body.
    ///
    /// `None` when not inside a case; `Some(None)` inside the last case or
    /// the default.
    pub fn fallthrough_target(&self) -> Option<Option<Label>> {
        for scope in self.scopes.iter().rev() {
            match &scope.kind {
                ScopeKind::Case { fallthrough } => return Some(*fallthrough),
                ScopeKind::Loop { .. } | ScopeKind::Function { .. } | ScopeKind::Method { .. } => {
                    return None;
                }
                _ => {}
            }
        }
        None
    }

    /// Path of the module being compiled.
    pub fn module_path(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Module { path } => Some(path.as_str()),
            _ => None,
        })
    }
}
