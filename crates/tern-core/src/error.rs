//! Error and warning types for the tern compiler.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompileFailure (first error + defining file)
//! └── CompilationError   - one variant per rule violation
//!     └── kind() -> ErrorKind { Syntax, Type, Environment, Compile, NotCompilable, Internal }
//! ```
//!
//! Compilation is fail-fast: the first [`CompilationError`] aborts the whole
//! unit and no partial output is produced. Warnings never abort and are
//! reported through [`CompileWarning`].

use std::fmt;

use thiserror::Error;

use crate::Span;

/// Broad category of a compilation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed construct shape.
    Syntax,
    /// A type was used where a non-type was expected (or the reverse), or a
    /// value is not convertible to the required type.
    Type,
    /// Name resolution failure, redefinition, or assignment to a constant.
    Environment,
    /// General semantic violation.
    Compile,
    /// A node reached code generation without being resolved.
    NotCompilable,
    /// Compiler bug or invalid compiler configuration.
    Internal,
}

impl ErrorKind {
    /// Human-readable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Environment => "EnvironmentError",
            ErrorKind::Compile => "CompileError",
            ErrorKind::NotCompilable => "NotCompilableError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that occur during semantic analysis and code generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// Malformed construct shape.
    #[error("at {span}: {message}")]
    Syntax { message: String, span: Span },

    /// A type was used where a value is expected, or the reverse.
    #[error("at {span}: {message}")]
    TypeError { message: String, span: Span },

    /// A value is not convertible to the required type.
    #[error("at {span}: cannot convert '{from}' to '{to}'")]
    InvalidConversion { from: String, to: String, span: Span },

    /// A referenced name could not be found in any enclosing scope.
    #[error("at {span}: unknown name '{name}'")]
    UnknownName { name: String, span: Span },

    /// A referenced type could not be found.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    /// A name was defined twice in the same scope.
    #[error("at {span}: redefinition of '{name}' (previously defined at {original})")]
    Redefinition {
        name: String,
        original: Span,
        span: Span,
    },

    /// Assignment to a constant binding.
    #[error("at {span}: cannot assign to constant '{name}'")]
    AssignToConst { name: String, span: Span },

    /// A field is not declared on the accessed class.
    #[error("at {span}: unknown field '{field}' on type '{type_name}'")]
    UnknownField {
        field: String,
        type_name: String,
        span: Span,
    },

    /// A method is not declared on the receiver's class.
    #[error("at {span}: unknown method '{method}' on type '{type_name}'")]
    UnknownMethod {
        method: String,
        type_name: String,
        span: Span,
    },

    /// Wrong number of arguments in a call.
    #[error("at {span}: {name} expects {expected} argument(s), got {got}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    /// No overload accepts the argument types.
    #[error("at {span}: no matching overload for '{name}({args})'")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    /// Two or more overloads match equally well.
    #[error("at {span}: ambiguous call to '{name}': {candidates}")]
    AmbiguousOverload {
        name: String,
        candidates: String,
        span: Span,
    },

    /// The C3 merge found no valid head.
    #[error("at {span}: inconsistent class hierarchy for '{class}': cannot linearize {remaining}")]
    InconsistentHierarchy {
        class: String,
        remaining: String,
        span: Span,
    },

    /// A class inherits from itself.
    #[error("at {span}: circular inheritance for '{class}'")]
    CircularInheritance { class: String, span: Span },

    /// `new` on an abstract class.
    #[error("at {span}: cannot instantiate abstract class '{class}'")]
    AbstractInstantiation { class: String, span: Span },

    /// A concrete class leaves an abstract method unimplemented.
    #[error("at {span}: class '{class}' does not implement abstract method '{method}'")]
    UnresolvedAbstract {
        class: String,
        method: String,
        span: Span,
    },

    /// Overriding a method declared `const` in an ancestor.
    #[error("at {span}: cannot override const method '{method}' of '{ancestor}'")]
    ConstOverride {
        method: String,
        ancestor: String,
        span: Span,
    },

    /// Invalid `as` cast.
    #[error("at {span}: cannot cast '{from}' to '{to}'")]
    InvalidCast { from: String, to: String, span: Span },

    /// A non-void function has a path that does not return.
    #[error("at {span}: function '{function}' is missing a return statement")]
    MissingReturn { function: String, span: Span },

    /// A native function is used without a matching `require`.
    #[error("at {span}: native function '{name}' must be required before use")]
    NativeNotRequired { name: String, span: Span },

    /// `break`, `continue`, `fallthrough` or `this` outside its construct.
    #[error("at {span}: '{construct}' outside of {context}")]
    OutsideOf {
        construct: &'static str,
        context: &'static str,
        span: Span,
    },

    /// A placeholder node reached code generation unresolved.
    #[error("at {span}: node '{node}' cannot be compiled")]
    NotCompilable { node: String, span: Span },

    /// A generic semantic violation.
    #[error("at {span}: {message}")]
    Other { message: String, span: Span },

    /// Internal compiler error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// The taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompilationError::Syntax { .. } => ErrorKind::Syntax,
            CompilationError::TypeError { .. }
            | CompilationError::InvalidConversion { .. }
            | CompilationError::UnknownType { .. } => ErrorKind::Type,
            CompilationError::UnknownName { .. }
            | CompilationError::Redefinition { .. }
            | CompilationError::AssignToConst { .. } => ErrorKind::Environment,
            CompilationError::NotCompilable { .. } => ErrorKind::NotCompilable,
            CompilationError::Internal { .. } => ErrorKind::Internal,
            _ => ErrorKind::Compile,
        }
    }

    /// The span where this error occurred, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompilationError::Syntax { span, .. }
            | CompilationError::TypeError { span, .. }
            | CompilationError::InvalidConversion { span, .. }
            | CompilationError::UnknownName { span, .. }
            | CompilationError::UnknownType { span, .. }
            | CompilationError::Redefinition { span, .. }
            | CompilationError::AssignToConst { span, .. }
            | CompilationError::UnknownField { span, .. }
            | CompilationError::UnknownMethod { span, .. }
            | CompilationError::ArgumentCountMismatch { span, .. }
            | CompilationError::NoMatchingOverload { span, .. }
            | CompilationError::AmbiguousOverload { span, .. }
            | CompilationError::InconsistentHierarchy { span, .. }
            | CompilationError::CircularInheritance { span, .. }
            | CompilationError::AbstractInstantiation { span, .. }
            | CompilationError::UnresolvedAbstract { span, .. }
            | CompilationError::ConstOverride { span, .. }
            | CompilationError::InvalidCast { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::NativeNotRequired { span, .. }
            | CompilationError::OutsideOf { span, .. }
            | CompilationError::NotCompilable { span, .. }
            | CompilationError::Other { span, .. } => Some(*span),
            CompilationError::Internal { .. } => None,
        }
    }

    /// Shorthand for [`CompilationError::Other`].
    pub fn other(message: impl Into<String>, span: Span) -> Self {
        CompilationError::Other {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompilationError::TypeError`].
    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        CompilationError::TypeError {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompilationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

/// The error that aborted a compilation, paired with the file it occurred in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {kind}: {error}")]
pub struct CompileFailure {
    /// Defining-file path of the module being compiled.
    pub path: String,
    /// Category of `error`, kept alongside for reporting.
    pub kind: ErrorKind,
    /// The first error encountered.
    #[source]
    pub error: CompilationError,
}

impl CompileFailure {
    /// Attach a file path to an error.
    pub fn new(path: impl Into<String>, error: CompilationError) -> Self {
        Self {
            path: path.into(),
            kind: error.kind(),
            error,
        }
    }
}

/// A non-fatal diagnostic (implicit narrowing or widening and similar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileWarning {
    /// Defining-file path of the module being compiled.
    pub path: String,
    /// Where the warning was raised.
    pub span: Span,
    /// Warning text.
    pub message: String,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: warning: {}", self.path, self.span, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let span = Span::new(1, 1, 1);
        assert_eq!(
            CompilationError::Redefinition {
                name: "x".into(),
                original: span,
                span
            }
            .kind(),
            ErrorKind::Environment
        );
        assert_eq!(
            CompilationError::InvalidConversion {
                from: "float".into(),
                to: "*int".into(),
                span
            }
            .kind(),
            ErrorKind::Type
        );
        assert_eq!(
            CompilationError::MissingReturn {
                function: "main".into(),
                span
            }
            .kind(),
            ErrorKind::Compile
        );
        assert_eq!(
            CompilationError::internal("boom").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn missing_return_message() {
        let err = CompilationError::MissingReturn {
            function: "main".into(),
            span: Span::new(2, 4, 1),
        };
        assert_eq!(
            err.to_string(),
            "at 2:4: function 'main' is missing a return statement"
        );
    }

    #[test]
    fn failure_display_includes_path() {
        let failure = CompileFailure::new(
            "src/main.tn",
            CompilationError::UnknownName {
                name: "y".into(),
                span: Span::new(3, 7, 1),
            },
        );
        assert_eq!(
            failure.to_string(),
            "src/main.tn: EnvironmentError: at 3:7: unknown name 'y'"
        );
    }

    #[test]
    fn internal_has_no_span() {
        assert!(CompilationError::internal("x").span().is_none());
        assert!(CompilationError::other("x", Span::point(1, 1)).span().is_some());
    }

    #[test]
    fn warning_display() {
        let warning = CompileWarning {
            path: "a.tn".into(),
            span: Span::new(4, 2, 3),
            message: "implicit conversion".into(),
        };
        assert_eq!(warning.to_string(), "a.tn:4:2: warning: implicit conversion");
    }
}
