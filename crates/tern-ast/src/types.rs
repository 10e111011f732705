//! Type expression nodes.
//!
//! Type expressions are resolved to semantic types by the compiler; here they
//! are only names and shapes.

use std::fmt;

use tern_core::Span;

/// A type as written in source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeExpr<'ast> {
    /// Shape of the type.
    pub kind: TypeExprKind<'ast>,
    /// Source location.
    pub span: Span,
}

/// The shape of a type expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeExprKind<'ast> {
    /// A primitive, class, template parameter or generic instantiation
    /// (`int`, `Point`, `T`, `Box<Point>`).
    Named {
        name: &'ast str,
        args: &'ast [TypeExpr<'ast>],
    },
    /// `*T`
    Pointer(&'ast TypeExpr<'ast>),
    /// `[T]`
    Array(&'ast TypeExpr<'ast>),
    /// `fn(A, B) R`
    Function {
        params: &'ast [TypeExpr<'ast>],
        ret: &'ast TypeExpr<'ast>,
    },
}

impl<'ast> TypeExpr<'ast> {
    /// The bare name if this is a named type.
    pub fn name(&self) -> Option<&'ast str> {
        match self.kind {
            TypeExprKind::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExprKind::Pointer(inner) => write!(f, "*{inner}"),
            TypeExprKind::Array(inner) => write!(f, "[{inner}]"),
            TypeExprKind::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {ret}")
            }
        }
    }
}
