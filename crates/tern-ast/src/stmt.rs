//! Statement AST nodes.

use tern_core::Span;

use crate::expr::{Expr, Ident};
use crate::types::TypeExpr;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression statement
    Expr(ExprStmt<'ast>),
    /// `var` / `const` declaration
    VarDecl(&'ast VarDecl<'ast>),
    /// Nested block
    Block(Block<'ast>),
    /// If statement
    If(&'ast IfStmt<'ast>),
    /// While loop
    While(&'ast WhileStmt<'ast>),
    /// For loop
    For(&'ast ForStmt<'ast>),
    /// Statement-form switch
    Switch(&'ast SwitchStmt<'ast>),
    /// Return statement
    Return(ReturnStmt<'ast>),
    /// `break`
    Break(Span),
    /// `continue`
    Continue(Span),
    /// `fallthrough`
    Fallthrough(Span),
    /// `del expr`
    Delete(DeleteStmt<'ast>),
}

impl Stmt<'_> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::For(s) => s.span,
            Self::Switch(s) => s.span,
            Self::Return(s) => s.span,
            Self::Break(span) | Self::Continue(span) | Self::Fallthrough(span) => *span,
            Self::Delete(s) => s.span,
        }
    }
}

/// `expr;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: Expr<'ast>,
    pub span: Span,
}

/// `var name: T = init;` or `const name: T = init;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDecl<'ast> {
    pub name: Ident<'ast>,
    /// Declared type; inferred from `init` when absent.
    pub ty: Option<TypeExpr<'ast>>,
    pub init: Option<Expr<'ast>>,
    pub is_const: bool,
    pub span: Span,
}

/// `{ stmts }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// `if cond { then } else stmt`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: Expr<'ast>,
    pub then_block: Block<'ast>,
    /// Either a block or a chained `if`.
    pub else_stmt: Option<&'ast Stmt<'ast>>,
    pub span: Span,
}

/// `while cond { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: Expr<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}

/// `for init; cond; step { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<&'ast Stmt<'ast>>,
    pub condition: Option<Expr<'ast>>,
    pub step: Option<Expr<'ast>>,
    pub body: Block<'ast>,
    pub span: Span,
}

/// One `case v1, v2: body` of a statement switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchCase<'ast> {
    pub values: &'ast [Expr<'ast>],
    pub body: Block<'ast>,
    pub span: Span,
}

/// Statement-form switch. Cases do not fall through unless they end with
/// an explicit `fallthrough`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchStmt<'ast> {
    pub subject: Expr<'ast>,
    pub cases: &'ast [SwitchCase<'ast>],
    pub default: Option<Block<'ast>>,
    pub span: Span,
}

/// `return value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<Expr<'ast>>,
    pub span: Span,
}

/// `del target;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteStmt<'ast> {
    pub target: Expr<'ast>,
    pub span: Span,
}
