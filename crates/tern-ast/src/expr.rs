//! Expression AST nodes.
//!
//! Literals arrive as placeholders holding their values; interning them into
//! the literal pool is the compiler's business.

use tern_core::Span;

use crate::ops::{BinaryOp, UnaryOp};
use crate::types::TypeExpr;

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    /// The identifier text.
    pub name: &'ast str,
    /// Source location.
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal placeholder
    Literal(LiteralExpr<'ast>),
    /// Name reference
    Ident(Ident<'ast>),
    /// `this`
    This(Span),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Unary prefix operation
    Unary(&'ast UnaryExpr<'ast>),
    /// Assignment
    Assign(&'ast AssignExpr<'ast>),
    /// Call
    Call(&'ast CallExpr<'ast>),
    /// Field access or method reference (`obj.name`)
    Member(&'ast MemberExpr<'ast>),
    /// Statically resolved method reference (`Class::name`)
    Scoped(&'ast ScopedExpr<'ast>),
    /// Array indexing
    Index(&'ast IndexExpr<'ast>),
    /// Object construction
    New(&'ast NewExpr<'ast>),
    /// Array allocation
    NewArray(&'ast NewArrayExpr<'ast>),
    /// Array literal
    ArrayLit(&'ast ArrayLitExpr<'ast>),
    /// `expr as T`
    Cast(&'ast CastExpr<'ast>),
    /// `expr instanceof Class`
    InstanceOf(&'ast InstanceOfExpr<'ast>),
    /// `if c then a else b`
    If(&'ast IfExpr<'ast>),
    /// Expression-form switch
    Switch(&'ast SwitchExpr<'ast>),
    /// An unresolved upstream placeholder (e.g. an unexpanded macro).
    Placeholder(Ident<'ast>),
}

impl Expr<'_> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::This(span) => *span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Call(e) => e.span,
            Self::Member(e) => e.span,
            Self::Scoped(e) => e.span,
            Self::Index(e) => e.span,
            Self::New(e) => e.span,
            Self::NewArray(e) => e.span,
            Self::ArrayLit(e) => e.span,
            Self::Cast(e) => e.span,
            Self::InstanceOf(e) => e.span,
            Self::If(e) => e.span,
            Self::Switch(e) => e.span,
            Self::Placeholder(e) => e.span,
        }
    }

    /// Short node name for diagnostics.
    pub fn node_name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Ident(_) => "name",
            Self::This(_) => "this",
            Self::Binary(_) => "binary",
            Self::Unary(_) => "unary",
            Self::Assign(_) => "assignment",
            Self::Call(_) => "call",
            Self::Member(_) => "member",
            Self::Scoped(_) => "scoped",
            Self::Index(_) => "index",
            Self::New(_) => "new",
            Self::NewArray(_) => "new array",
            Self::ArrayLit(_) => "array literal",
            Self::Cast(_) => "cast",
            Self::InstanceOf(_) => "instanceof",
            Self::If(_) => "if expression",
            Self::Switch(_) => "switch expression",
            Self::Placeholder(_) => "placeholder",
        }
    }
}

/// A literal placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    /// The literal value
    pub kind: LiteralKind<'ast>,
    /// Source location
    pub span: Span,
}

/// The value carried by a literal placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Character literal
    Char(u8),
    /// String literal
    Str(&'ast str),
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

/// A unary prefix operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// `target = value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// A call. The callee decides free function, method, native or pointer call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub callee: &'ast Expr<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `object.member`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub member: Ident<'ast>,
    pub span: Span,
}

/// `Class::member`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopedExpr<'ast> {
    pub class: TypeExpr<'ast>,
    pub member: Ident<'ast>,
    pub span: Span,
}

/// `object[index]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

/// `new Class(args)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpr<'ast> {
    pub class: TypeExpr<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `new T[d0][d1]...`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewArrayExpr<'ast> {
    pub element: TypeExpr<'ast>,
    pub dims: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `[a, b, c]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayLitExpr<'ast> {
    pub elements: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `expr as T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub target: TypeExpr<'ast>,
    pub span: Span,
}

/// `expr instanceof Class`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceOfExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub class: TypeExpr<'ast>,
    pub span: Span,
}

/// `if condition then then_expr else else_expr`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfExpr<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// One arm of a switch expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchArm<'ast> {
    pub values: &'ast [Expr<'ast>],
    pub result: Expr<'ast>,
    pub span: Span,
}

/// Expression-form switch; the default arm is mandatory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchExpr<'ast> {
    pub subject: &'ast Expr<'ast>,
    pub arms: &'ast [SwitchArm<'ast>],
    pub default: &'ast Expr<'ast>,
    pub span: Span,
}
