//! Top-level declarations: modules, classes, functions, globals.

use bitflags::bitflags;
use tern_core::Span;

use crate::expr::Ident;
use crate::stmt::{Block, VarDecl};
use crate::types::TypeExpr;

bitflags! {
    /// Function and method modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u8 {
        /// The method may not be overridden.
        const CONST = 1 << 0;
        /// The method has no body and must be implemented by a subclass.
        const ABSTRACT = 1 << 1;
    }
}

bitflags! {
    /// Class modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u8 {
        /// The class may not be instantiated and may leave methods abstract.
        const ABSTRACT = 1 << 0;
    }
}

/// A whole compilation unit: every module, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program<'ast> {
    pub modules: &'ast [Module<'ast>],
}

/// One source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Module<'ast> {
    /// Defining-file path, used in mangled names.
    pub path: &'ast str,
    pub items: &'ast [Item<'ast>],
}

/// A top-level item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    /// `require name;` makes a native entry point callable.
    Require(Ident<'ast>),
    /// Free function
    Function(&'ast FunctionDecl<'ast>),
    /// Class declaration
    Class(&'ast ClassDecl<'ast>),
    /// Global variable or constant
    Global(&'ast VarDecl<'ast>),
}

impl Item<'_> {
    /// Get the span of this item.
    pub fn span(&self) -> Span {
        match self {
            Item::Require(ident) => ident.span,
            Item::Function(f) => f.span,
            Item::Class(c) => c.span,
            Item::Global(g) => g.span,
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// A free function or a method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    /// `None` means `void`.
    pub ret: Option<TypeExpr<'ast>>,
    /// `None` only for abstract methods.
    pub body: Option<Block<'ast>>,
    pub flags: FunctionFlags,
    pub span: Span,
}

impl FunctionDecl<'_> {
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(FunctionFlags::ABSTRACT)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(FunctionFlags::CONST)
    }
}

/// A template parameter with an optional upper bound (defaults to `Object`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateParam<'ast> {
    pub name: Ident<'ast>,
    pub bound: Option<TypeExpr<'ast>>,
}

/// A field declaration inside a class body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// A class declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDecl<'ast> {
    pub name: Ident<'ast>,
    pub template_params: &'ast [TemplateParam<'ast>],
    /// Direct superclasses; empty means `Object`.
    pub bases: &'ast [TypeExpr<'ast>],
    pub fields: &'ast [FieldDecl<'ast>],
    pub methods: &'ast [FunctionDecl<'ast>],
    pub flags: ClassFlags,
    pub span: Span,
}

impl ClassDecl<'_> {
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }
}
