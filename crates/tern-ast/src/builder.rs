//! Arena-backed constructors for every node form.
//!
//! The upstream parser is an external collaborator, so embedders and tests
//! assemble trees through [`AstBuilder`]. Every node produced is stamped with
//! the builder's current line, which can be moved with [`AstBuilder::at`].
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use tern_ast::{AstBuilder, BinaryOp};
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let body = vec![b.ret(Some(b.binary(b.int(1), BinaryOp::Add, b.int(2))))];
//! let main = b.function("main", vec![], Some(b.ty("int")), body);
//! let program = b.program(vec![b.module("main.tn", vec![main])]);
//! assert_eq!(program.modules.len(), 1);
//! ```

use std::cell::Cell;

use bumpalo::Bump;
use tern_core::Span;

use crate::decl::{
    ClassDecl, ClassFlags, FieldDecl, FunctionDecl, FunctionFlags, Item, Module, Param, Program,
    TemplateParam,
};
use crate::expr::*;
use crate::ops::{BinaryOp, UnaryOp};
use crate::stmt::*;
use crate::types::{TypeExpr, TypeExprKind};

/// Builds AST nodes into a bump arena.
pub struct AstBuilder<'ast> {
    arena: &'ast Bump,
    line: Cell<u32>,
}

impl<'ast> AstBuilder<'ast> {
    /// Create a builder over `arena`, starting at line 1.
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
        }
    }

    /// Stamp subsequently built nodes with `line`.
    pub fn at(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    /// The span given to the next node.
    pub fn span(&self) -> Span {
        Span::point(self.line.get(), 1)
    }

    fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    fn slice<T: Copy>(&self, items: Vec<T>) -> &'ast [T] {
        self.arena.alloc_slice_copy(&items)
    }

    fn ident(&self, name: &str) -> Ident<'ast> {
        Ident {
            name: self.arena.alloc_str(name),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// A named type without arguments (`int`, `Point`, `T`).
    pub fn ty(&self, name: &str) -> TypeExpr<'ast> {
        self.generic_ty(name, vec![])
    }

    /// A generic instantiation (`Box<Point>`).
    pub fn generic_ty(&self, name: &str, args: Vec<TypeExpr<'ast>>) -> TypeExpr<'ast> {
        TypeExpr {
            kind: TypeExprKind::Named {
                name: self.arena.alloc_str(name),
                args: self.slice(args),
            },
            span: self.span(),
        }
    }

    /// `*inner`
    pub fn ptr(&self, inner: TypeExpr<'ast>) -> TypeExpr<'ast> {
        TypeExpr {
            kind: TypeExprKind::Pointer(self.alloc(inner)),
            span: self.span(),
        }
    }

    /// `[inner]`
    pub fn array_ty(&self, inner: TypeExpr<'ast>) -> TypeExpr<'ast> {
        TypeExpr {
            kind: TypeExprKind::Array(self.alloc(inner)),
            span: self.span(),
        }
    }

    /// `fn(params) ret`
    pub fn fn_ty(&self, params: Vec<TypeExpr<'ast>>, ret: TypeExpr<'ast>) -> TypeExpr<'ast> {
        TypeExpr {
            kind: TypeExprKind::Function {
                params: self.slice(params),
                ret: self.alloc(ret),
            },
            span: self.span(),
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn literal(&self, kind: LiteralKind<'ast>) -> Expr<'ast> {
        Expr::Literal(LiteralExpr {
            kind,
            span: self.span(),
        })
    }

    pub fn int(&self, value: i64) -> Expr<'ast> {
        self.literal(LiteralKind::Int(value))
    }

    pub fn float(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralKind::Float(value))
    }

    pub fn char(&self, value: u8) -> Expr<'ast> {
        self.literal(LiteralKind::Char(value))
    }

    pub fn str(&self, value: &str) -> Expr<'ast> {
        self.literal(LiteralKind::Str(self.arena.alloc_str(value)))
    }

    /// A name reference.
    pub fn name(&self, name: &str) -> Expr<'ast> {
        Expr::Ident(self.ident(name))
    }

    pub fn this(&self) -> Expr<'ast> {
        Expr::This(self.span())
    }

    pub fn binary(&self, left: Expr<'ast>, op: BinaryOp, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.alloc(BinaryExpr {
            left: self.alloc(left),
            op,
            right: self.alloc(right),
            span: self.span(),
        }))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Unary(self.alloc(UnaryExpr {
            op,
            operand: self.alloc(operand),
            span: self.span(),
        }))
    }

    /// `*operand`
    pub fn deref(&self, operand: Expr<'ast>) -> Expr<'ast> {
        self.unary(UnaryOp::Deref, operand)
    }

    /// `&operand`
    pub fn addr_of(&self, operand: Expr<'ast>) -> Expr<'ast> {
        self.unary(UnaryOp::AddrOf, operand)
    }

    pub fn assign(&self, target: Expr<'ast>, value: Expr<'ast>) -> Expr<'ast> {
        Expr::Assign(self.alloc(AssignExpr {
            target: self.alloc(target),
            value: self.alloc(value),
            span: self.span(),
        }))
    }

    pub fn call(&self, callee: Expr<'ast>, args: Vec<Expr<'ast>>) -> Expr<'ast> {
        Expr::Call(self.alloc(CallExpr {
            callee: self.alloc(callee),
            args: self.slice(args),
            span: self.span(),
        }))
    }

    /// `name(args)`
    pub fn call_named(&self, name: &str, args: Vec<Expr<'ast>>) -> Expr<'ast> {
        self.call(self.name(name), args)
    }

    pub fn member(&self, object: Expr<'ast>, member: &str) -> Expr<'ast> {
        Expr::Member(self.alloc(MemberExpr {
            object: self.alloc(object),
            member: self.ident(member),
            span: self.span(),
        }))
    }

    /// `object.method(args)`
    pub fn method_call(
        &self,
        object: Expr<'ast>,
        method: &str,
        args: Vec<Expr<'ast>>,
    ) -> Expr<'ast> {
        self.call(self.member(object, method), args)
    }

    /// `Class::member`
    pub fn scoped(&self, class: TypeExpr<'ast>, member: &str) -> Expr<'ast> {
        Expr::Scoped(self.alloc(ScopedExpr {
            class,
            member: self.ident(member),
            span: self.span(),
        }))
    }

    pub fn index(&self, object: Expr<'ast>, index: Expr<'ast>) -> Expr<'ast> {
        Expr::Index(self.alloc(IndexExpr {
            object: self.alloc(object),
            index: self.alloc(index),
            span: self.span(),
        }))
    }

    /// `new Class(args)`
    pub fn new_object(&self, class: TypeExpr<'ast>, args: Vec<Expr<'ast>>) -> Expr<'ast> {
        Expr::New(self.alloc(NewExpr {
            class,
            args: self.slice(args),
            span: self.span(),
        }))
    }

    /// `new element[d0][d1]..`
    pub fn new_array(&self, element: TypeExpr<'ast>, dims: Vec<Expr<'ast>>) -> Expr<'ast> {
        Expr::NewArray(self.alloc(NewArrayExpr {
            element,
            dims: self.slice(dims),
            span: self.span(),
        }))
    }

    pub fn array_lit(&self, elements: Vec<Expr<'ast>>) -> Expr<'ast> {
        Expr::ArrayLit(self.alloc(ArrayLitExpr {
            elements: self.slice(elements),
            span: self.span(),
        }))
    }

    /// `expr as target`
    pub fn cast(&self, expr: Expr<'ast>, target: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Cast(self.alloc(CastExpr {
            expr: self.alloc(expr),
            target,
            span: self.span(),
        }))
    }

    pub fn instance_of(&self, expr: Expr<'ast>, class: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::InstanceOf(self.alloc(InstanceOfExpr {
            expr: self.alloc(expr),
            class,
            span: self.span(),
        }))
    }

    pub fn if_expr(
        &self,
        condition: Expr<'ast>,
        then_expr: Expr<'ast>,
        else_expr: Expr<'ast>,
    ) -> Expr<'ast> {
        Expr::If(self.alloc(IfExpr {
            condition: self.alloc(condition),
            then_expr: self.alloc(then_expr),
            else_expr: self.alloc(else_expr),
            span: self.span(),
        }))
    }

    pub fn arm(&self, values: Vec<Expr<'ast>>, result: Expr<'ast>) -> SwitchArm<'ast> {
        SwitchArm {
            values: self.slice(values),
            result,
            span: self.span(),
        }
    }

    pub fn switch_expr(
        &self,
        subject: Expr<'ast>,
        arms: Vec<SwitchArm<'ast>>,
        default: Expr<'ast>,
    ) -> Expr<'ast> {
        Expr::Switch(self.alloc(SwitchExpr {
            subject: self.alloc(subject),
            arms: self.slice(arms),
            default: self.alloc(default),
            span: self.span(),
        }))
    }

    /// An unresolved upstream node.
    pub fn placeholder(&self, name: &str) -> Expr<'ast> {
        Expr::Placeholder(self.ident(name))
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    pub fn expr_stmt(&self, expr: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Expr(ExprStmt {
            expr,
            span: self.span(),
        })
    }

    fn var_decl(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        init: Option<Expr<'ast>>,
        is_const: bool,
    ) -> &'ast VarDecl<'ast> {
        self.alloc(VarDecl {
            name: self.ident(name),
            ty,
            init,
            is_const,
            span: self.span(),
        })
    }

    /// `var name: ty = init;`
    pub fn var(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        init: Option<Expr<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::VarDecl(self.var_decl(name, ty, init, false))
    }

    /// `const name: ty = init;`
    pub fn const_var(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        init: Expr<'ast>,
    ) -> Stmt<'ast> {
        Stmt::VarDecl(self.var_decl(name, ty, Some(init), true))
    }

    pub fn block(&self, stmts: Vec<Stmt<'ast>>) -> Block<'ast> {
        Block {
            stmts: self.slice(stmts),
            span: self.span(),
        }
    }

    pub fn block_stmt(&self, stmts: Vec<Stmt<'ast>>) -> Stmt<'ast> {
        Stmt::Block(self.block(stmts))
    }

    pub fn if_stmt(
        &self,
        condition: Expr<'ast>,
        then_stmts: Vec<Stmt<'ast>>,
        else_stmt: Option<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::If(self.alloc(IfStmt {
            condition,
            then_block: self.block(then_stmts),
            else_stmt: else_stmt.map(|s| self.alloc(s)),
            span: self.span(),
        }))
    }

    pub fn while_stmt(&self, condition: Expr<'ast>, body: Vec<Stmt<'ast>>) -> Stmt<'ast> {
        Stmt::While(self.alloc(WhileStmt {
            condition,
            body: self.block(body),
            span: self.span(),
        }))
    }

    pub fn for_stmt(
        &self,
        init: Option<Stmt<'ast>>,
        condition: Option<Expr<'ast>>,
        step: Option<Expr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::For(self.alloc(ForStmt {
            init: init.map(|s| self.alloc(s)),
            condition,
            step,
            body: self.block(body),
            span: self.span(),
        }))
    }

    pub fn case(&self, values: Vec<Expr<'ast>>, body: Vec<Stmt<'ast>>) -> SwitchCase<'ast> {
        SwitchCase {
            values: self.slice(values),
            body: self.block(body),
            span: self.span(),
        }
    }

    pub fn switch_stmt(
        &self,
        subject: Expr<'ast>,
        cases: Vec<SwitchCase<'ast>>,
        default: Option<Vec<Stmt<'ast>>>,
    ) -> Stmt<'ast> {
        Stmt::Switch(self.alloc(SwitchStmt {
            subject,
            cases: self.slice(cases),
            default: default.map(|stmts| self.block(stmts)),
            span: self.span(),
        }))
    }

    pub fn ret(&self, value: Option<Expr<'ast>>) -> Stmt<'ast> {
        Stmt::Return(ReturnStmt {
            value,
            span: self.span(),
        })
    }

    pub fn brk(&self) -> Stmt<'ast> {
        Stmt::Break(self.span())
    }

    pub fn cont(&self) -> Stmt<'ast> {
        Stmt::Continue(self.span())
    }

    pub fn fallthrough(&self) -> Stmt<'ast> {
        Stmt::Fallthrough(self.span())
    }

    /// `del target;`
    pub fn del(&self, target: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Delete(DeleteStmt {
            target,
            span: self.span(),
        })
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    pub fn param(&self, name: &str, ty: TypeExpr<'ast>) -> Param<'ast> {
        Param {
            name: self.ident(name),
            ty,
            span: self.span(),
        }
    }

    pub fn field(&self, name: &str, ty: TypeExpr<'ast>) -> FieldDecl<'ast> {
        FieldDecl {
            name: self.ident(name),
            ty,
            span: self.span(),
        }
    }

    pub fn template_param(&self, name: &str, bound: Option<TypeExpr<'ast>>) -> TemplateParam<'ast> {
        TemplateParam {
            name: self.ident(name),
            bound,
        }
    }

    /// A function or method declaration with a body.
    pub fn function_decl(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<TypeExpr<'ast>>,
        body: Vec<Stmt<'ast>>,
        flags: FunctionFlags,
    ) -> FunctionDecl<'ast> {
        FunctionDecl {
            name: self.ident(name),
            params: self.slice(params),
            ret,
            body: Some(self.block(body)),
            flags,
            span: self.span(),
        }
    }

    /// An abstract method: no body.
    pub fn abstract_method(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<TypeExpr<'ast>>,
    ) -> FunctionDecl<'ast> {
        FunctionDecl {
            name: self.ident(name),
            params: self.slice(params),
            ret,
            body: None,
            flags: FunctionFlags::ABSTRACT,
            span: self.span(),
        }
    }

    /// A method with no modifiers.
    pub fn method(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<TypeExpr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> FunctionDecl<'ast> {
        self.function_decl(name, params, ret, body, FunctionFlags::empty())
    }

    /// A free function item.
    pub fn function(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<TypeExpr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> Item<'ast> {
        Item::Function(self.alloc(self.method(name, params, ret, body)))
    }

    /// A class item with the full set of parts.
    #[allow(clippy::too_many_arguments)]
    pub fn class_decl(
        &self,
        name: &str,
        template_params: Vec<TemplateParam<'ast>>,
        bases: Vec<TypeExpr<'ast>>,
        fields: Vec<FieldDecl<'ast>>,
        methods: Vec<FunctionDecl<'ast>>,
        flags: ClassFlags,
    ) -> Item<'ast> {
        Item::Class(self.alloc(ClassDecl {
            name: self.ident(name),
            template_params: self.slice(template_params),
            bases: self.slice(bases),
            fields: self.slice(fields),
            methods: self.slice(methods),
            flags,
            span: self.span(),
        }))
    }

    /// A concrete, non-generic class item; base names are plain class names.
    pub fn class(
        &self,
        name: &str,
        bases: &[&str],
        fields: Vec<FieldDecl<'ast>>,
        methods: Vec<FunctionDecl<'ast>>,
    ) -> Item<'ast> {
        let bases = bases.iter().map(|base| self.ty(base)).collect();
        self.class_decl(name, vec![], bases, fields, methods, ClassFlags::empty())
    }

    /// `require name;`
    pub fn require(&self, name: &str) -> Item<'ast> {
        Item::Require(self.ident(name))
    }

    /// A global variable item.
    pub fn global(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        init: Option<Expr<'ast>>,
    ) -> Item<'ast> {
        Item::Global(self.var_decl(name, ty, init, false))
    }

    /// A global constant item.
    pub fn global_const(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        init: Expr<'ast>,
    ) -> Item<'ast> {
        Item::Global(self.var_decl(name, ty, Some(init), true))
    }

    pub fn module(&self, path: &str, items: Vec<Item<'ast>>) -> Module<'ast> {
        Module {
            path: self.arena.alloc_str(path),
            items: self.slice(items),
        }
    }

    pub fn program(&self, modules: Vec<Module<'ast>>) -> Program<'ast> {
        Program {
            modules: self.slice(modules),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_carry_current_line() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.int(1);
        let second = b.at(7).name("x");
        assert_eq!(first.span().line, 1);
        assert_eq!(second.span().line, 7);
    }

    #[test]
    fn class_defaults_to_no_bases() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let item = b.class("A", &[], vec![b.field("x", b.ty("int"))], vec![]);
        let Item::Class(class) = item else {
            panic!("expected class item");
        };
        assert!(class.bases.is_empty());
        assert_eq!(class.fields[0].name.name, "x");
        assert!(!class.is_abstract());
    }

    #[test]
    fn method_call_is_call_of_member() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let call = b.method_call(b.name("p"), "area", vec![]);
        let Expr::Call(call) = call else {
            panic!("expected call");
        };
        assert!(matches!(call.callee, Expr::Member(m) if m.member.name == "area"));
    }

    #[test]
    fn type_display() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let ty = b.fn_ty(
            vec![b.ptr(b.generic_ty("Box", vec![b.ty("int")]))],
            b.array_ty(b.ty("char")),
        );
        assert_eq!(ty.to_string(), "fn(*Box<int>) [char]");
    }
}
