//! Statement compilation.
//!
//! Statements produce no value. Each form compiles through a method on
//! [`AstCompiler`], split across this module's files the way the forms are
//! grouped:
//!
//! - blocks and scoping: [`block`]
//! - declarations: [`var_decl`]
//! - control flow: [`if_stmt`], [`while_stmt`], [`for_stmt`], [`switch_stmt`]
//! - [`return_stmt`]
//!
//! Jumps (`break`, `continue`, `fallthrough`), `del` and expression
//! statements are handled here.

mod block;
mod for_stmt;
mod if_stmt;
mod return_stmt;
mod switch_stmt;
mod var_decl;
mod while_stmt;

use tern_ast::{DeleteStmt, ExprStmt, Stmt};
use tern_core::{CompilationError, Span};

use crate::compiler::{AstCompiler, Result};
use crate::expr::compile_delete;

impl<'ast> AstCompiler<'ast> {
    /// Compile one statement.
    pub fn compile_stmt(&mut self, stmt: &Stmt<'ast>) -> Result<()> {
        match stmt {
            Stmt::Expr(expr_stmt) => self.compile_expr_stmt(expr_stmt),
            Stmt::VarDecl(decl) => self.compile_var_decl(decl),
            Stmt::Block(block) => self.compile_block(block),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::While(while_stmt) => self.compile_while(while_stmt),
            Stmt::For(for_stmt) => self.compile_for(for_stmt),
            Stmt::Switch(switch) => self.compile_switch(switch),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Break(span) => self.compile_break(*span),
            Stmt::Continue(span) => self.compile_continue(*span),
            Stmt::Fallthrough(span) => self.compile_fallthrough(*span),
            Stmt::Delete(del) => self.compile_delete_stmt(del),
        }
    }

    /// Evaluate for side effects; the value, if any, is discarded.
    fn compile_expr_stmt(&mut self, expr_stmt: &ExprStmt<'ast>) -> Result<()> {
        self.with_temps(|c| c.compile_expr(&expr_stmt.expr).map(drop))
    }

    fn compile_delete_stmt(&mut self, del: &DeleteStmt<'ast>) -> Result<()> {
        self.with_temps(|c| compile_delete(c, &del.target, del.span))
    }

    fn compile_break(&mut self, span: Span) -> Result<()> {
        let (break_label, _) = self.env.loop_labels().ok_or(CompilationError::OutsideOf {
            construct: "break",
            context: "a loop",
            span,
        })?;
        self.frame.goto(break_label);
        Ok(())
    }

    fn compile_continue(&mut self, span: Span) -> Result<()> {
        let (_, continue_label) = self.env.loop_labels().ok_or(CompilationError::OutsideOf {
            construct: "continue",
            context: "a loop",
            span,
        })?;
        self.frame.goto(continue_label);
        Ok(())
    }

    fn compile_fallthrough(&mut self, span: Span) -> Result<()> {
        match self.env.fallthrough_target() {
            Some(Some(next)) => {
                self.frame.goto(next);
                Ok(())
            }
            Some(None) => Err(CompilationError::other(
                "cannot fall through out of the last case",
                span,
            )),
            None => Err(CompilationError::OutsideOf {
                construct: "fallthrough",
                context: "a switch case",
                span,
            }),
        }
    }
}
