//! `while` loops.

use tern_ast::WhileStmt;

use crate::compiler::{AstCompiler, Result};
use crate::env::ScopeKind;
use crate::frame::LabelKind;

impl<'ast> AstCompiler<'ast> {
    /// ```text
    /// loop_N:
    ///   <cond>  if_false cond, endloop_N
    ///   <body>
    ///   goto loop_N
    /// endloop_N:
    /// ```
    ///
    /// `continue` jumps to `loop_N`, `break` to `endloop_N`.
    pub fn compile_while(&mut self, stmt: &WhileStmt<'ast>) -> Result<()> {
        let top = self.frame.label(LabelKind::Loop);
        let end = self.frame.label(LabelKind::EndLoop);
        tracing::trace!(%top, "while loop");

        self.frame.place(top);
        self.branch_unless(&stmt.condition, end)?;
        self.scoped(
            ScopeKind::Loop {
                break_label: end,
                continue_label: top,
            },
            |c| c.compile_stmts(&stmt.body),
        )?;
        self.frame.goto(top);
        self.frame.place(end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use crate::test_utils::{code, compiler_with};
    use crate::types::Type;

    #[test]
    fn while_loop_shape() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT)]);
        compiler
            .compile_stmt(&b.while_stmt(b.name("c"), vec![b.brk(), b.cont()]))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec![
                "label loop_0",
                "if_false $0, endloop_0",
                "goto endloop_0",
                "goto loop_0",
                "goto loop_0",
                "label endloop_0",
            ]
        );
    }

    #[test]
    fn body_locals_are_released_each_iteration() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT)]);
        compiler
            .compile_stmt(&b.while_stmt(
                b.name("c"),
                vec![b.var("y", Some(b.ty("float")), None)],
            ))
            .unwrap();
        assert_eq!(compiler.frame.sp(), 8);
        assert!(compiler.env.lookup("y").is_none());
    }
}
