//! `for` loops.

use tern_ast::ForStmt;

use crate::compiler::{AstCompiler, Result};
use crate::env::ScopeKind;
use crate::frame::LabelKind;

impl<'ast> AstCompiler<'ast> {
    /// ```text
    ///   <init>
    /// loop_N:
    ///   <cond>  if_false cond, endloop_N   ; omitted without a condition
    ///   <body>
    /// label_M:                             ; continue target
    ///   <step>
    ///   goto loop_N
    /// endloop_N:
    /// ```
    ///
    /// Variables declared by `init` are scoped to the loop.
    pub fn compile_for(&mut self, stmt: &ForStmt<'ast>) -> Result<()> {
        self.scoped(ScopeKind::Block, |c| {
            if let Some(init) = stmt.init {
                c.compile_stmt(init)?;
            }
            let top = c.frame.label(LabelKind::Loop);
            let end = c.frame.label(LabelKind::EndLoop);
            let next = c.frame.label(LabelKind::General);

            c.frame.place(top);
            if let Some(condition) = &stmt.condition {
                c.branch_unless(condition, end)?;
            }
            c.scoped(
                ScopeKind::Loop {
                    break_label: end,
                    continue_label: next,
                },
                |c| c.compile_stmts(&stmt.body),
            )?;
            c.frame.place(next);
            if let Some(step) = &stmt.step {
                c.with_temps(|c| c.compile_expr(step).map(drop))?;
            }
            c.frame.goto(top);
            c.frame.place(end);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::{AstBuilder, BinaryOp};

    use crate::test_utils::{code, compiler_with};

    #[test]
    fn counting_loop() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        let init = b.var("i", None, Some(b.int(0)));
        let cond = b.binary(b.name("i"), BinaryOp::Less, b.int(3));
        let step = b.assign(b.name("i"), b.binary(b.name("i"), BinaryOp::Add, b.int(1)));
        compiler
            .compile_stmt(&b.for_stmt(Some(init), Some(cond), Some(step), vec![b.cont()]))
            .unwrap();

        let text = code(&compiler);
        assert_eq!(text[0], "mov $0, &0, #8");
        assert_eq!(text[1], "label loop_0");
        assert!(text.contains(&"goto label_0".to_string()));
        assert!(text.contains(&"label label_0".to_string()));
        assert_eq!(&text[text.len() - 2..], ["goto loop_0", "label endloop_0"]);
        assert_eq!(compiler.frame.sp(), 0);
        assert!(compiler.env.lookup("i").is_none());
    }

    #[test]
    fn infinite_loop_has_no_test() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        compiler
            .compile_stmt(&b.for_stmt(None, None, None, vec![b.brk()]))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec![
                "label loop_0",
                "goto endloop_0",
                "label label_0",
                "goto loop_0",
                "label endloop_0",
            ]
        );
    }
}
