//! `if` statements.
//!
//! ```text
//!   <cond>  if_false cond, else_N
//!   <then>  goto endif_N          ; only with an else branch
//! else_N:
//!   <else>
//! endif_N:
//! ```

use tern_ast::{Expr, IfStmt};

use crate::compiler::{AstCompiler, Result};
use crate::frame::{Instr, Label, LabelKind};

impl<'ast> AstCompiler<'ast> {
    pub fn compile_if(&mut self, stmt: &IfStmt<'ast>) -> Result<()> {
        let else_label = self.frame.label(LabelKind::Else);
        self.branch_unless(&stmt.condition, else_label)?;
        self.compile_block(&stmt.then_block)?;

        match stmt.else_stmt {
            Some(else_stmt) => {
                let end_label = self.frame.label(LabelKind::EndIf);
                self.frame.goto(end_label);
                self.frame.place(else_label);
                self.compile_stmt(else_stmt)?;
                self.frame.place(end_label);
            }
            None => self.frame.place(else_label),
        }
        Ok(())
    }

    /// Jump to `target` when `condition` is zero.
    pub(crate) fn branch_unless(&mut self, condition: &Expr<'ast>, target: Label) -> Result<()> {
        self.with_temps(|c| {
            let cond = c.condition(condition)?;
            c.frame.emit(Instr::IfFalse { cond, target });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use crate::test_utils::{code, compiler_with};
    use crate::types::Type;

    #[test]
    fn if_without_else() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT), ("x", Type::INT)]);
        compiler
            .compile_stmt(&b.if_stmt(
                b.name("c"),
                vec![b.expr_stmt(b.assign(b.name("x"), b.int(1)))],
                None,
            ))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec!["if_false $0, else_0", "mov $8, &0, #8", "label else_0"]
        );
    }

    #[test]
    fn if_with_else_chain() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("c", Type::INT), ("x", Type::INT)]);
        let inner = b.if_stmt(
            b.name("x"),
            vec![b.expr_stmt(b.assign(b.name("x"), b.int(2)))],
            None,
        );
        compiler
            .compile_stmt(&b.if_stmt(
                b.name("c"),
                vec![b.expr_stmt(b.assign(b.name("x"), b.int(1)))],
                Some(inner),
            ))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec![
                "if_false $0, else_0",
                "mov $8, &0, #8",
                "goto endif_0",
                "label else_0",
                "if_false $8, else_1",
                "mov $8, &8, #8",
                "label else_1",
                "label endif_0",
            ]
        );
    }

    #[test]
    fn float_condition_is_converted() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[("f", Type::FLOAT)]);
        compiler
            .compile_stmt(&b.if_stmt(b.name("f"), vec![], None))
            .unwrap();
        assert_eq!(
            code(&compiler),
            vec!["f2i $8, $0", "if_false $8, else_0", "label else_0"]
        );
        assert_eq!(compiler.warnings.len(), 1);
    }
}
