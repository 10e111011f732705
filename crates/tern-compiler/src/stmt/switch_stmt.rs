//! Statement `switch`.
//!
//! Cases do not fall through. A case that ends in `fallthrough` jumps into
//! the body of the next case; the last case and the default cannot.

use tern_ast::SwitchStmt;

use crate::compiler::{AstCompiler, Result};
use crate::env::ScopeKind;
use crate::expr::compile_equality;
use crate::frame::{Instr, LabelKind};

impl<'ast> AstCompiler<'ast> {
    /// ```text
    ///   <subject>
    ///   <tests of case 0>  if_true eq, casebody_0
    ///   <tests of case 1>  if_true eq, casebody_1
    ///   goto case_N                    ; default, or endcase_N without one
    /// casebody_0: <body 0> goto endcase_N
    /// casebody_1: <body 1> goto endcase_N
    /// case_N:     <default>
    /// endcase_N:
    /// ```
    pub fn compile_switch(&mut self, stmt: &SwitchStmt<'ast>) -> Result<()> {
        self.scoped(ScopeKind::Block, |c| {
            let subject = c.compile_value(&stmt.subject)?;
            let end = c.frame.label(LabelKind::EndCase);
            let bodies: Vec<_> = stmt
                .cases
                .iter()
                .map(|_| c.frame.label(LabelKind::CaseBody))
                .collect();
            let default = stmt.default.map(|_| c.frame.label(LabelKind::Case));

            for (case, body) in stmt.cases.iter().zip(&bodies) {
                for value in case.values {
                    c.with_temps(|c| {
                        let candidate = c.compile_value(value)?;
                        let cond = compile_equality(c, subject.clone(), candidate, value.span())?;
                        c.frame.emit(Instr::IfTrue {
                            cond,
                            target: *body,
                        });
                        Ok(())
                    })?;
                }
            }
            c.frame.goto(default.unwrap_or(end));

            for (i, case) in stmt.cases.iter().enumerate() {
                c.frame.place(bodies[i]);
                let fallthrough = bodies.get(i + 1).copied();
                c.scoped(ScopeKind::Case { fallthrough }, |c| c.compile_stmts(&case.body))?;
                c.frame.goto(end);
            }

            if let (Some(block), Some(label)) = (&stmt.default, default) {
                c.frame.place(label);
                c.scoped(ScopeKind::Case { fallthrough: None }, |c| c.compile_stmts(block))?;
            }
            c.frame.place(end);
            Ok(())
        })
    }
}
