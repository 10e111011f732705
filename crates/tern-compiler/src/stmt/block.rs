//! Block statements.

use tern_ast::Block;

use crate::compiler::{AstCompiler, Result};
use crate::env::ScopeKind;

impl<'ast> AstCompiler<'ast> {
    /// Compile a block in its own scope; its slots are reclaimed on exit.
    pub fn compile_block(&mut self, block: &Block<'ast>) -> Result<()> {
        self.scoped(ScopeKind::Block, |c| c.compile_stmts(block))
    }

    /// Compile the statements of `block` in the current scope.
    pub(crate) fn compile_stmts(&mut self, block: &Block<'ast>) -> Result<()> {
        for stmt in block.stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }
}
