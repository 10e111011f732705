//! Static check that every path through a function body ends in `return`.
//!
//! The analysis is syntactic and conservative: loops never count as
//! returning, whatever their condition.

use tern_ast::{Block, Stmt, SwitchStmt};

/// Whether control can leave a node only through `return`.
pub trait ChecksReturn {
    fn always_returns(&self) -> bool;
}

impl ChecksReturn for Block<'_> {
    fn always_returns(&self) -> bool {
        self.stmts.iter().any(ChecksReturn::always_returns)
    }
}

impl ChecksReturn for Stmt<'_> {
    fn always_returns(&self) -> bool {
        match self {
            Stmt::Return(_) => true,
            Stmt::Block(block) => block.always_returns(),
            Stmt::If(if_stmt) => match if_stmt.else_stmt {
                Some(else_stmt) => if_stmt.then_block.always_returns() && else_stmt.always_returns(),
                None => false,
            },
            Stmt::Switch(switch) => switch_returns(switch),
            Stmt::While(_) | Stmt::For(_) => false,
            Stmt::Expr(_)
            | Stmt::VarDecl(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Fallthrough(_)
            | Stmt::Delete(_) => false,
        }
    }
}

/// A switch returns when it has a default that returns and every case
/// either returns or falls through into one that does.
fn switch_returns(switch: &SwitchStmt<'_>) -> bool {
    let Some(default) = &switch.default else {
        return false;
    };
    if !default.always_returns() {
        return false;
    }
    // Walk backwards so each case can see whether its successor returns.
    let mut next_returns = false;
    for case in switch.cases.iter().rev() {
        let falls_through = matches!(case.body.stmts.last(), Some(Stmt::Fallthrough(_)));
        let returns = case.body.always_returns() || (falls_through && next_returns);
        if !returns {
            return false;
        }
        next_returns = returns;
    }
    true
}
