//! Literal placeholders, interned into the literal pool on first use.

use tern_ast::{LiteralExpr, LiteralKind};

use crate::compiler::{AstCompiler, Result};
use crate::expr_info::ExprValue;
use crate::frame::Instr;
use crate::types::Type;

pub fn compile_literal(compiler: &mut AstCompiler<'_>, lit: &LiteralExpr<'_>) -> Result<ExprValue> {
    match lit.kind {
        LiteralKind::Int(value) => Ok(ExprValue::new(Type::INT, compiler.literals.int(value))),
        LiteralKind::Float(value) => Ok(ExprValue::new(Type::FLOAT, compiler.literals.float(value))),
        LiteralKind::Char(value) => Ok(ExprValue::new(Type::CHAR, compiler.literals.char(value))),
        LiteralKind::Str(value) => {
            // A string value is a pointer to its pooled block.
            let block = compiler.literals.string(value);
            let reg = compiler.frame.acquire_reg()?;
            compiler.frame.emit(Instr::Addr { reg, src: block });
            let slot = compiler.spill_pointer(reg);
            compiler.frame.release_reg(reg);
            Ok(ExprValue::new(Type::CHAR.array_of(), slot))
        }
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use crate::compiler::AstCompiler;
    use crate::frame::Address;
    use crate::options::CompilerOptions;
    use crate::types::Type;

    #[test]
    fn numeric_literals_are_pooled_once() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        let first = compiler.compile_expr(&b.int(7)).unwrap();
        let second = compiler.compile_expr(&b.int(7)).unwrap();
        assert_eq!(first.addr, Address::Literal(0));
        assert_eq!(first, second);
        assert!(compiler.frame.code().is_empty());
    }

    #[test]
    fn string_literal_is_a_char_array() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = AstCompiler::new(CompilerOptions::default()).unwrap();
        let value = compiler.compile_expr(&b.str("hi")).unwrap();
        assert_eq!(value.ty, Type::CHAR.array_of());
        let text: Vec<String> = compiler.frame.code().iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["addr %r0, &0", "setptr $0, %r0"]);
    }
}
