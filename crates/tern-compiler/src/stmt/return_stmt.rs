//! `return`.
//!
//! The return value is written to the first slot of the frame, `$0`, which
//! the caller reserved.

use tern_ast::ReturnStmt;
use tern_core::CompilationError;

use crate::compiler::{AstCompiler, Result};
use crate::frame::{Address, Instr};
use crate::types::find_conversion;

impl<'ast> AstCompiler<'ast> {
    pub fn compile_return(&mut self, stmt: &ReturnStmt<'ast>) -> Result<()> {
        let Some(function) = self.env.function() else {
            return Err(CompilationError::OutsideOf {
                construct: "return",
                context: "a function",
                span: stmt.span,
            });
        };
        let name = function.name.to_string();
        let ret = function.ret.clone();

        match &stmt.value {
            Some(value) => {
                if ret.is_void() {
                    return Err(CompilationError::type_error(
                        format!("void function '{name}' cannot return a value"),
                        stmt.span,
                    ));
                }
                self.with_temps(|c| {
                    let value_span = value.span();
                    let value = c.compile_value(value)?;
                    let Some(conversion) = find_conversion(&c.registry, &value.ty, &ret) else {
                        return Err(CompilationError::InvalidConversion {
                            from: c.type_name(&value.ty),
                            to: c.type_name(&ret),
                            span: value_span,
                        });
                    };
                    if conversion.is_strong && !conversion.is_exact() {
                        let message = format!(
                            "implicit widening of return value from '{}' to '{}'",
                            c.type_name(&value.ty),
                            c.type_name(&ret)
                        );
                        c.warn(value_span, message);
                    } else if !conversion.is_strong {
                        c.check_conversion(&value.ty, &ret, value_span)?;
                    }
                    c.convert_into(&value, &ret, Address::Local(0), conversion)
                })?;
            }
            None if !ret.is_void() => {
                return Err(CompilationError::type_error(
                    format!(
                        "function '{name}' must return a value of type '{}'",
                        self.type_name(&ret)
                    ),
                    stmt.span,
                ));
            }
            None => {}
        }
        self.frame.emit(Instr::Ret);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tern_ast::AstBuilder;

    use super::*;
    use crate::test_utils::{code, compiler_with, function_compiler};
    use crate::types::Type;

    #[test]
    fn value_lands_in_return_slot() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = function_compiler(Type::INT);
        compiler.compile_stmt(&b.ret(Some(b.int(7)))).unwrap();
        assert_eq!(code(&compiler), vec!["mov $0, &0, #8", "ret"]);
        assert!(compiler.warnings.is_empty());
    }

    #[test]
    fn widening_return_warns() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = function_compiler(Type::FLOAT);
        compiler.compile_stmt(&b.ret(Some(b.int(1)))).unwrap();
        assert_eq!(code(&compiler), vec!["i2f $0, &0", "ret"]);
        assert_eq!(compiler.warnings.len(), 1);
        assert!(compiler.warnings[0].message.contains("widening"));
    }

    #[test]
    fn void_function_returning_value() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = function_compiler(Type::VOID);
        let err = compiler.compile_stmt(&b.ret(Some(b.int(1)))).unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn bare_return_needs_void() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = function_compiler(Type::INT);
        let err = compiler.compile_stmt(&b.ret(None)).unwrap_err();
        assert!(matches!(err, CompilationError::TypeError { .. }));
    }

    #[test]
    fn return_outside_function() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = compiler_with(&[]);
        let err = compiler.compile_stmt(&b.ret(None)).unwrap_err();
        assert!(matches!(err, CompilationError::OutsideOf { construct: "return", .. }));
    }

    #[test]
    fn pointer_cannot_return_as_float() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut compiler = function_compiler(Type::FLOAT);
        compiler
            .env
            .define_variable("p", Type::INT.pointer_to(), Address::Local(8), false, Default::default())
            .unwrap();
        let err = compiler.compile_stmt(&b.ret(Some(b.name("p")))).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidConversion { .. }));
    }
}
