//! Assembly of the final pseudo-assembly text.
//!
//! ```text
//! version 1
//! bits 64
//! stack_size 65536
//! global_length 0
//! literal 0200000000000000
//! classes 1
//! class builtin$Object $0 mro builtin$Object methods
//! fn main.tn$main $0
//!   args #8
//!   ...
//! entry
//!   call_fn main.tn$main, $0
//!   stop
//! ```

use std::fmt::Write as _;

use crate::literals::LiteralPool;
use crate::options::CompilerOptions;
use crate::types::{FunctionId, TypeRegistry};

use super::Instr;

/// Instructions of one compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
    pub id: FunctionId,
    pub mangled: String,
    pub code: Vec<Instr>,
}

/// Compiled functions and the entry section, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Output {
    functions: Vec<FunctionRecord>,
    entry: Vec<Instr>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, record: FunctionRecord) {
        tracing::debug!(function = %record.mangled, instrs = record.code.len(), "function emitted");
        self.functions.push(record);
    }

    pub fn set_entry(&mut self, code: Vec<Instr>) {
        self.entry = code;
    }

    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }

    pub fn function(&self, mangled: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.mangled == mangled)
    }

    pub fn entry(&self) -> &[Instr] {
        &self.entry
    }

    /// Render the complete program text.
    pub fn render(
        &self,
        options: &CompilerOptions,
        registry: &TypeRegistry,
        literals: &LiteralPool,
        global_length: u32,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "version {}", options.version);
        let _ = writeln!(out, "bits {}", options.bits);
        let _ = writeln!(out, "stack_size {}", options.stack_size);
        let _ = writeln!(out, "global_length {global_length}");
        let _ = writeln!(out, "literal {}", literals.to_hex());

        let _ = writeln!(out, "classes {}", registry.class_count());
        for class in registry.classes() {
            let _ = write!(out, "class {} ${} mro", class.mangled(), class.id);
            for ancestor in &class.mro {
                let name = registry
                    .class(*ancestor)
                    .map_or_else(|| format!("{ancestor:?}"), |c| c.mangled());
                let _ = write!(out, " {name}");
            }
            out.push_str(" methods");
            for (slot, function) in &class.vtable {
                let target = function
                    .and_then(|id| registry.function(id))
                    .map_or("abstract", |f| f.mangled.as_str());
                let _ = write!(out, " {slot}:{target}");
            }
            out.push('\n');
        }

        for record in &self.functions {
            let _ = writeln!(out, "fn {} ${}", record.mangled, record.id);
            write_code(&mut out, &record.code);
        }

        out.push_str("entry\n");
        write_code(&mut out, &self.entry);
        out
    }
}

fn write_code(out: &mut String, code: &[Instr]) {
    for instr in code {
        let _ = writeln!(out, "  {instr}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Address;

    #[test]
    fn renders_header_and_sections() {
        let registry = TypeRegistry::new(8);
        let mut literals = LiteralPool::new();
        literals.int(2);
        let mut output = Output::new();
        output.add_function(FunctionRecord {
            id: 0,
            mangled: "main.tn$main".into(),
            code: vec![Instr::Args { len: 8 }, Instr::Ret],
        });
        output.set_entry(vec![
            Instr::CallFn {
                function: "main.tn$main".into(),
                base: Address::Local(0),
            },
            Instr::Stop,
        ]);

        let text = output.render(&CompilerOptions::default(), &registry, &literals, 0);
        let expected = "\
version 1
bits 64
stack_size 65536
global_length 0
literal 0200000000000000
classes 1
class builtin$Object $0 mro builtin$Object methods
fn main.tn$main $0
  args #8
  ret
entry
  call_fn main.tn$main, $0
  stop
";
        assert_eq!(text, expected);
    }
}
