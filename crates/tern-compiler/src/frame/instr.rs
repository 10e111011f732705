//! Pseudo-assembly instructions and operands.
//!
//! Each [`Instr`] renders as one line of output text; operand syntax:
//!
//! | operand | meaning |
//! |---|---|
//! | `$n` | frame-relative slot |
//! | `@n` | global slot |
//! | `&n` | literal-pool slot |
//! | `%rN` | virtual register |
//! | `#n` | immediate |
//! | `[%rN+k]` | memory at a register plus a constant offset |

use std::fmt;

// ============================================================================
// Operands
// ============================================================================

/// A statically known storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Relative to the current frame base.
    Local(u32),
    /// Global data segment.
    Global(u32),
    /// Literal pool.
    Literal(u32),
}

impl Address {
    /// The location `by` bytes further on.
    pub fn offset(self, by: u32) -> Address {
        match self {
            Address::Local(n) => Address::Local(n + by),
            Address::Global(n) => Address::Global(n + by),
            Address::Literal(n) => Address::Literal(n + by),
        }
    }

    pub fn is_global(self) -> bool {
        matches!(self, Address::Global(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Local(n) => write!(f, "${n}"),
            Address::Global(n) => write!(f, "@{n}"),
            Address::Literal(n) => write!(f, "&{n}"),
        }
    }
}

/// A virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub u8);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%r{}", self.0)
    }
}

/// Memory addressed through a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mem {
    pub reg: Register,
    pub offset: u32,
}

impl Mem {
    pub fn new(reg: Register, offset: u32) -> Self {
        Self { reg, offset }
    }
}

impl fmt::Display for Mem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}+{}]", self.reg, self.offset)
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Label categories; each has its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Else,
    EndIf,
    Loop,
    EndLoop,
    Case,
    CaseBody,
    EndCase,
    General,
}

impl LabelKind {
    pub const ALL: [LabelKind; 8] = [
        LabelKind::Else,
        LabelKind::EndIf,
        LabelKind::Loop,
        LabelKind::EndLoop,
        LabelKind::Case,
        LabelKind::CaseBody,
        LabelKind::EndCase,
        LabelKind::General,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            LabelKind::Else => "else",
            LabelKind::EndIf => "endif",
            LabelKind::Loop => "loop",
            LabelKind::EndLoop => "endloop",
            LabelKind::Case => "case",
            LabelKind::CaseBody => "casebody",
            LabelKind::EndCase => "endcase",
            LabelKind::General => "label",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A jump target, unique within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    pub kind: LabelKind,
    pub id: u32,
}

impl Label {
    pub fn new(kind: LabelKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Three-operand integer operations. Division and modulo truncate toward
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl IntOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntOp::Add => "iadd",
            IntOp::Sub => "isub",
            IntOp::Mul => "imul",
            IntOp::Div => "idiv",
            IntOp::Mod => "imod",
            IntOp::Eq => "ieq",
            IntOp::Ne => "ine",
            IntOp::Lt => "ilt",
            IntOp::Le => "ile",
            IntOp::Gt => "igt",
            IntOp::Ge => "ige",
            IntOp::And => "band",
            IntOp::Or => "bor",
            IntOp::Xor => "bxor",
            IntOp::Shl => "shl",
            IntOp::Shr => "shr",
        }
    }
}

/// Three-operand float operations; comparisons produce an `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FloatOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatOp::Add => "fadd",
            FloatOp::Sub => "fsub",
            FloatOp::Mul => "fmul",
            FloatOp::Div => "fdiv",
            FloatOp::Mod => "fmod",
            FloatOp::Eq => "feq",
            FloatOp::Ne => "fne",
            FloatOp::Lt => "flt",
            FloatOp::Le => "fle",
            FloatOp::Gt => "fgt",
            FloatOp::Ge => "fge",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            FloatOp::Add | FloatOp::Sub | FloatOp::Mul | FloatOp::Div | FloatOp::Mod
        )
    }
}

/// Two-operand operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOpcode {
    /// Integer negation.
    INeg,
    /// Bitwise complement.
    BNot,
    /// Logical not: 1 if zero, else 0.
    Not,
    FNeg,
}

impl UnaryOpcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOpcode::INeg => "ineg",
            UnaryOpcode::BNot => "bnot",
            UnaryOpcode::Not => "not",
            UnaryOpcode::FNeg => "fneg",
        }
    }
}

/// Numeric representation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertOp {
    /// 8-byte int to float.
    I2F,
    /// Float to 8-byte int, truncating.
    F2I,
    /// 8-byte int to 1-byte char, truncating.
    I2C,
    /// 1-byte char to 8-byte int, zero-extending.
    C2I,
}

impl ConvertOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ConvertOp::I2F => "i2f",
            ConvertOp::F2I => "f2i",
            ConvertOp::I2C => "i2c",
            ConvertOp::C2I => "c2i",
        }
    }
}

// ============================================================================
// Instructions
// ============================================================================

/// One pseudo-assembly instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Function prologue: total bytes of return slot, receiver and params.
    Args { len: u32 },
    Mov { dst: Address, src: Address, len: u32 },
    /// Store an immediate, sign-extended to `len` bytes.
    Imm { dst: Address, value: i64, len: u32 },
    Int { op: IntOp, dst: Address, lhs: Address, rhs: Address },
    Float { op: FloatOp, dst: Address, lhs: Address, rhs: Address },
    Unary { op: UnaryOpcode, dst: Address, src: Address },
    Convert { op: ConvertOp, dst: Address, src: Address },

    /// `reg = &src` (`gaddr` for globals).
    Addr { reg: Register, src: Address },
    /// `reg = *src`: load a pointer value held in a slot.
    Ptr { reg: Register, src: Address },
    /// `reg += amount`
    Offset { reg: Register, amount: u32 },
    /// `reg += header + index * elem`
    Index { reg: Register, index: Address, elem: u32, header: u32 },
    Load { dst: Address, src: Mem, len: u32 },
    Store { dst: Mem, src: Address, len: u32 },
    /// Write a register's pointer value into a slot.
    SetPtr { dst: Address, reg: Register },
    /// Address of a compiled function.
    FnAddr { dst: Address, function: String },

    /// Write the class tag of the object at `reg`.
    SetTag { reg: Register, class_id: u32 },
    /// `dst = object at reg is an instance of class_id`
    InstanceOf { dst: Address, reg: Register, class_id: u32 },
    /// Fetch dispatch slot `slot` of the object at `obj`.
    VTable { dst: Register, obj: Register, slot: u32 },

    Label(Label),
    Goto(Label),
    IfTrue { cond: Address, target: Label },
    IfFalse { cond: Address, target: Label },

    /// Call with the callee frame starting at `base`.
    CallFn { function: String, base: Address },
    CallNative { native: u16, base: Address },
    CallPtr { reg: Register, base: Address },
    Ret,

    /// Store the program arguments (`[[char]]`) at `dst`.
    Argv { dst: Address },
    Stop,
}

impl Instr {
    pub fn is_label(&self) -> bool {
        matches!(self, Instr::Label(_))
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Args { len } => write!(f, "args #{len}"),
            Instr::Mov { dst, src, len } => write!(f, "mov {dst}, {src}, #{len}"),
            Instr::Imm { dst, value, len } => write!(f, "imm {dst}, #{value}, #{len}"),
            Instr::Int { op, dst, lhs, rhs } => {
                write!(f, "{} {dst}, {lhs}, {rhs}", op.mnemonic())
            }
            Instr::Float { op, dst, lhs, rhs } => {
                write!(f, "{} {dst}, {lhs}, {rhs}", op.mnemonic())
            }
            Instr::Unary { op, dst, src } => write!(f, "{} {dst}, {src}", op.mnemonic()),
            Instr::Convert { op, dst, src } => write!(f, "{} {dst}, {src}", op.mnemonic()),
            Instr::Addr { reg, src } => {
                let name = if src.is_global() { "gaddr" } else { "addr" };
                write!(f, "{name} {reg}, {src}")
            }
            Instr::Ptr { reg, src } => write!(f, "ptr {reg}, {src}"),
            Instr::Offset { reg, amount } => write!(f, "offset {reg}, #{amount}"),
            Instr::Index {
                reg,
                index,
                elem,
                header,
            } => write!(f, "index {reg}, {index}, #{elem}, +{header}"),
            Instr::Load { dst, src, len } => write!(f, "load {dst}, {src}, #{len}"),
            Instr::Store { dst, src, len } => write!(f, "store {dst}, {src}, #{len}"),
            Instr::SetPtr { dst, reg } => write!(f, "setptr {dst}, {reg}"),
            Instr::FnAddr { dst, function } => write!(f, "fnaddr {dst}, {function}"),
            Instr::SetTag { reg, class_id } => write!(f, "settag {reg}, #{class_id}"),
            Instr::InstanceOf { dst, reg, class_id } => {
                write!(f, "instanceof {dst}, {reg}, #{class_id}")
            }
            Instr::VTable { dst, obj, slot } => write!(f, "vtable {dst}, {obj}, #{slot}"),
            Instr::Label(label) => write!(f, "label {label}"),
            Instr::Goto(label) => write!(f, "goto {label}"),
            Instr::IfTrue { cond, target } => write!(f, "if_true {cond}, {target}"),
            Instr::IfFalse { cond, target } => write!(f, "if_false {cond}, {target}"),
            Instr::CallFn { function, base } => write!(f, "call_fn {function}, {base}"),
            Instr::CallNative { native, base } => write!(f, "call_native #{native}, {base}"),
            Instr::CallPtr { reg, base } => write!(f, "call_ptr {reg}, {base}"),
            Instr::Ret => f.write_str("ret"),
            Instr::Argv { dst } => write!(f, "argv {dst}"),
            Instr::Stop => f.write_str("stop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_syntax() {
        assert_eq!(Address::Local(16).to_string(), "$16");
        assert_eq!(Address::Global(0).to_string(), "@0");
        assert_eq!(Address::Literal(24).to_string(), "&24");
        assert_eq!(Mem::new(Register(2), 8).to_string(), "[%r2+8]");
        assert_eq!(Address::Local(8).offset(4), Address::Local(12));
    }

    #[test]
    fn instruction_text() {
        let add = Instr::Int {
            op: IntOp::Add,
            dst: Address::Local(16),
            lhs: Address::Local(0),
            rhs: Address::Local(8),
        };
        assert_eq!(add.to_string(), "iadd $16, $0, $8");

        let gaddr = Instr::Addr {
            reg: Register(0),
            src: Address::Global(8),
        };
        assert_eq!(gaddr.to_string(), "gaddr %r0, @8");

        let branch = Instr::IfFalse {
            cond: Address::Local(8),
            target: Label::new(LabelKind::Else, 3),
        };
        assert_eq!(branch.to_string(), "if_false $8, else_3");
    }

    #[test]
    fn label_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = LabelKind::ALL.iter().map(|k| k.prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), LabelKind::ALL.len());
    }
}
