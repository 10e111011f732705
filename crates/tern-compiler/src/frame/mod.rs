//! Frame and output management.
//!
//! The [`FrameManager`] hands out storage and registers for the function
//! being compiled and buffers its instructions:
//!
//! - stack slots are bump-allocated inside the innermost block and reclaimed
//!   in bulk when the block is restored, strictly LIFO
//! - global slots grow monotonically and are never reclaimed
//! - registers come from a small fixed pool, reused last-in first-out
//! - labels are numbered per [`LabelKind`] across the whole compilation
//!
//! Finished functions are collected in an [`Output`], which renders the final
//! pseudo-assembly text.

pub mod instr;
pub mod output;

use tern_core::CompilationError;
use thiserror::Error;

pub use instr::{
    Address, ConvertOp, FloatOp, Instr, IntOp, Label, LabelKind, Mem, Register, UnaryOpcode,
};
pub use output::{FunctionRecord, Output};

/// Misuse of the frame manager. Always a compiler bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("all {count} registers are in use")]
    RegistersExhausted { count: u8 },
    #[error("block restored out of order (depth {expected}, found {found})")]
    UnbalancedRestore { expected: usize, found: usize },
}

impl From<FrameError> for CompilationError {
    fn from(err: FrameError) -> Self {
        CompilationError::internal(err.to_string())
    }
}

/// A saved stack position, returned by [`FrameManager::push_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pushed block must be restored"]
pub struct Checkpoint {
    sp: u32,
    depth: usize,
}

/// Storage, register, label and instruction state of a compilation.
#[derive(Debug)]
pub struct FrameManager {
    /// Next free frame-relative byte.
    sp: u32,
    /// Stack pointer at each open block.
    blocks: Vec<u32>,
    global_len: u32,
    register_count: u8,
    /// Free registers; the next one handed out is last.
    free_regs: Vec<Register>,
    label_counters: [u32; LabelKind::ALL.len()],
    code: Vec<Instr>,
}

impl FrameManager {
    pub fn new(register_count: u8) -> Self {
        Self {
            sp: 0,
            blocks: Vec::new(),
            global_len: 0,
            register_count,
            free_regs: (0..register_count).rev().map(Register).collect(),
            label_counters: [0; LabelKind::ALL.len()],
            code: Vec::new(),
        }
    }

    // ==========================================================================
    // Stack
    // ==========================================================================

    /// Current stack pointer.
    pub fn sp(&self) -> u32 {
        self.sp
    }

    /// The first free frame slot.
    pub fn top(&self) -> Address {
        Address::Local(self.sp)
    }

    /// Open a block; everything allocated until the matching
    /// [`FrameManager::restore`] is released together.
    pub fn push_block(&mut self) -> Checkpoint {
        self.blocks.push(self.sp);
        Checkpoint {
            sp: self.sp,
            depth: self.blocks.len(),
        }
    }

    /// Close the innermost block, rewinding the stack pointer.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), FrameError> {
        if self.blocks.len() != checkpoint.depth {
            return Err(FrameError::UnbalancedRestore {
                expected: checkpoint.depth,
                found: self.blocks.len(),
            });
        }
        self.blocks.pop();
        self.sp = checkpoint.sp;
        Ok(())
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.len()
    }

    /// Allocate `len` bytes in the current block.
    pub fn alloc(&mut self, len: u32) -> Address {
        let address = Address::Local(self.sp);
        self.sp += len;
        address
    }

    /// Allocate `len` bytes of global data.
    pub fn alloc_global(&mut self, len: u32) -> Address {
        let address = Address::Global(self.global_len);
        self.global_len += len;
        address
    }

    pub fn global_len(&self) -> u32 {
        self.global_len
    }

    // ==========================================================================
    // Registers
    // ==========================================================================

    pub fn acquire_reg(&mut self) -> Result<Register, FrameError> {
        self.free_regs.pop().ok_or(FrameError::RegistersExhausted {
            count: self.register_count,
        })
    }

    pub fn release_reg(&mut self, reg: Register) {
        debug_assert!(!self.free_regs.contains(&reg), "{reg} released twice");
        self.free_regs.push(reg);
    }

    pub fn free_registers(&self) -> usize {
        self.free_regs.len()
    }

    // ==========================================================================
    // Labels
    // ==========================================================================

    /// A fresh label of `kind`.
    pub fn label(&mut self, kind: LabelKind) -> Label {
        let counter = &mut self.label_counters[kind.index()];
        let label = Label::new(kind, *counter);
        *counter += 1;
        tracing::trace!(%label, "new label");
        label
    }

    // ==========================================================================
    // Instructions
    // ==========================================================================

    pub fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    pub fn place(&mut self, label: Label) {
        self.code.push(Instr::Label(label));
    }

    pub fn goto(&mut self, label: Label) {
        self.code.push(Instr::Goto(label));
    }

    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Drop instructions emitted after `len`.
    pub fn truncate_code(&mut self, len: usize) {
        self.code.truncate(len);
    }

    /// Start a new function body: empty frame, empty buffer.
    pub fn begin_function(&mut self) {
        self.sp = 0;
        self.blocks.clear();
        self.code.clear();
    }

    /// Take the buffered instructions of the finished function.
    pub fn take_code(&mut self) -> Vec<Instr> {
        std::mem::take(&mut self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_rewinds_stack() {
        let mut frame = FrameManager::new(4);
        assert_eq!(frame.alloc(8), Address::Local(0));
        let cp = frame.push_block();
        assert_eq!(frame.alloc(8), Address::Local(8));
        assert_eq!(frame.alloc(1), Address::Local(16));
        frame.restore(cp).unwrap();
        assert_eq!(frame.sp(), 8);
        assert_eq!(frame.alloc(8), Address::Local(8));
    }

    #[test]
    fn out_of_order_restore_fails() {
        let mut frame = FrameManager::new(4);
        let outer = frame.push_block();
        let inner = frame.push_block();
        assert!(matches!(
            frame.restore(outer),
            Err(FrameError::UnbalancedRestore { .. })
        ));
        frame.restore(inner).unwrap();
        frame.restore(outer).unwrap();
        assert_eq!(frame.block_depth(), 0);
    }

    #[test]
    fn globals_are_never_reclaimed() {
        let mut frame = FrameManager::new(4);
        assert_eq!(frame.alloc_global(8), Address::Global(0));
        frame.begin_function();
        assert_eq!(frame.alloc_global(1), Address::Global(8));
        assert_eq!(frame.global_len(), 9);
    }

    #[test]
    fn registers_are_lifo_and_bounded() {
        let mut frame = FrameManager::new(2);
        let r0 = frame.acquire_reg().unwrap();
        let r1 = frame.acquire_reg().unwrap();
        assert_eq!((r0, r1), (Register(0), Register(1)));
        assert!(matches!(
            frame.acquire_reg(),
            Err(FrameError::RegistersExhausted { count: 2 })
        ));
        frame.release_reg(r1);
        assert_eq!(frame.acquire_reg().unwrap(), Register(1));
    }

    #[test]
    fn labels_count_per_kind() {
        let mut frame = FrameManager::new(4);
        assert_eq!(frame.label(LabelKind::Else).to_string(), "else_0");
        assert_eq!(frame.label(LabelKind::Else).to_string(), "else_1");
        assert_eq!(frame.label(LabelKind::Loop).to_string(), "loop_0");
        frame.begin_function();
        // Labels stay unique across functions.
        assert_eq!(frame.label(LabelKind::Else).to_string(), "else_2");
    }

    #[test]
    fn frame_error_is_internal() {
        let err: CompilationError = FrameError::RegistersExhausted { count: 8 }.into();
        assert_eq!(err.kind(), tern_core::ErrorKind::Internal);
    }
}
