//! Compiler configuration.

use tern_core::CompilationError;

/// Options controlling code generation and the emitted header.
///
/// # Example
///
/// ```
/// use tern_compiler::CompilerOptions;
///
/// let options = CompilerOptions::default()
///     .with_optimize(false)
///     .with_stack_size(4096);
/// assert!(!options.optimize);
/// assert_eq!(options.bits, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Write expression results straight into their destination when possible.
    pub optimize: bool,
    /// Output format version written to the header.
    pub version: u32,
    /// Pointer width in bits (64 or 32).
    pub bits: u32,
    /// VM stack size written to the header.
    pub stack_size: u32,
    /// Size of the virtual register pool.
    pub register_count: u8,
    /// Name of the function the entry section calls.
    pub entry_point: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            version: 1,
            bits: 64,
            stack_size: 65536,
            register_count: 8,
            entry_point: "main".to_string(),
        }
    }
}

impl CompilerOptions {
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_stack_size(mut self, stack_size: u32) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_register_count(mut self, register_count: u8) -> Self {
        self.register_count = register_count;
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Pointer size in bytes.
    pub fn pointer_size(&self) -> u32 {
        self.bits / 8
    }

    /// Reject configurations the code generator cannot honour.
    pub fn validate(&self) -> Result<(), CompilationError> {
        if self.bits != 64 && self.bits != 32 {
            return Err(CompilationError::internal(format!(
                "unsupported pointer width {} (expected 32 or 64)",
                self.bits
            )));
        }
        // Dispatch and indexing need up to three live registers.
        if self.register_count < 3 {
            return Err(CompilationError::internal(format!(
                "register pool of {} is too small (need at least 3)",
                self.register_count
            )));
        }
        if self.stack_size == 0 {
            return Err(CompilationError::internal("stack size must be non-zero"));
        }
        if self.entry_point.is_empty() {
            return Err(CompilationError::internal("entry point name is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CompilerOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_odd_pointer_width() {
        let err = CompilerOptions::default().with_bits(16).validate().unwrap_err();
        assert!(matches!(err, CompilationError::Internal { .. }));
    }

    #[test]
    fn rejects_tiny_register_pool() {
        assert!(
            CompilerOptions::default()
                .with_register_count(2)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn pointer_size_follows_bits() {
        assert_eq!(CompilerOptions::default().pointer_size(), 8);
        assert_eq!(CompilerOptions::default().with_bits(32).pointer_size(), 4);
    }
}
