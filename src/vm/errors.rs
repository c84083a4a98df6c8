//! Assembly and runtime error types for the VM
//!
//! [`AssembleError`] is line-tagged like the compiler's diagnostics.
//! [`RuntimeError`] carries the address and opcode of the instruction that
//! failed; every runtime error halts the machine.

use super::opcode::Opcode;

/// Errors raised while turning assembly text into an image
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    #[error("line {line}: unknown mnemonic '{name}'")]
    UnknownMnemonic { line: usize, name: String },

    #[error("line {line}: '{mnemonic}' needs an operand")]
    MissingOperand { line: usize, mnemonic: &'static str },

    #[error("line {line}: invalid operand '{operand}'")]
    InvalidOperand { line: usize, operand: String },

    #[error("line {line}: label '{name}' is already defined")]
    DuplicateLabel { line: usize, name: String },

    #[error("line {line}: unresolved label '{name}'")]
    UnresolvedLabel { line: usize, name: String },

    #[error("too many labels (limit {limit})")]
    TooManyLabels { limit: usize },

    #[error("program image exceeds {limit} words")]
    ImageTooLarge { limit: usize },
}

/// What went wrong while executing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("operand stack underflow (needs {needed}, has {available})")]
    StackUnderflow { needed: usize, available: usize },

    #[error("operand stack overflow into the program image")]
    StackOverflow,

    #[error("operand stack ran into the heap (heap top {heap_top})")]
    HeapCollision { heap_top: usize },

    #[error("frame stack overflow (limit {limit})")]
    FrameOverflow { limit: usize },

    #[error("no active frame")]
    FrameUnderflow,

    #[error("memory access out of bounds at {0}")]
    MemoryAccess(i64),

    #[error("invalid opcode {0}")]
    InvalidOpcode(i64),

    #[error("division by zero")]
    DivisionByZero,

    #[error("step limit of {0} reached")]
    StepLimit(u64),

    #[error("program image ({image} words) does not fit in memory ({memory} words)")]
    ImageTooLarge { image: usize, memory: usize },

    #[error("console I/O failed: {0}")]
    Io(String),
}

/// A fault together with the instruction that raised it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("runtime error at {addr} ({}): {fault}", describe(.opcode))]
pub struct RuntimeError {
    pub addr: usize,
    pub opcode: Option<Opcode>,
    pub fault: Fault,
}

fn describe(opcode: &Option<Opcode>) -> &'static str {
    opcode.map_or("-", Opcode::mnemonic)
}

impl RuntimeError {
    pub fn new(addr: usize, opcode: Option<Opcode>, fault: Fault) -> Self {
        RuntimeError {
            addr,
            opcode,
            fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::new(
            12,
            Some(Opcode::Add),
            Fault::StackUnderflow {
                needed: 2,
                available: 1,
            },
        );
        assert_eq!(
            err.to_string(),
            "runtime error at 12 (add): operand stack underflow (needs 2, has 1)"
        );

        let err = RuntimeError::new(3, None, Fault::InvalidOpcode(99));
        assert_eq!(err.to_string(), "runtime error at 3 (-): invalid opcode 99");
    }

    #[test]
    fn test_unresolved_label_message() {
        let err = AssembleError::UnresolvedLabel {
            line: 4,
            name: "nowhere".into(),
        };
        assert!(err.to_string().contains("unresolved label"));
    }
}
