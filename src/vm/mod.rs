//! Stack virtual machine
//!
//! This module turns assembly text into a word image and executes it:
//! - [`assembler`]: two-phase text → [`Image`] translation with label fixups
//! - [`machine`]: the fetch-decode-execute loop over one flat memory
//! - [`opcode`]: instruction set and mnemonic table
//! - [`console`]: byte I/O seam for `input` / `output`
//! - [`trace`]: colored per-instruction debug trace
//! - [`errors`]: assembly and runtime errors
//!
//! # Execution Model
//!
//! Words are signed 64-bit integers and addresses count words. The operand
//! stack lives at the top of memory and grows down; a separate frame stack
//! holds the saved stack pointer of each active call.

pub mod assembler;
pub mod console;
pub mod constants;
pub mod errors;
pub mod machine;
pub mod opcode;
pub mod trace;

pub use assembler::{assemble, assemble_with, AssemblerLimits, Image};
pub use console::{BufferConsole, Console, StdConsole};
pub use errors::{AssembleError, Fault, RuntimeError};
pub use machine::{Machine, MachineConfig, Status};
pub use opcode::Opcode;
