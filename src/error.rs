//! Crate-level error type
//!
//! Each pipeline stage has its own error enum; [`Error`] wraps them so the
//! binaries and [`crate::run_source`] can propagate any of them with `?`.

use crate::compiler::CompileError;
use crate::vm::{AssembleError, RuntimeError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("assembly error: {0}")]
    Assemble(#[from] AssembleError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
