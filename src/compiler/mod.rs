//! Single-pass compiler from a small C dialect to stack-machine assembly
//!
//! The compiler never builds a syntax tree. A recursive-descent parser reads
//! the source through a backtracking [`scanner`] and writes assembly text as
//! soon as each construct is recognized. Alternatives that turn out not to
//! match are rolled back (input and output together) before the next one is
//! tried.
//!
//! # Module Organization
//!
//! - [`scanner`]: cursor-based lexical reads with savepoints
//! - [`types`]: base kinds, indirection, sizes, assignment compatibility
//! - [`symbols`]: the four flat symbol tables
//! - [`labels`]: unique jump-target names
//! - [`emitter`]: the assembly text buffer
//! - [`errors`]: line-tagged compile errors
//! - `session`: the [`Compiler`] itself and the helpers shared by
//!   `declarations`, `statements` and `expressions`

pub mod emitter;
pub mod errors;
pub mod labels;
pub mod scanner;
pub mod symbols;
pub mod types;

mod declarations;
mod expressions;
mod session;
mod statements;

pub use errors::{CompileError, CompileErrorKind};
pub use session::{
    compile, Compilation, Compiler, Limits, ERROR_MARKER, HEAP_BASE, HEAP_POINTER, OK_MARKER,
};
pub use types::{Type, WORD_SIZE};
