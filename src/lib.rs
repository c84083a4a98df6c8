//! # Introduction
//!
//! femtoc compiles a small C dialect into assembly for a stack virtual
//! machine, and ships the assembler and interpreter for that machine.
//!
//! ## Pipeline
//!
//! ```text
//! C source → Compiler → assembly text → Assembler → Image → Machine
//! ```
//!
//! 1. [`compiler`]: single-pass recursive descent with backtracking; emits
//!    assembly text directly, no syntax tree.
//! 2. [`vm::assembler`]: two-phase translation of assembly text into a word
//!    image, resolving labels.
//! 3. [`vm::machine`]: executes the image with an operand stack and a
//!    separate frame stack.
//!
//! ## Supported C subset
//!
//! Types: `int`, `char`, `void`, pointers up to three levels, arrays.
//! Control flow: `if/else`, `while`, `for`, `break`, `continue`, `goto`,
//! `return`. Expressions evaluate strictly left to right with no operator
//! precedence. Inline `asm { ... }` blocks pass text through to the output.
//! There is no standard library: I/O is done with the `input` and `output`
//! instructions from inline assembly.

pub mod compiler;
pub mod error;
pub mod vm;

pub use error::Error;

use vm::{Console, Machine, MachineConfig};

/// A finished run: the program's result and the console it used
#[derive(Debug)]
pub struct Outcome<C> {
    /// Word on top of the stack at `halt` (the value `main` returned)
    pub result: i64,
    pub steps: u64,
    pub console: C,
}

/// Compile, assemble and run `source`
pub fn run_source<C: Console>(
    source: &str,
    config: MachineConfig,
    console: C,
) -> Result<Outcome<C>, Error> {
    let assembly = compiler::compile(source)?;
    run_assembly(&assembly, config, console)
}

/// Assemble and run assembly text
pub fn run_assembly<C: Console>(
    assembly: &str,
    config: MachineConfig,
    console: C,
) -> Result<Outcome<C>, Error> {
    let image = vm::assemble(assembly)?;
    let mut machine = Machine::new(&image, config, console)?;
    let result = machine.run()?;
    let steps = machine.steps();
    Ok(Outcome {
        result,
        steps,
        console: machine.into_console(),
    })
}
