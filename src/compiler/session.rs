//! Compilation session
//!
//! This module provides the [`Compiler`] struct: the single value that owns
//! every cursor, table and buffer of one compilation, plus the helpers the
//! grammar rules share (savepoints, expectations, symbol resolution, loads and
//! stores).
//!
//! # Organization
//!
//! Grammar rules are split across files with `impl Compiler` blocks:
//! - `declarations`: program, globals, constants, functions
//! - `statements`: blocks, control flow, assignments
//! - `expressions`: the flat left-to-right operator loop and operands
//!
//! # Backtracking
//!
//! A rule that does not recognize its input returns `Ok(false)` / `Ok(None)`.
//! [`Compiler::attempt`] wraps such a rule with a [`Savepoint`] (input cursor,
//! output offset and string pool size) and rolls all three back when the rule
//! reports no match, so code emitted by a half-recognized alternative never
//! survives. A rule that has committed to its input reports problems with
//! `Err(CompileError)`, which ends the compilation.

use super::emitter::Emitter;
use super::errors::{CompileError, CompileErrorKind};
use super::labels::LabelGenerator;
use super::scanner::{Cursor, Scanner};
use super::symbols::{SymbolKind, SymbolTable};
use super::types::{BaseKind, Type, MAX_INDIRECTION};
use log::{error, trace};
use rustc_hash::FxHashSet;

/// Data label holding the heap bump pointer
pub const HEAP_POINTER: &str = crate::vm::constants::HEAP_POINTER_LABEL;

/// Label placed after the program image; the heap starts here
pub const HEAP_BASE: &str = "__heap";

/// Trailing marker of a clean compilation
pub const OK_MARKER: &str = "; femtoc: ok";

/// Trailing marker of a failed compilation
pub const ERROR_MARKER: &str = "; femtoc: errors";

/// Capacity limits for one compilation
#[derive(Debug, Clone)]
pub struct Limits {
    /// Longest accepted source text, in bytes
    pub max_source_len: usize,
    /// Longest assembly output, in bytes
    pub max_output_len: usize,
    /// Entries per symbol table
    pub max_symbols: usize,
    /// Deepest nesting of blocks, statements and operands
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_source_len: 1024 * 1024,
            max_output_len: 4 * 1024 * 1024,
            max_symbols: 256,
            max_nesting: 64,
        }
    }
}

/// Snapshot of everything a failed alternative may have changed
#[derive(Debug, Clone, Copy)]
pub(crate) struct Savepoint {
    cursor: Cursor,
    output: usize,
    strings: usize,
}

/// Result of a rule that may not match its input
pub(crate) trait Matched {
    fn matched(&self) -> bool;
}

impl Matched for bool {
    fn matched(&self) -> bool {
        *self
    }
}

impl<T> Matched for Option<T> {
    fn matched(&self) -> bool {
        self.is_some()
    }
}

/// Where a resolved identifier lives
#[derive(Debug, Clone)]
pub(crate) enum Place {
    Constant { value: i64, ty: Type },
    Local { slot: usize, ty: Type },
    Argument { slot: usize, ty: Type },
    Global { name: String, ty: Type, kind: SymbolKind },
}

impl Place {
    pub(crate) fn ty(&self) -> Type {
        match self {
            Place::Constant { ty, .. }
            | Place::Local { ty, .. }
            | Place::Argument { ty, .. }
            | Place::Global { ty, .. } => *ty,
        }
    }
}

/// Finished compilation: assembly text plus any diagnostics
#[derive(Debug)]
pub struct Compilation {
    /// Assembly text, ending with [`OK_MARKER`] or [`ERROR_MARKER`]
    pub output: String,
    pub diagnostics: Vec<CompileError>,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The assembly text, or the first diagnostic
    pub fn into_result(self) -> Result<String, CompileError> {
        match self.diagnostics.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}

/// Single-pass compiler for one translation unit
pub struct Compiler<'src> {
    pub(crate) scanner: Scanner<'src>,
    pub(crate) out: Emitter,
    pub(crate) labels: LabelGenerator,
    pub(crate) locals: SymbolTable,
    pub(crate) arguments: SymbolTable,
    pub(crate) globals: SymbolTable,
    pub(crate) constants: SymbolTable,
    /// Values of `constants`, indexed by slot
    pub(crate) constant_values: Vec<i64>,
    /// String literal pool: (label, bytes)
    pub(crate) strings: Vec<(String, Vec<u8>)>,
    /// Functions that already have a body
    pub(crate) defined: FxHashSet<String>,
    /// Exit label of the innermost loop
    pub(crate) break_label: Option<String>,
    /// Head (or step) label of the innermost loop
    pub(crate) continue_label: Option<String>,
    /// Current nesting depth of grammar rules
    depth: usize,
    source_len: usize,
    limits: Limits,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str, limits: Limits) -> Self {
        Compiler {
            scanner: Scanner::new(source),
            out: Emitter::new(limits.max_output_len),
            labels: LabelGenerator::new(),
            locals: SymbolTable::new("locals", limits.max_symbols),
            arguments: SymbolTable::new("arguments", limits.max_symbols),
            globals: SymbolTable::new("globals", limits.max_symbols),
            constants: SymbolTable::new("constants", limits.max_symbols),
            constant_values: Vec::new(),
            strings: Vec::new(),
            defined: FxHashSet::default(),
            break_label: None,
            continue_label: None,
            depth: 0,
            source_len: source.len(),
            limits,
        }
    }

    /// Compile the whole translation unit
    ///
    /// The output always ends with a marker line telling whether the
    /// compilation was clean. On failure the output holds whatever was
    /// generated before the first error.
    pub fn compile(mut self) -> Compilation {
        let mut diagnostics = Vec::new();

        self.out.line("; generated by femtoc");
        if let Err(err) = self.compile_unit() {
            error!("{}", err);
            diagnostics.push(err);
        }

        let marker = if diagnostics.is_empty() {
            OK_MARKER
        } else {
            ERROR_MARKER
        };
        self.out.line(marker);

        Compilation {
            output: self.out.into_string(),
            diagnostics,
        }
    }

    fn compile_unit(&mut self) -> Result<(), CompileError> {
        if self.source_len > self.limits.max_source_len {
            return Err(CompileError::new(
                1,
                CompileErrorKind::Capacity {
                    what: "source text",
                    limit: self.limits.max_source_len,
                },
            ));
        }

        // Startup: set up the heap pointer, run main, stop with its result.
        self.out.pushl(HEAP_BASE);
        self.out.pushl(HEAP_POINTER);
        self.out.op("popi");
        self.out.pushl("main");
        self.out.op("call");
        self.out.op("halt");

        self.parse_program()?;

        for (label, bytes) in std::mem::take(&mut self.strings) {
            self.out.label(&label);
            let words: Vec<String> = bytes
                .iter()
                .map(|b| b.to_string())
                .chain(std::iter::once("0".to_string()))
                .collect();
            self.out.raw(&format!(".byte {}", words.join(",")));
        }
        self.out.label(HEAP_POINTER);
        self.out.raw(".zero 1");
        self.out.label(HEAP_BASE);
        self.check_output()
    }

    // ===== Backtracking =====

    pub(crate) fn savepoint(&self) -> Savepoint {
        Savepoint {
            cursor: self.scanner.cursor(),
            output: self.out.mark(),
            strings: self.strings.len(),
        }
    }

    pub(crate) fn rollback(&mut self, save: Savepoint) {
        trace!(
            "backtracking from line {} to line {}",
            self.scanner.line(),
            save.cursor.line
        );
        self.scanner.restore(save.cursor);
        self.out.truncate(save.output);
        self.strings.truncate(save.strings);
    }

    /// Run an alternative, undoing its input and output if it does not match
    pub(crate) fn attempt<R: Matched>(
        &mut self,
        alternative: impl FnOnce(&mut Self) -> Result<R, CompileError>,
    ) -> Result<R, CompileError> {
        let save = self.savepoint();
        let result = alternative(self)?;
        if !result.matched() {
            self.rollback(save);
        }
        Ok(result)
    }

    /// Run a recursive rule one nesting level deeper
    pub(crate) fn nested<R>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<R, CompileError>,
    ) -> Result<R, CompileError> {
        if self.depth >= self.limits.max_nesting {
            return Err(self.error(CompileErrorKind::Capacity {
                what: "nesting depth",
                limit: self.limits.max_nesting,
            }));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    // ===== Diagnostics =====

    pub(crate) fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.scanner.line(), kind)
    }

    /// "expected X, found <next input>"
    pub(crate) fn unexpected(&mut self, expected: &str) -> CompileError {
        let found = self.scanner.describe_next();
        self.error(CompileErrorKind::Unexpected {
            expected: expected.to_string(),
            found,
        })
    }

    pub(crate) fn check_output(&self) -> Result<(), CompileError> {
        if self.out.overflowed() {
            return Err(self.error(CompileErrorKind::Capacity {
                what: "assembly output",
                limit: self.out.limit(),
            }));
        }
        Ok(())
    }

    // ===== Expectations =====

    pub(crate) fn expect_sym(&mut self, sym: u8, ctx: &str) -> Result<(), CompileError> {
        if self.scanner.read_sym(sym)? {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}' {}", sym as char, ctx)))
        }
    }

    pub(crate) fn expect_id(&mut self, ctx: &str) -> Result<String, CompileError> {
        match self.scanner.read_id()? {
            Some(name) => Ok(name),
            None => Err(self.unexpected(&format!("identifier {}", ctx))),
        }
    }

    /// Parse `int|char|void` followed by any number of `*`
    pub(crate) fn parse_type(&mut self) -> Result<Option<Type>, CompileError> {
        let base = if self.scanner.read_str("int")? {
            BaseKind::Int
        } else if self.scanner.read_str("char")? {
            BaseKind::Char
        } else if self.scanner.read_str("void")? {
            BaseKind::None
        } else {
            return Ok(None);
        };

        let mut ty = Type::new(base);
        while self.scanner.read_sym(b'*')? {
            if ty.depth >= MAX_INDIRECTION {
                return Err(self.error(
                    super::types::TypeError::DepthExceeded(ty).into(),
                ));
            }
            ty.depth += 1;
        }
        Ok(Some(ty))
    }

    // ===== Symbols =====

    /// Look a name up: constants, then locals, then arguments, then globals
    pub(crate) fn lookup(&self, name: &str) -> Option<Place> {
        if let Some(sym) = self.constants.find(name) {
            return Some(Place::Constant {
                value: self.constant_values[sym.index],
                ty: sym.ty,
            });
        }
        if let Some(sym) = self.locals.find(name) {
            // Slot 0 is the function itself; naming it means the function.
            if sym.kind == SymbolKind::Data {
                return Some(Place::Local {
                    slot: sym.index,
                    ty: sym.ty,
                });
            }
        }
        if let Some(sym) = self.arguments.find(name) {
            return Some(Place::Argument {
                slot: sym.index,
                ty: sym.ty,
            });
        }
        self.globals.find(name).map(|sym| Place::Global {
            name: sym.name.clone(),
            ty: sym.ty,
            kind: sym.kind,
        })
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Place, CompileError> {
        self.lookup(name)
            .ok_or_else(|| self.error(CompileErrorKind::Undeclared(name.to_string())))
    }

    /// Name of the function being compiled (first entry of `locals`)
    pub(crate) fn current_function(&self) -> String {
        self.locals
            .first()
            .map(|sym| sym.name.clone())
            .unwrap_or_default()
    }

    /// Add a string literal to the pool and return its label
    pub(crate) fn intern_string(&mut self, bytes: Vec<u8>) -> String {
        let label = format!("_S_{}", self.strings.len());
        self.strings.push((label.clone(), bytes));
        label
    }

    // ===== Loads and stores =====

    /// Address of local slot `slot` (slot 0 holds the saved heap pointer)
    pub(crate) fn emit_local_address(&mut self, slot: usize) {
        self.out.op("pushsf");
        self.out.push(slot as i64 + 1);
        self.out.op("sub");
    }

    /// Push the address of a variable
    pub(crate) fn emit_address(&mut self, name: &str, place: &Place) -> Result<(), CompileError> {
        match place {
            Place::Local { slot, .. } => self.emit_local_address(*slot),
            Place::Argument { slot, .. } => {
                self.out.op("pushsf");
                self.out.push(*slot as i64 + 1);
                self.out.op("add");
            }
            Place::Global { .. } => self.out.pushl(name),
            Place::Constant { .. } => {
                return Err(self.error(CompileErrorKind::NotAssignable(name.to_string())));
            }
        }
        Ok(())
    }

    /// Push the value of a variable
    ///
    /// Global arrays and functions evaluate to their address; local arrays
    /// evaluate to the heap pointer stored in their slot.
    pub(crate) fn emit_load(&mut self, name: &str, place: &Place) -> Result<(), CompileError> {
        match place {
            Place::Constant { value, .. } => self.out.push(*value),
            Place::Global { ty, kind, .. } if ty.array || *kind == SymbolKind::Function => {
                self.out.pushl(name)
            }
            _ => {
                self.emit_address(name, place)?;
                self.out.op("pushi");
            }
        }
        Ok(())
    }

    /// Store the value on top of the stack into a variable
    pub(crate) fn emit_store(
        &mut self,
        name: &str,
        place: &Place,
        value: Type,
    ) -> Result<(), CompileError> {
        let target = place.ty();
        let assignable = match place {
            Place::Constant { .. } => false,
            Place::Global { kind, .. } => *kind == SymbolKind::Data && !target.array,
            _ => !target.array,
        };
        if !assignable {
            return Err(self.error(CompileErrorKind::NotAssignable(name.to_string())));
        }
        self.check_assignment(target, value)?;
        self.emit_address(name, place)?;
        self.out.op("popi");
        Ok(())
    }

    pub(crate) fn check_assignment(&self, target: Type, value: Type) -> Result<(), CompileError> {
        if target.accepts(&value) {
            Ok(())
        } else {
            Err(self.error(CompileErrorKind::TypeMismatch {
                target: target.to_string(),
                value: value.to_string(),
            }))
        }
    }
}

/// Compile `source` with default limits, returning the assembly text
pub fn compile(source: &str) -> Result<String, CompileError> {
    Compiler::new(source, Limits::default()).compile().into_result()
}
