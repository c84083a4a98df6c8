//! Top-level grammar: the program and its declarations
//!
//! ```text
//! program     := { directive | declaration }
//! directive   := '#' <rest of line> | 'asm' '{' <raw> '}'
//! declaration := 'const' type id '=' literal ';'
//!              | type id '(' params ')' ( ';' | block )
//!              | type id [ '[' size ']' | '=' literal ] ';'
//! ```

use super::emitter::Emitter;
use super::errors::{CompileError, CompileErrorKind};
use super::session::{Compiler, HEAP_POINTER};
use super::symbols::SymbolKind;
use super::types::{BaseKind, Type};
use log::{debug, warn};

impl Compiler<'_> {
    pub(crate) fn parse_program(&mut self) -> Result<(), CompileError> {
        while !self.scanner.at_end()? {
            if !self.parse_directive()? {
                self.parse_declaration()?;
            }
            self.check_output()?;
        }
        Ok(())
    }

    /// Preprocessor lines and top-level `asm` blocks
    fn parse_directive(&mut self) -> Result<bool, CompileError> {
        if self.scanner.read_sym(b'#')? {
            let line = self.scanner.line();
            let text = self.scanner.rest_of_line();
            warn!("line {}: ignoring directive '#{}'", line, text.trim_end());
            return Ok(true);
        }
        if self.scanner.read_str("asm")? {
            self.parse_asm_body()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// `{ raw lines }` after the `asm` keyword; lines are copied verbatim
    pub(crate) fn parse_asm_body(&mut self) -> Result<(), CompileError> {
        self.expect_sym(b'{', "after 'asm'")?;
        let body = self.scanner.raw_until(b'}')?;
        self.expect_sym(b'}', "closing 'asm' block")?;
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.out.raw(line);
        }
        Ok(())
    }

    fn parse_declaration(&mut self) -> Result<(), CompileError> {
        let is_const = self.scanner.read_str("const")?;
        let ty = match self.parse_type()? {
            Some(ty) => ty,
            None => return Err(self.unexpected("a declaration")),
        };
        let name = self.expect_id("after type")?;

        if is_const {
            return self.parse_constant(ty, &name);
        }
        if self.scanner.read_sym(b'(')? {
            return self.parse_function(ty, &name);
        }
        self.parse_global(ty, &name)
    }

    /// Reject names already taken by a global or a constant
    fn check_fresh_global(&self, name: &str) -> Result<(), CompileError> {
        if self.globals.find(name).is_some() || self.constants.find(name).is_some() {
            return Err(self.error(CompileErrorKind::Duplicate(name.to_string())));
        }
        Ok(())
    }

    /// Reject global names that would clash with generated labels
    ///
    /// Names starting with `__` or `_` and a capital letter belong to the
    /// compiler, and `f_end` is taken once a function `f` exists (and the
    /// other way round).
    fn check_label_name(&self, name: &str, is_function: bool) -> Result<(), CompileError> {
        let reserved = name.starts_with('_')
            && name
                .chars()
                .nth(1)
                .is_some_and(|c| c == '_' || c.is_ascii_uppercase());
        let ends_function = name
            .strip_suffix("_end")
            .and_then(|f| self.globals.find(f))
            .is_some_and(|sym| sym.kind == SymbolKind::Function);
        if reserved || ends_function {
            return Err(self.error(CompileErrorKind::Reserved(name.to_string())));
        }

        let end = format!("{}_end", name);
        if is_function && self.globals.find(&end).is_some() {
            return Err(self.error(CompileErrorKind::Reserved(end)));
        }
        Ok(())
    }

    fn check_not_void(&self, ty: Type) -> Result<(), CompileError> {
        if ty.base == BaseKind::None && ty.depth == 0 {
            return Err(self.error(CompileErrorKind::Unexpected {
                expected: "a variable type".to_string(),
                found: "'void'".to_string(),
            }));
        }
        Ok(())
    }

    /// `const T NAME = literal;`
    fn parse_constant(&mut self, ty: Type, name: &str) -> Result<(), CompileError> {
        self.check_not_void(ty)?;
        self.check_fresh_global(name)?;
        self.expect_sym(b'=', "in constant declaration")?;
        let value = self.parse_literal()?;
        self.expect_sym(b';', "after constant declaration")?;

        let slot = self
            .constants
            .store(ty, name)
            .map_err(|e| self.error(e.into()))?;
        debug_assert_eq!(slot, self.constant_values.len());
        self.constant_values.push(value);
        debug!("constant {} = {}", name, value);
        Ok(())
    }

    /// Integer (optionally negative) or character literal
    fn parse_literal(&mut self) -> Result<i64, CompileError> {
        let negative = self.scanner.read_sym(b'-')?;
        let value = if let Some(n) = self.scanner.read_number()? {
            n
        } else if let Some(c) = self.scanner.read_char_literal()? {
            c
        } else {
            return Err(self.unexpected("a literal value"));
        };
        Ok(if negative { value.wrapping_neg() } else { value })
    }

    /// Array length: a number or the name of a constant
    fn parse_array_size(&mut self) -> Result<i64, CompileError> {
        let size = if let Some(n) = self.scanner.read_number()? {
            n
        } else if let Some(id) = self.scanner.read_id()? {
            match self.constants.find(&id) {
                Some(sym) => self.constant_values[sym.index],
                None => return Err(self.error(CompileErrorKind::Undeclared(id))),
            }
        } else {
            return Err(self.unexpected("an array size"));
        };
        if size <= 0 {
            return Err(self.unexpected("a positive array size"));
        }
        Ok(size)
    }

    /// Global variable or array
    fn parse_global(&mut self, ty: Type, name: &str) -> Result<(), CompileError> {
        self.check_not_void(ty)?;
        self.check_fresh_global(name)?;
        self.check_label_name(name, false)?;

        if self.scanner.read_sym(b'[')? {
            let len = self.parse_array_size()?;
            self.expect_sym(b']', "after array size")?;
            self.expect_sym(b';', "after global declaration")?;
            let ty = ty.as_array();
            self.globals
                .store(ty, name)
                .map_err(|e| self.error(e.into()))?;
            self.out.label(name);
            self.out.raw(&format!(".zero {}", len * ty.sizeof()));
            debug!("global array {} ({} x {})", name, len, ty);
            return Ok(());
        }

        let value = if self.scanner.read_sym(b'=')? {
            self.parse_literal()?
        } else {
            0
        };
        self.expect_sym(b';', "after global declaration")?;
        self.globals
            .store(ty, name)
            .map_err(|e| self.error(e.into()))?;

        // The value lives in the first cell; the rest pads to sizeof.
        self.out.label(name);
        self.out.raw(&format!(".byte {}", value));
        if ty.sizeof() > 1 {
            self.out.raw(&format!(".zero {}", ty.sizeof() - 1));
        }
        debug!("global {} {} = {}", ty, name, value);
        Ok(())
    }

    /// Function prototype or definition, after `T name (`
    fn parse_function(&mut self, ret: Type, name: &str) -> Result<(), CompileError> {
        match self.globals.find(name).map(|sym| sym.kind) {
            Some(SymbolKind::Function) => {}
            Some(SymbolKind::Data) => {
                return Err(self.error(CompileErrorKind::Duplicate(name.to_string())))
            }
            None => {
                self.check_fresh_global(name)?;
                self.check_label_name(name, true)?;
                self.globals
                    .store_kind(ret, name, SymbolKind::Function)
                    .map_err(|e| self.error(e.into()))?;
            }
        }

        self.locals.clear();
        self.arguments.clear();
        // Local slot 0 is the function itself; it holds the saved heap pointer.
        self.locals
            .store_kind(ret, name, SymbolKind::Function)
            .map_err(|e| self.error(e.into()))?;

        self.parse_params()?;
        self.expect_sym(b')', "after parameters")?;

        if self.scanner.read_sym(b';')? {
            self.locals.clear();
            self.arguments.clear();
            return Ok(());
        }
        if !self.defined.insert(name.to_string()) {
            return Err(self.error(CompileErrorKind::Redefinition(name.to_string())));
        }

        self.out.label(name);
        let prologue_at = self.out.mark();
        self.break_label = None;
        self.continue_label = None;
        self.parse_block()?;

        // Falling off the end returns 0.
        self.out.push(0);
        self.out.label(&format!("{}_end", name));
        self.emit_local_address(0);
        self.out.op("pushi");
        self.out.pushl(HEAP_POINTER);
        self.out.op("popi");
        self.out.op("ret");

        // Now that every local is known, reserve their slots up front.
        let mut prologue = Emitter::new(usize::MAX);
        prologue.pushl(HEAP_POINTER);
        prologue.op("pushi");
        for _ in 1..self.locals.len() {
            prologue.push(0);
        }
        self.out.insert(prologue_at, prologue.as_str());

        debug!(
            "function {} ({} arguments, {} locals)",
            name,
            self.arguments.len(),
            self.locals.len() - 1
        );
        self.locals.clear();
        self.arguments.clear();
        Ok(())
    }

    /// `void` | `T id { , T id }` | nothing
    fn parse_params(&mut self) -> Result<(), CompileError> {
        if self.scanner.peek_sym(b')')? {
            return Ok(());
        }
        let save = self.scanner.cursor();
        if self.scanner.read_str("void")? && self.scanner.peek_sym(b')')? {
            return Ok(());
        }
        self.scanner.restore(save);

        loop {
            let ty = match self.parse_type()? {
                Some(ty) => ty,
                None => return Err(self.unexpected("a parameter type")),
            };
            self.check_not_void(ty)?;
            let name = self.expect_id("for parameter")?;
            if self.locals.find(&name).is_some() {
                return Err(self.error(CompileErrorKind::Duplicate(name)));
            }
            self.arguments
                .store(ty, &name)
                .map_err(|e| self.error(e.into()))?;
            if !self.scanner.read_sym(b',')? {
                return Ok(());
            }
        }
    }
}
