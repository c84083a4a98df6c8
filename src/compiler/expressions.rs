//! Expression grammar
//!
//! Expressions have no precedence: operands and binary operators are
//! consumed strictly left to right, and each operator is emitted as soon as
//! its right operand has been compiled, so `1 + 2 * 3` is `(1 + 2) * 3`.
//! Parentheses are the only way to group.
//!
//! ```text
//! expr    := operand { binop operand }
//! operand := '(' type ')' operand | '(' expr ')'
//!          | '!' operand | '~' operand | '-' operand | '*' operand | '&' id
//!          | number | char | string | 'sizeof' '(' type ')'
//!          | id '(' args ')' | id '[' expr ']' | id
//! ```
//!
//! An expression ends (without consuming it) at `,` `;` `)` or `]`.
//!
//! # Pointer Arithmetic
//!
//! For `+` and `-`, an integer operand next to a pointer is multiplied by the
//! pointee size before the operation:
//!
//! ```text
//! int *p;  p + 1   →   <p> push 1 push 4 mul add
//! int *p;  1 + p   →   push 1 <p> swap push 4 mul add
//! ```
//!
//! Pointer minus pointer is left unscaled and yields an `int`.

use super::errors::{CompileError, CompileErrorKind};
use super::session::{Compiler, Place};
use super::symbols::SymbolKind;
use super::types::Type;

/// How the result type of a binary operator is formed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpClass {
    Add,
    Sub,
    Plain,
}

struct BinaryOp {
    symbol: &'static str,
    code: &'static [&'static str],
    class: OpClass,
}

/// Two-character operators must come before their one-character prefixes
const BINARY_OPS: &[BinaryOp] = &[
    BinaryOp { symbol: "==", code: &["cmpeq"], class: OpClass::Plain },
    BinaryOp { symbol: "!=", code: &["cmpne"], class: OpClass::Plain },
    BinaryOp { symbol: "<=", code: &["cmple"], class: OpClass::Plain },
    BinaryOp { symbol: ">=", code: &["cmpge"], class: OpClass::Plain },
    // a && b  ==  !(!a | !b)
    BinaryOp { symbol: "&&", code: &["not", "swap", "not", "or", "not"], class: OpClass::Plain },
    // a || b  ==  !(!a & !b)
    BinaryOp { symbol: "||", code: &["not", "swap", "not", "and", "not"], class: OpClass::Plain },
    BinaryOp { symbol: "+", code: &["add"], class: OpClass::Add },
    BinaryOp { symbol: "-", code: &["sub"], class: OpClass::Sub },
    BinaryOp { symbol: "*", code: &["mul"], class: OpClass::Plain },
    BinaryOp { symbol: "/", code: &["div"], class: OpClass::Plain },
    BinaryOp { symbol: "%", code: &["mod"], class: OpClass::Plain },
    BinaryOp { symbol: "<", code: &["cmplt"], class: OpClass::Plain },
    BinaryOp { symbol: ">", code: &["cmpgt"], class: OpClass::Plain },
    BinaryOp { symbol: "&", code: &["and"], class: OpClass::Plain },
    BinaryOp { symbol: "|", code: &["or"], class: OpClass::Plain },
];

impl Compiler<'_> {
    /// Compile an expression, leaving its value on the stack
    pub(crate) fn parse_expr(&mut self) -> Result<Option<Type>, CompileError> {
        let Some(mut ty) = self.parse_operand()? else {
            return Ok(None);
        };

        while !self.at_expr_end()? {
            let Some(op) = self.read_binary_op()? else {
                return Err(self.unexpected("an operator or the end of the expression"));
            };
            let Some(rhs) = self.parse_operand()? else {
                return Err(self.unexpected(&format!("an operand after '{}'", op.symbol)));
            };
            ty = self.emit_binary(op, ty, rhs);
        }
        Ok(Some(ty))
    }

    /// Compile an expression that must be present
    pub(crate) fn expect_expr(&mut self, what: &str) -> Result<Type, CompileError> {
        match self.parse_expr()? {
            Some(ty) => Ok(ty),
            None => Err(self.unexpected(what)),
        }
    }

    fn at_expr_end(&mut self) -> Result<bool, CompileError> {
        if self.scanner.at_end()? {
            return Ok(true);
        }
        for sym in [b',', b';', b')', b']'] {
            if self.scanner.peek_sym(sym)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_binary_op(&mut self) -> Result<Option<&'static BinaryOp>, CompileError> {
        for op in BINARY_OPS {
            if self.scanner.read_str(op.symbol)? {
                return Ok(Some(op));
            }
        }
        Ok(None)
    }

    /// Emit `op` for operands of type `lhs` and `rhs` already on the stack
    fn emit_binary(&mut self, op: &BinaryOp, lhs: Type, rhs: Type) -> Type {
        let scaled = matches!(op.class, OpClass::Add | OpClass::Sub);
        let result = match (lhs.is_pointer_like(), rhs.is_pointer_like()) {
            (true, false) if scaled => {
                self.emit_scale(lhs.element_size());
                lhs.decay()
            }
            (false, true) if op.class == OpClass::Add => {
                self.out.op("swap");
                self.emit_scale(rhs.element_size());
                rhs.decay()
            }
            _ => Type::int(),
        };
        self.out.ops(op.code);
        result
    }

    fn emit_scale(&mut self, size: i64) {
        if size > 1 {
            self.out.push(size);
            self.out.op("mul");
        }
    }

    /// Compile one operand; `None` if the input does not start one
    pub(crate) fn parse_operand(&mut self) -> Result<Option<Type>, CompileError> {
        self.nested(Self::operand)
    }

    fn operand(&mut self) -> Result<Option<Type>, CompileError> {
        if self.scanner.peek_sym(b'(')? {
            if let Some(ty) = self.attempt(Self::parse_cast)? {
                return Ok(Some(ty));
            }
            self.expect_sym(b'(', "")?;
            let ty = self.expect_expr("an expression")?;
            self.expect_sym(b')', "to close expression")?;
            return Ok(Some(ty));
        }

        if self.scanner.read_sym(b'!')? {
            self.expect_operand("'!'")?;
            self.out.op("not");
            return Ok(Some(Type::int()));
        }
        if self.scanner.read_sym(b'~')? {
            self.expect_operand("'~'")?;
            self.out.op("inv");
            return Ok(Some(Type::int()));
        }
        if self.scanner.read_sym(b'-')? {
            let ty = self.expect_operand("'-'")?;
            self.out.op("inv");
            self.out.push(1);
            self.out.op("add");
            return Ok(Some(ty));
        }
        if self.scanner.read_sym(b'*')? {
            let pointer = self.expect_operand("'*'")?;
            let ty = pointer.dereference().map_err(|e| self.error(e.into()))?;
            self.out.op("pushi");
            return Ok(Some(ty));
        }
        if self.scanner.read_sym(b'&')? {
            return self.parse_address_of().map(Some);
        }

        if let Some(n) = self.scanner.read_number()? {
            self.out.push(n);
            return Ok(Some(Type::int()));
        }
        if let Some(c) = self.scanner.read_char_literal()? {
            self.out.push(c);
            return Ok(Some(Type::char()));
        }
        if let Some(bytes) = self.scanner.read_string_literal()? {
            let label = self.intern_string(bytes);
            self.out.pushl(&label);
            return Ok(Some(Type {
                depth: 1,
                ..Type::char()
            }));
        }
        if self.scanner.read_str("sizeof")? {
            self.expect_sym(b'(', "after 'sizeof'")?;
            let Some(ty) = self.parse_type()? else {
                return Err(self.unexpected("a type"));
            };
            self.expect_sym(b')', "after type")?;
            self.out.push(ty.sizeof());
            return Ok(Some(Type::int()));
        }

        let Some(name) = self.scanner.read_id()? else {
            return Ok(None);
        };
        if self.scanner.read_sym(b'(')? {
            return self.parse_call(&name).map(Some);
        }
        if self.scanner.read_sym(b'[')? {
            let element = self.emit_element_address(&name)?;
            self.out.op("pushi");
            return Ok(Some(element));
        }
        let place = self.resolve(&name)?;
        self.emit_load(&name, &place)?;
        Ok(Some(place.ty()))
    }

    fn expect_operand(&mut self, after: &str) -> Result<Type, CompileError> {
        match self.parse_operand()? {
            Some(ty) => Ok(ty),
            None => Err(self.unexpected(&format!("an operand after {}", after))),
        }
    }

    /// `(type) operand`; the value is reinterpreted, no code is emitted
    fn parse_cast(&mut self) -> Result<Option<Type>, CompileError> {
        if !self.scanner.read_sym(b'(')? {
            return Ok(None);
        }
        let Some(ty) = self.parse_type()? else {
            return Ok(None);
        };
        if !self.scanner.read_sym(b')')? {
            return Ok(None);
        }
        self.expect_operand("cast")?;
        Ok(Some(ty))
    }

    /// `&id`
    fn parse_address_of(&mut self) -> Result<Type, CompileError> {
        let name = self.expect_id("after '&'")?;
        let place = self.resolve(&name)?;
        let ty = place.ty();
        let pointer = ty.reference().map_err(|e| self.error(e.into()))?;
        match &place {
            // A local array's slot holds the address of its storage.
            Place::Local { .. } | Place::Argument { .. } if ty.array => {
                self.emit_load(&name, &place)?
            }
            Place::Global { kind: SymbolKind::Function, .. } => self.out.pushl(&name),
            _ => self.emit_address(&name, &place)?,
        }
        Ok(pointer)
    }

    /// Push `&name[index]` and return the element type (after `name [`)
    pub(crate) fn emit_element_address(&mut self, name: &str) -> Result<Type, CompileError> {
        let place = self.resolve(name)?;
        let base = place.ty();
        let element = base.dereference().map_err(|e| self.error(e.into()))?;
        self.emit_load(name, &place)?;

        let index = self.expect_expr("an index")?;
        if index.is_pointer_like() {
            return Err(self.error(CompileErrorKind::TypeMismatch {
                target: Type::int().to_string(),
                value: index.to_string(),
            }));
        }
        self.expect_sym(b']', "after index")?;
        self.emit_scale(base.element_size());
        self.out.op("add");
        Ok(element)
    }

    /// Compile a call after `name (`
    ///
    /// Arguments are compiled left to right, then re-emitted last to first so
    /// that the first argument ends up nearest the frame. After the call,
    /// every argument is dropped from under the result.
    pub(crate) fn parse_call(&mut self, name: &str) -> Result<Type, CompileError> {
        let mut chunks = Vec::new();
        if !self.scanner.read_sym(b')')? {
            loop {
                let mark = self.out.mark();
                self.expect_expr("an argument")?;
                chunks.push(self.out.split_off(mark));
                if self.scanner.read_sym(b',')? {
                    continue;
                }
                self.expect_sym(b')', "after arguments")?;
                break;
            }
        }

        for chunk in chunks.iter().rev() {
            self.out.append(chunk);
        }
        self.out.pushl(name);
        self.out.op("call");
        for _ in &chunks {
            self.out.ops(&["swap", "drop"]);
        }

        // Calls to functions declared later (or never) are allowed.
        Ok(match self.globals.find(name) {
            Some(sym) if sym.kind == SymbolKind::Function => sym.ty,
            _ => Type::int(),
        })
    }
}
