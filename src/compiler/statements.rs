//! Statement grammar and control-flow code generation
//!
//! ```text
//! block     := '{' { item } '}'
//! item      := block | if | while | for | asm | id ':' | statement ';'
//! statement := '*' operand '=' expr
//!            | 'return' [ expr ] | 'goto' id | 'break' | 'continue'
//!            | type id [ '=' expr | '[' expr ']' ]
//!            | id '(' args ')'
//!            | id [ '[' expr ']' ] '=' expr
//! ```
//!
//! Statement alternatives are tried in that order; each one that fails to
//! match is rolled back before the next is tried.
//!
//! # Control-flow layout
//!
//! ```text
//! if:     cond not pushl ELSE nzjump  then  pushl END jump  ELSE: else  END:
//! while:  HEAD: cond not pushl EXIT nzjump  body  pushl HEAD jump  EXIT:
//! for:    init  COND: cond not pushl EXIT nzjump  pushl BODY jump
//!         STEP: step  pushl COND jump
//!         BODY: body  pushl STEP jump  EXIT:
//! ```

use super::errors::{CompileError, CompileErrorKind};
use super::session::{Compiler, HEAP_POINTER};
use super::types::{BaseKind, Type};

impl Compiler<'_> {
    /// `{ item* }`
    pub(crate) fn parse_block(&mut self) -> Result<(), CompileError> {
        self.expect_sym(b'{', "to open block")?;
        loop {
            if self.scanner.read_sym(b'}')? {
                return Ok(());
            }
            if self.scanner.at_end()? {
                return Err(self.unexpected("'}'"));
            }
            self.parse_item()?;
        }
    }

    /// One block item; also the body of `if`, `while` and `for`
    fn parse_item(&mut self) -> Result<(), CompileError> {
        self.nested(Self::item)
    }

    fn item(&mut self) -> Result<(), CompileError> {
        if self.parse_compound()? {
            return self.check_output();
        }
        if self.attempt(Self::parse_label)? {
            return Ok(());
        }
        if !self.parse_statement()? {
            return Err(self.unexpected("a statement"));
        }
        self.expect_sym(b';', "after statement")?;
        self.check_output()
    }

    /// Items that carry their own terminator
    fn parse_compound(&mut self) -> Result<bool, CompileError> {
        if self.scanner.peek_sym(b'{')? {
            self.parse_block()?;
        } else if self.scanner.read_str("if")? {
            self.parse_if()?;
        } else if self.scanner.read_str("while")? {
            self.parse_while()?;
        } else if self.scanner.read_str("for")? {
            self.parse_for()?;
        } else if self.scanner.read_str("asm")? {
            self.parse_asm_body()?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// `id :` defines a goto target
    fn parse_label(&mut self) -> Result<bool, CompileError> {
        let Some(name) = self.scanner.read_id()? else {
            return Ok(false);
        };
        if !self.scanner.read_sym(b':')? {
            return Ok(false);
        }
        let label = self.user_label(&name);
        self.out.label(&label);
        Ok(true)
    }

    /// Assembly label of a user `goto` target in the current function
    ///
    /// `.` never appears in identifiers, so `__f.a_b` and `__f_a.b` differ.
    fn user_label(&self, name: &str) -> String {
        format!("__{}.{}", self.current_function(), name)
    }

    /// Try each statement form in order
    pub(crate) fn parse_statement(&mut self) -> Result<bool, CompileError> {
        Ok(self.attempt(Self::parse_pointer_assign)?
            || self.parse_jump()?
            || self.attempt(Self::parse_local)?
            || self.attempt(Self::parse_call_statement)?
            || self.attempt(Self::parse_assign)?)
    }

    /// `*operand = expr`
    fn parse_pointer_assign(&mut self) -> Result<bool, CompileError> {
        if !self.scanner.read_sym(b'*')? {
            return Ok(false);
        }
        let Some(pointer) = self.parse_operand()? else {
            return Ok(false);
        };
        if self.scanner.peek_str("==")? || !self.scanner.read_sym(b'=')? {
            return Ok(false);
        }

        let target = pointer.dereference().map_err(|e| self.error(e.into()))?;
        let value = self.expect_expr("value to store")?;
        self.check_assignment(target, value)?;
        self.out.ops(&["swap", "popi"]);
        Ok(true)
    }

    /// `return`, `goto`, `break`, `continue`
    fn parse_jump(&mut self) -> Result<bool, CompileError> {
        if self.scanner.read_str("return")? {
            if self.at_terminator()? {
                self.out.push(0);
            } else {
                self.expect_expr("return value")?;
            }
            let end = format!("{}_end", self.current_function());
            self.out.jump(&end);
        } else if self.scanner.read_str("goto")? {
            let name = self.expect_id("after 'goto'")?;
            let label = self.user_label(&name);
            self.out.jump(&label);
        } else if self.scanner.read_str("break")? {
            let Some(label) = self.break_label.clone() else {
                return Err(self.error(CompileErrorKind::OutsideLoop("break")));
            };
            self.out.jump(&label);
        } else if self.scanner.read_str("continue")? {
            let Some(label) = self.continue_label.clone() else {
                return Err(self.error(CompileErrorKind::OutsideLoop("continue")));
            };
            self.out.jump(&label);
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// `T id [= expr | [expr]]`
    fn parse_local(&mut self) -> Result<bool, CompileError> {
        let Some(ty) = self.parse_type()? else {
            return Ok(false);
        };
        let name = self.expect_id("in declaration")?;
        if ty.base == BaseKind::None && ty.depth == 0 {
            return Err(self.error(CompileErrorKind::Unexpected {
                expected: "a variable type".to_string(),
                found: "'void'".to_string(),
            }));
        }
        if self.arguments.find(&name).is_some() {
            return Err(self.error(CompileErrorKind::Duplicate(name)));
        }

        if self.scanner.read_sym(b'[')? {
            let ty = ty.as_array();
            let slot = self
                .locals
                .store(ty, &name)
                .map_err(|e| self.error(e.into()))?;
            self.emit_local_array(slot, ty)?;
            return Ok(true);
        }

        let slot = self
            .locals
            .store(ty, &name)
            .map_err(|e| self.error(e.into()))?;
        if self.scanner.read_sym(b'=')? {
            let value = self.expect_expr("initial value")?;
            self.check_assignment(ty, value)?;
            self.emit_local_address(slot);
            self.out.op("popi");
        }
        Ok(true)
    }

    /// Carve a local array out of the heap: slot = hp; hp += len * size
    fn emit_local_array(&mut self, slot: usize, ty: Type) -> Result<(), CompileError> {
        self.out.pushl(HEAP_POINTER);
        self.out.op("pushi");
        self.emit_local_address(slot);
        self.out.op("popi");

        self.out.pushl(HEAP_POINTER);
        self.out.op("pushi");
        let len = self.expect_expr("array length")?;
        if len.is_pointer_like() {
            return Err(self.error(CompileErrorKind::TypeMismatch {
                target: Type::int().to_string(),
                value: len.to_string(),
            }));
        }
        self.expect_sym(b']', "after array length")?;
        if ty.sizeof() > 1 {
            self.out.push(ty.sizeof());
            self.out.op("mul");
        }
        self.out.op("add");
        self.out.pushl(HEAP_POINTER);
        self.out.op("popi");
        Ok(())
    }

    /// `f(args)` as a statement; the result is discarded
    fn parse_call_statement(&mut self) -> Result<bool, CompileError> {
        let Some(name) = self.scanner.read_id()? else {
            return Ok(false);
        };
        if !self.scanner.read_sym(b'(')? {
            return Ok(false);
        }
        self.parse_call(&name)?;
        if !self.at_terminator()? {
            return Ok(false);
        }
        self.out.op("drop");
        Ok(true)
    }

    /// `id = expr` or `id[index] = expr`
    fn parse_assign(&mut self) -> Result<bool, CompileError> {
        let Some(name) = self.scanner.read_id()? else {
            return Ok(false);
        };

        if self.scanner.read_sym(b'[')? {
            let element = self.emit_element_address(&name)?;
            if self.scanner.peek_str("==")? || !self.scanner.read_sym(b'=')? {
                return Ok(false);
            }
            let value = self.expect_expr("value to store")?;
            self.check_assignment(element, value)?;
            self.out.ops(&["swap", "popi"]);
            return Ok(true);
        }

        if self.scanner.peek_str("==")? || !self.scanner.read_sym(b'=')? {
            return Ok(false);
        }
        let place = self.resolve(&name)?;
        let value = self.expect_expr("value to assign")?;
        self.emit_store(&name, &place, value)?;
        Ok(true)
    }

    /// True at `;` or `)`, the places a statement may end
    fn at_terminator(&mut self) -> Result<bool, CompileError> {
        Ok(self.scanner.peek_sym(b';')? || self.scanner.peek_sym(b')')?)
    }

    /// Condition: value on the stack, jump to `target` when it is zero
    fn emit_branch_if_false(&mut self, target: &str) {
        self.out.op("not");
        self.out.pushl(target);
        self.out.op("nzjump");
    }

    /// Compile a loop body with `break`/`continue` bound to new targets
    fn parse_loop_body(&mut self, exit: &str, next: &str) -> Result<(), CompileError> {
        let outer_break = self.break_label.replace(exit.to_string());
        let outer_continue = self.continue_label.replace(next.to_string());
        let result = self.parse_item();
        self.break_label = outer_break;
        self.continue_label = outer_continue;
        result
    }

    fn parse_if(&mut self) -> Result<(), CompileError> {
        self.expect_sym(b'(', "after 'if'")?;
        self.expect_expr("condition")?;
        self.expect_sym(b')', "after condition")?;

        let otherwise = self.labels.next_label().to_string();
        self.emit_branch_if_false(&otherwise);
        self.parse_item()?;

        if self.scanner.read_str("else")? {
            let end = self.labels.next_label().to_string();
            self.out.jump(&end);
            self.out.label(&otherwise);
            self.parse_item()?;
            self.out.label(&end);
        } else {
            self.out.label(&otherwise);
        }
        Ok(())
    }

    fn parse_while(&mut self) -> Result<(), CompileError> {
        let head = self.labels.next_label().to_string();
        let exit = self.labels.next_label().to_string();

        self.out.label(&head);
        self.expect_sym(b'(', "after 'while'")?;
        self.expect_expr("condition")?;
        self.expect_sym(b')', "after condition")?;
        self.emit_branch_if_false(&exit);

        self.parse_loop_body(&exit, &head)?;
        self.out.jump(&head);
        self.out.label(&exit);
        Ok(())
    }

    fn parse_for(&mut self) -> Result<(), CompileError> {
        self.expect_sym(b'(', "after 'for'")?;
        if !self.scanner.peek_sym(b';')? && !self.parse_statement()? {
            return Err(self.unexpected("loop initializer"));
        }
        self.expect_sym(b';', "after loop initializer")?;

        let cond = self.labels.next_label().to_string();
        let step = self.labels.next_label().to_string();
        let body = self.labels.next_label().to_string();
        let exit = self.labels.next_label().to_string();

        self.out.label(&cond);
        if !self.scanner.peek_sym(b';')? {
            self.expect_expr("loop condition")?;
            self.emit_branch_if_false(&exit);
        }
        self.expect_sym(b';', "after loop condition")?;
        self.out.jump(&body);

        self.out.label(&step);
        if !self.scanner.peek_sym(b')')? && !self.parse_statement()? {
            return Err(self.unexpected("loop step"));
        }
        self.expect_sym(b')', "after loop step")?;
        self.out.jump(&cond);

        self.out.label(&body);
        self.parse_loop_body(&exit, &step)?;
        self.out.jump(&step);
        self.out.label(&exit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{compile, CompileErrorKind};

    fn error_kind(source: &str) -> CompileErrorKind {
        compile(source).unwrap_err().kind
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            error_kind("int main() { int a; int a; return 0; }"),
            CompileErrorKind::Duplicate("a".into())
        );
    }

    #[test]
    fn test_local_shadowing_argument() {
        assert_eq!(
            error_kind("int f(int a) { int a; return 0; }"),
            CompileErrorKind::Duplicate("a".into())
        );
    }

    #[test]
    fn test_undeclared_assignment() {
        assert_eq!(
            error_kind("int main() { y = 3; return 0; }"),
            CompileErrorKind::Undeclared("y".into())
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            error_kind("int main() { break; }"),
            CompileErrorKind::OutsideLoop("break")
        );
        assert_eq!(
            error_kind("int main() { if (1) continue; }"),
            CompileErrorKind::OutsideLoop("continue")
        );
    }

    #[test]
    fn test_assign_to_constant_or_array() {
        assert_eq!(
            error_kind("const int N = 3; int main() { N = 4; }"),
            CompileErrorKind::NotAssignable("N".into())
        );
        assert_eq!(
            error_kind("int buf[4]; int main() { buf = 0; }"),
            CompileErrorKind::NotAssignable("buf".into())
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            error_kind("int main() { int x; char *p; x = p; }"),
            CompileErrorKind::TypeMismatch { .. }
        ));
        assert!(matches!(
            error_kind("int main() { int *p; char *q; p = q; }"),
            CompileErrorKind::TypeMismatch { .. }
        ));
        assert!(compile("int main() { void *v; char *q; v = q; q = v; return 0; }").is_ok());
    }

    #[test]
    fn test_goto_labels_are_scoped_by_function() {
        let output = compile("int main() { again: goto again; }").unwrap();
        assert!(output.contains("__main.again:\n"));
        assert!(output.contains("pushl __main.again\n    jump\n"));
    }

    #[test]
    fn test_if_else_labels() {
        let output = compile("int main() { if (1) return 1; else return 2; }").unwrap();
        assert!(output.contains("not\n    pushl _L_a\n    nzjump\n"));
        assert!(output.contains("pushl _L_b\n    jump\n_L_a:\n"));
    }

    #[test]
    fn test_call_statement_drops_result() {
        let output = compile("int f() { return 1; } int main() { f(); return 0; }").unwrap();
        assert!(output.contains("pushl f\n    call\n    drop\n"));
    }

    #[test]
    fn test_pointer_store_order() {
        let output = compile("int main() { int *p; *p = 7; return 0; }").unwrap();
        assert!(output.contains("pushi\n    push 7\n    swap\n    popi\n"));
    }

    #[test]
    fn test_unknown_statement() {
        assert!(matches!(
            error_kind("int main() { 3 + 4; }"),
            CompileErrorKind::Unexpected { .. }
        ));
    }
}
