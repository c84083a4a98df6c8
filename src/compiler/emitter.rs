//! Assembly text output buffer
//!
//! The parser writes instructions as soon as it recognizes them. Three
//! operations on top of plain appending make single-pass generation work:
//!
//! - [`Emitter::mark`] / [`Emitter::truncate`]: the output half of a
//!   backtracking savepoint
//! - [`Emitter::split_off`]: cut the code of one call argument out of the
//!   buffer so arguments can be re-emitted in calling-convention order
//! - [`Emitter::insert`]: place a function prologue once the number of locals
//!   is known

const INDENT: &str = "    ";

/// Growable assembly text buffer with a soft size limit
#[derive(Debug)]
pub struct Emitter {
    text: String,
    limit: usize,
}

impl Emitter {
    pub fn new(limit: usize) -> Self {
        Emitter {
            text: String::new(),
            limit,
        }
    }

    /// Emit one instruction without operand
    pub fn op(&mut self, mnemonic: &str) {
        self.text.push_str(INDENT);
        self.text.push_str(mnemonic);
        self.text.push('\n');
    }

    /// Emit a sequence of operand-less instructions
    pub fn ops(&mut self, mnemonics: &[&str]) {
        for m in mnemonics {
            self.op(m);
        }
    }

    /// Emit `push <value>`
    pub fn push(&mut self, value: i64) {
        self.text.push_str(&format!("{INDENT}push {value}\n"));
    }

    /// Emit `pushl <label>`
    pub fn pushl(&mut self, label: &str) {
        self.text.push_str(&format!("{INDENT}pushl {label}\n"));
    }

    /// Emit `pushl <label>` followed by `jump`
    pub fn jump(&mut self, label: &str) {
        self.pushl(label);
        self.op("jump");
    }

    /// Emit a label definition
    pub fn label(&mut self, name: &str) {
        self.text.push_str(name);
        self.text.push_str(":\n");
    }

    /// Emit a raw line, indented like an instruction
    pub fn raw(&mut self, line: &str) {
        self.text.push_str(INDENT);
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Emit a line verbatim (comments, directives)
    pub fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Current output offset
    pub fn mark(&self) -> usize {
        self.text.len()
    }

    /// Discard everything emitted after `mark`
    pub fn truncate(&mut self, mark: usize) {
        self.text.truncate(mark);
    }

    /// Remove and return everything emitted after `mark`
    pub fn split_off(&mut self, mark: usize) -> String {
        self.text.split_off(mark)
    }

    /// Append a previously split chunk
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Insert text at an earlier mark
    pub fn insert(&mut self, mark: usize, chunk: &str) {
        self.text.insert_str(mark, chunk);
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True once the buffer has grown past its limit
    pub fn overflowed(&self) -> bool {
        self.text.len() > self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
