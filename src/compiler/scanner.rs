//! Cursor-based scanner
//!
//! There is no token stream: the parser asks the scanner for the piece of
//! input it expects next ("an identifier", "the symbol `==`", "a number") and
//! the scanner answers by either consuming it or leaving the cursor where it
//! was. Whitespace and `/* */` comments are skipped before every read, and the
//! cursor tracks the current line for diagnostics.
//!
//! Because the cursor is a plain `Copy` value, the parser can take a
//! [`Cursor`] before trying an alternative and restore it if the alternative
//! fails.

use super::errors::{CompileError, CompileErrorKind};

/// A position in the source, with the line it falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub pos: usize,
    pub line: usize,
}

/// Scanner over one source buffer
pub struct Scanner<'src> {
    src: &'src [u8],
    cursor: Cursor,
}

fn is_id_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_id(b: u8) -> bool {
    is_id_start(b) || b.is_ascii_digit()
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            src: source.as_bytes(),
            cursor: Cursor { pos: 0, line: 1 },
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn line(&self) -> usize {
        self.cursor.line
    }

    /// Skip whitespace and comments; true if input remains
    pub fn skip_space(&mut self) -> Result<bool, CompileError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_ahead(1) == Some(b'*') => {
                    self.skip_block_comment()?;
                }
                Some(_) => return Ok(true),
                None => return Ok(false),
            }
        }
    }

    /// Skip `/* ... */`
    fn skip_block_comment(&mut self) -> Result<(), CompileError> {
        let start_line = self.cursor.line;
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some(b'*') && self.peek_ahead(1) == Some(b'/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(CompileError::new(
            start_line,
            CompileErrorKind::Unterminated("comment"),
        ))
    }

    /// True when only whitespace and comments remain
    pub fn at_end(&mut self) -> Result<bool, CompileError> {
        Ok(!self.skip_space()?)
    }

    /// Consume the single byte `expected`
    pub fn read_sym(&mut self, expected: u8) -> Result<bool, CompileError> {
        self.skip_space()?;
        if self.peek() == Some(expected) {
            self.advance();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Check for `expected` without consuming it
    pub fn peek_sym(&mut self, expected: u8) -> Result<bool, CompileError> {
        self.skip_space()?;
        Ok(self.peek() == Some(expected))
    }

    /// Consume the exact text `expected` (keyword or multi-byte symbol)
    ///
    /// When `expected` ends in an identifier character, the match must not be
    /// the prefix of a longer identifier: `read_str("int")` does not match
    /// `integer`.
    pub fn read_str(&mut self, expected: &str) -> Result<bool, CompileError> {
        self.skip_space()?;
        let bytes = expected.as_bytes();
        let end = self.cursor.pos + bytes.len();
        if end > self.src.len() || &self.src[self.cursor.pos..end] != bytes {
            return Ok(false);
        }
        let word_like = bytes.last().copied().is_some_and(is_id);
        if word_like && self.src.get(end).copied().is_some_and(is_id) {
            return Ok(false);
        }
        // Keywords and symbols never span lines, so the line is unchanged.
        self.cursor.pos = end;
        Ok(true)
    }

    /// Check for the exact text `expected` without consuming it
    pub fn peek_str(&mut self, expected: &str) -> Result<bool, CompileError> {
        let saved = self.cursor;
        let found = self.read_str(expected)?;
        self.cursor = saved;
        Ok(found)
    }

    /// Consume an identifier
    pub fn read_id(&mut self) -> Result<Option<String>, CompileError> {
        self.skip_space()?;
        match self.peek() {
            Some(b) if is_id_start(b) => {}
            _ => return Ok(None),
        }
        let start = self.cursor.pos;
        while self.peek().is_some_and(is_id) {
            self.advance();
        }
        Ok(Some(self.text(start, self.cursor.pos)))
    }

    /// Consume a decimal digit run
    pub fn read_number(&mut self) -> Result<Option<i64>, CompileError> {
        self.skip_space()?;
        if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
            return Ok(None);
        }
        let start = self.cursor.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = self.text(start, self.cursor.pos);
        digits.parse::<i64>().map(Some).map_err(|_| {
            CompileError::new(self.cursor.line, CompileErrorKind::NumberTooLarge(digits))
        })
    }

    /// Consume a single-quoted character literal
    ///
    /// A backslash takes the following byte verbatim, so `'\''` is a quote and
    /// `'\n'` is the letter `n`.
    pub fn read_char_literal(&mut self) -> Result<Option<i64>, CompileError> {
        let bytes = match self.read_quoted(b'\'', "character literal")? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        match bytes.as_slice() {
            [b] => Ok(Some(i64::from(*b))),
            _ => Err(CompileError::new(
                self.cursor.line,
                CompileErrorKind::Unexpected {
                    expected: "a single character".to_string(),
                    found: format!("'{}'", String::from_utf8_lossy(&bytes)),
                },
            )),
        }
    }

    /// Consume a double-quoted string literal, returning its raw bytes
    pub fn read_string_literal(&mut self) -> Result<Option<Vec<u8>>, CompileError> {
        self.read_quoted(b'"', "string literal")
    }

    fn read_quoted(
        &mut self,
        quote: u8,
        what: &'static str,
    ) -> Result<Option<Vec<u8>>, CompileError> {
        self.skip_space()?;
        if self.peek() != Some(quote) {
            return Ok(None);
        }
        let start_line = self.cursor.line;
        self.advance(); // opening quote

        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                Some(b) if b == quote => return Ok(Some(bytes)),
                Some(b'\\') => match self.advance() {
                    Some(escaped) => bytes.push(escaped),
                    None => break,
                },
                Some(b) => bytes.push(b),
                None => break,
            }
        }
        Err(CompileError::new(start_line, CompileErrorKind::Unterminated(what)))
    }

    /// Consume raw text up to (not including) `stop`
    pub fn raw_until(&mut self, stop: u8) -> Result<String, CompileError> {
        let start_line = self.cursor.line;
        let start = self.cursor.pos;
        while let Some(b) = self.peek() {
            if b == stop {
                return Ok(self.text(start, self.cursor.pos));
            }
            self.advance();
        }
        Err(CompileError::new(
            start_line,
            CompileErrorKind::Unterminated("asm block"),
        ))
    }

    /// Consume the rest of the current line
    pub fn rest_of_line(&mut self) -> String {
        let start = self.cursor.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
        self.text(start, self.cursor.pos)
    }

    /// Describe what comes next, for "expected X, found Y" diagnostics
    pub fn describe_next(&mut self) -> String {
        let saved = self.cursor;
        let description = match self.skip_space() {
            Ok(true) => {
                let start = self.cursor.pos;
                let mut end = start + 1;
                if self.src[start].is_ascii() && is_id(self.src[start]) {
                    while self.src.get(end).copied().is_some_and(is_id) {
                        end += 1;
                    }
                }
                format!("'{}'", self.text(start, end))
            }
            _ => "end of input".to_string(),
        };
        self.cursor = saved;
        description
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.cursor.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.src.get(self.cursor.pos + n).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.cursor.pos += 1;
        if b == b'\n' {
            self.cursor.line += 1;
        }
        Some(b)
    }

    fn is_at_end(&self) -> bool {
        self.cursor.pos >= self.src.len()
    }
}
