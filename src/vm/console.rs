//! Byte I/O for the `input` and `output` instructions
//!
//! The machine talks to the outside world through the [`Console`] trait.
//! [`StdConsole`] uses the process's stdin/stdout; [`BufferConsole`] feeds
//! input from memory and records output, which is what the tests use.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Blocking byte-oriented I/O
pub trait Console {
    /// Next input byte, or `None` at end of input
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Console backed by the process's standard streams
pub struct StdConsole {
    stdin: io::Stdin,
    stdout: io::BufWriter<io::Stdout>,
}

impl StdConsole {
    pub fn new() -> Self {
        StdConsole {
            stdin: io::stdin(),
            stdout: io::BufWriter::new(io::stdout()),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        // Pending output (a prompt, say) must be visible before blocking.
        self.stdout.flush()?;
        let mut byte = [0u8; 1];
        match self.stdin.lock().read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// In-memory console: scripted input, captured output
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose input is `input`, followed by end of input
    pub fn with_input(input: &[u8]) -> Self {
        BufferConsole {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded as text (invalid UTF-8 replaced)
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Output split into lines, without a trailing empty line
    pub fn lines(&self) -> Vec<String> {
        let text = self.output_text();
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }
}

impl Console for BufferConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}
