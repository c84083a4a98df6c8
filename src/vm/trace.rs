//! Debug trace of executed instructions
//!
//! One line per instruction, written before it executes:
//!
//! ```text
//! 000012  push     5      [7 1 0]  frames 1
//! ```
//!
//! The stack is shown top first and cut off after a few words. Colors come
//! from crossterm and degrade to plain text on writers that ignore escape
//! sequences. An optional throttle sleeps after each line so a human can
//! follow along; it never changes what the program computes.

use super::constants::TRACE_STACK_WORDS;
use super::opcode::Opcode;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

pub struct Tracer<W: Write> {
    out: W,
    throttle: Option<Duration>,
}

impl Tracer<Box<dyn Write>> {
    /// Trace to standard error
    pub fn stderr(throttle: Option<Duration>) -> Self {
        Tracer::new(Box::new(io::stderr()), throttle)
    }
}

impl<W: Write> Tracer<W> {
    pub fn new(out: W, throttle: Option<Duration>) -> Self {
        Tracer { out, throttle }
    }

    /// Write one trace line
    ///
    /// `stack` is the live operand stack with the top word first.
    pub fn record(
        &mut self,
        addr: usize,
        opcode: Opcode,
        operand: Option<i64>,
        stack: &[i64],
        frames: usize,
    ) -> io::Result<()> {
        let operand = operand.map(|v| v.to_string()).unwrap_or_default();
        let mut shown: Vec<String> = stack
            .iter()
            .take(TRACE_STACK_WORDS)
            .map(|w| w.to_string())
            .collect();
        if stack.len() > TRACE_STACK_WORDS {
            shown.push("...".to_string());
        }

        queue!(
            self.out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("{:06}  ", addr)),
            SetForegroundColor(Color::Cyan),
            SetAttribute(Attribute::Bold),
            Print(format!("{:<8} ", opcode.mnemonic())),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print(format!("{:<6} ", operand)),
            SetForegroundColor(Color::Yellow),
            Print(format!("[{}]", shown.join(" "))),
            ResetColor,
            Print(format!("  frames {}\n", frames))
        )?;
        self.out.flush()?;

        if let Some(delay) = self.throttle {
            thread::sleep(delay);
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_line_contents() {
        let mut tracer = Tracer::new(Vec::new(), None);
        tracer
            .record(12, Opcode::Push, Some(5), &[7, 1, 0], 1)
            .unwrap();
        let text = String::from_utf8(tracer.into_inner()).unwrap();
        assert!(text.contains("000012"));
        assert!(text.contains("push"));
        assert!(text.contains("[7 1 0]"));
        assert!(text.ends_with("frames 1\n"));
    }

    #[test]
    fn test_long_stacks_are_cut() {
        let mut tracer = Tracer::new(Vec::new(), None);
        let stack: Vec<i64> = (0..20).collect();
        tracer.record(0, Opcode::Add, None, &stack, 0).unwrap();
        let text = String::from_utf8(tracer.into_inner()).unwrap();
        assert!(text.contains("[0 1 2 3 4 5 6 7 ...]"));
    }
}
