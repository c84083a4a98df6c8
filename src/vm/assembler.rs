//! Two-phase assembler
//!
//! Phase 1 walks the text token by token. Data directives and instructions
//! append words to the image, `label:` binds a label to the current address,
//! and every `pushl` operand is written as a placeholder and remembered as a
//! fixup. Phase 2 patches each fixup with its label's address; a label that
//! was referenced but never defined is an error.
//!
//! ```text
//! ; comment
//! main:   push 2 push 3 add
//!         pushl done jump
//! done:   halt
//! table:  .byte 1, 2, -3
//!         .zero 4
//! ```

use super::constants::{DEFAULT_MAX_LABELS, DEFAULT_MEMORY_WORDS};
use super::errors::AssembleError;
use super::opcode::Opcode;
use log::debug;
use rustc_hash::FxHashMap;

/// Assembler capacity limits
#[derive(Debug, Clone)]
pub struct AssemblerLimits {
    pub max_labels: usize,
    pub max_words: usize,
}

impl Default for AssemblerLimits {
    fn default() -> Self {
        AssemblerLimits {
            max_labels: DEFAULT_MAX_LABELS,
            max_words: DEFAULT_MEMORY_WORDS,
        }
    }
}

/// An assembled program, loaded at address 0
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub words: Vec<i64>,
    pub labels: FxHashMap<String, usize>,
}

impl Image {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

/// A `pushl` operand waiting for its label
struct Fixup {
    at: usize,
    label: String,
    line: usize,
}

struct Assembler {
    limits: AssemblerLimits,
    words: Vec<i64>,
    labels: FxHashMap<String, usize>,
    fixups: Vec<Fixup>,
}

/// Assemble with default limits
pub fn assemble(source: &str) -> Result<Image, AssembleError> {
    assemble_with(source, &AssemblerLimits::default())
}

pub fn assemble_with(source: &str, limits: &AssemblerLimits) -> Result<Image, AssembleError> {
    let mut asm = Assembler {
        limits: limits.clone(),
        words: Vec::new(),
        labels: FxHashMap::default(),
        fixups: Vec::new(),
    };

    for (index, text) in source.lines().enumerate() {
        asm.line(index + 1, text)?;
    }
    asm.resolve()?;

    debug!(
        "assembled {} words, {} labels",
        asm.words.len(),
        asm.labels.len()
    );
    Ok(Image {
        words: asm.words,
        labels: asm.labels,
    })
}

impl Assembler {
    fn emit(&mut self, word: i64) -> Result<(), AssembleError> {
        if self.words.len() >= self.limits.max_words {
            return Err(AssembleError::ImageTooLarge {
                limit: self.limits.max_words,
            });
        }
        self.words.push(word);
        Ok(())
    }

    fn line(&mut self, line: usize, text: &str) -> Result<(), AssembleError> {
        let code = text.split(';').next().unwrap_or_default();
        let mut tokens = code.split_whitespace();

        while let Some(token) = tokens.next() {
            if let Some(name) = token.strip_suffix(':') {
                self.define(line, name)?;
                continue;
            }
            match token {
                ".byte" => {
                    // The rest of the line is the value list.
                    let rest: Vec<&str> = tokens.by_ref().collect();
                    self.bytes(line, &rest.join(" "))?;
                }
                ".zero" => {
                    let count = tokens.next().ok_or(AssembleError::MissingOperand {
                        line,
                        mnemonic: ".zero",
                    })?;
                    let count: usize = count.parse().map_err(|_| AssembleError::InvalidOperand {
                        line,
                        operand: count.to_string(),
                    })?;
                    for _ in 0..count {
                        self.emit(0)?;
                    }
                }
                _ => self.instruction(line, token, &mut tokens)?,
            }
        }
        Ok(())
    }

    fn instruction<'a>(
        &mut self,
        line: usize,
        name: &str,
        tokens: &mut impl Iterator<Item = &'a str>,
    ) -> Result<(), AssembleError> {
        let op = Opcode::from_mnemonic(name).ok_or_else(|| AssembleError::UnknownMnemonic {
            line,
            name: name.to_string(),
        })?;
        self.emit(op.encode())?;
        if !op.has_operand() {
            return Ok(());
        }

        let operand = tokens.next().ok_or(AssembleError::MissingOperand {
            line,
            mnemonic: op.mnemonic(),
        })?;
        if op == Opcode::PushL {
            self.reference(line, operand)?;
            return Ok(());
        }
        let value = operand
            .parse::<i64>()
            .map_err(|_| AssembleError::InvalidOperand {
                line,
                operand: operand.to_string(),
            })?;
        self.emit(value)
    }

    /// `.byte` operands: integers separated by commas and/or spaces
    fn bytes(&mut self, line: usize, list: &str) -> Result<(), AssembleError> {
        for item in list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
        {
            let value = item.parse::<i64>().map_err(|_| AssembleError::InvalidOperand {
                line,
                operand: item.to_string(),
            })?;
            self.emit(value)?;
        }
        Ok(())
    }

    fn check_label_capacity(&self, name: &str) -> Result<(), AssembleError> {
        let known = self.labels.contains_key(name) || self.fixups.iter().any(|f| f.label == name);
        if !known && self.labels.len() >= self.limits.max_labels {
            return Err(AssembleError::TooManyLabels {
                limit: self.limits.max_labels,
            });
        }
        Ok(())
    }

    fn define(&mut self, line: usize, name: &str) -> Result<(), AssembleError> {
        if name.is_empty() {
            return Err(AssembleError::InvalidOperand {
                line,
                operand: ":".to_string(),
            });
        }
        if self.labels.contains_key(name) {
            return Err(AssembleError::DuplicateLabel {
                line,
                name: name.to_string(),
            });
        }
        self.check_label_capacity(name)?;
        self.labels.insert(name.to_string(), self.words.len());
        Ok(())
    }

    fn reference(&mut self, line: usize, name: &str) -> Result<(), AssembleError> {
        self.check_label_capacity(name)?;
        self.fixups.push(Fixup {
            at: self.words.len(),
            label: name.to_string(),
            line,
        });
        // Placeholder until phase 2.
        self.emit(0)
    }

    fn resolve(&mut self) -> Result<(), AssembleError> {
        for fixup in &self.fixups {
            let addr = self.labels.get(&fixup.label).copied().ok_or_else(|| {
                AssembleError::UnresolvedLabel {
                    line: fixup.line,
                    name: fixup.label.clone(),
                }
            })?;
            self.words[fixup.at] = addr as i64;
        }
        Ok(())
    }
}
