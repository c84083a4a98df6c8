//! Fetch-decode-execute loop
//!
//! # Memory Layout
//!
//! One flat array of words. The program image is loaded at address 0; the
//! operand stack starts at the top of memory and grows down towards it. The
//! heap used by compiled programs lives between the two and is managed by
//! the program itself. When the image defines `__hp`, the word stored there
//! is the heap top and a push that would reach it is a fault.
//!
//! ```text
//! 0            image_len                          sp          len
//! | image      | heap ->                  <- stack |  ......  |
//! ```
//!
//! # Frames
//!
//! A separate frame stack remembers the operand-stack pointer of every
//! active call. `call` pushes the return address and then records `sp`, so
//! the recorded frame pointer addresses the return-address word: arguments
//! sit above it and locals below.

use super::assembler::Image;
use super::console::Console;
use super::constants::{DEFAULT_FRAME_CAPACITY, DEFAULT_MEMORY_WORDS, HEAP_POINTER_LABEL};
use super::errors::{Fault, RuntimeError};
use super::opcode::Opcode;
use super::trace::Tracer;
use log::{debug, trace};
use std::io::Write;
use std::time::Duration;

/// Machine configuration
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Total memory, in words
    pub memory_words: usize,
    /// Maximum call depth
    pub frame_capacity: usize,
    /// Stop with an error after this many instructions
    pub step_limit: Option<u64>,
    /// Trace every instruction to stderr
    pub debug: bool,
    /// Delay after each traced instruction
    pub throttle: Option<Duration>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            memory_words: DEFAULT_MEMORY_WORDS,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            step_limit: None,
            debug: false,
            throttle: None,
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

pub struct Machine<C: Console> {
    memory: Vec<i64>,
    ip: usize,
    sp: usize,
    frames: Vec<usize>,
    image_len: usize,
    // Cell holding the heap top, if the program keeps a heap
    heap_pointer: Option<usize>,
    steps: u64,
    config: MachineConfig,
    console: C,
    tracer: Option<Tracer<Box<dyn Write>>>,
    // Instruction being executed, for error reports
    current: (usize, Option<Opcode>),
}

impl<C: Console> Machine<C> {
    /// Load `image` at address 0
    pub fn new(image: &Image, config: MachineConfig, console: C) -> Result<Self, RuntimeError> {
        if image.len() > config.memory_words {
            return Err(RuntimeError::new(
                0,
                None,
                Fault::ImageTooLarge {
                    image: image.len(),
                    memory: config.memory_words,
                },
            ));
        }

        let mut memory = vec![0; config.memory_words];
        memory[..image.len()].copy_from_slice(&image.words);
        let tracer = config.debug.then(|| Tracer::stderr(config.throttle));

        Ok(Machine {
            sp: memory.len(),
            memory,
            ip: 0,
            frames: Vec::with_capacity(config.frame_capacity),
            image_len: image.len(),
            heap_pointer: image.label(HEAP_POINTER_LABEL),
            steps: 0,
            config,
            console,
            tracer,
            current: (0, None),
        })
    }

    /// Replace the trace destination (and enable tracing)
    pub fn set_tracer(&mut self, tracer: Tracer<Box<dyn Write>>) {
        self.tracer = Some(tracer);
    }

    /// Run until `halt`; returns the word on top of the stack (0 if empty)
    pub fn run(&mut self) -> Result<i64, RuntimeError> {
        while self.step()? == Status::Running {}
        self.console
            .flush()
            .map_err(|e| self.fault(Fault::Io(e.to_string())))?;
        let result = self.top().unwrap_or(0);
        debug!(
            "halted after {} steps at {} with {}",
            self.steps, self.ip, result
        );
        Ok(result)
    }

    /// Execute one instruction
    pub fn step(&mut self) -> Result<Status, RuntimeError> {
        let addr = self.ip;
        self.current = (addr, None);

        if let Some(limit) = self.config.step_limit {
            if self.steps >= limit {
                return Err(self.fault(Fault::StepLimit(limit)));
            }
        }

        let word = self.load(addr as i64)?;
        let op = Opcode::decode(word).ok_or_else(|| self.fault(Fault::InvalidOpcode(word)))?;
        self.current = (addr, Some(op));

        let operand = if op.has_operand() {
            Some(self.load(addr as i64 + 1)?)
        } else {
            None
        };
        self.ip = addr + if op.has_operand() { 2 } else { 1 };
        self.steps += 1;

        trace!("{:06} {} {:?}", addr, op, operand);
        if let Some(tracer) = self.tracer.as_mut() {
            let frames = self.frames.len();
            tracer
                .record(addr, op, operand, &self.memory[self.sp..], frames)
                .map_err(|e| RuntimeError::new(addr, Some(op), Fault::Io(e.to_string())))?;
        }

        self.require(op.stack_inputs())?;
        self.execute(op, operand)
    }

    fn execute(&mut self, op: Opcode, operand: Option<i64>) -> Result<Status, RuntimeError> {
        use Opcode::*;
        match op {
            Halt => return Ok(Status::Halted),

            Add | Sub | Mul | Div | Mod | And | Or | CmpEq | CmpNe | CmpLt | CmpGt | CmpLe
            | CmpGe => {
                let b = self.pop()?;
                let a = self.pop()?;
                let value = self.binary(op, a, b)?;
                self.push(value)?;
            }
            Inv => {
                let a = self.pop()?;
                self.push(!a)?;
            }
            Not => {
                let a = self.pop()?;
                self.push(i64::from(a == 0))?;
            }

            Dup => {
                let a = self.pop()?;
                self.push(a)?;
                self.push(a)?;
            }
            Drop => {
                self.pop()?;
            }
            Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b)?;
                self.push(a)?;
            }
            Push | PushL => self.push(operand.unwrap_or_default())?,
            PushI => {
                let addr = self.pop()?;
                let value = self.load(addr)?;
                self.push(value)?;
            }
            PopI => {
                let addr = self.pop()?;
                let value = self.pop()?;
                self.store(addr, value)?;
            }
            PushSf => {
                let fp = *self
                    .frames
                    .last()
                    .ok_or_else(|| self.fault(Fault::FrameUnderflow))?;
                self.push(fp as i64)?;
            }

            Jump => {
                let target = self.pop()?;
                self.jump(target)?;
            }
            NzJump => {
                let target = self.pop()?;
                let cond = self.pop()?;
                if cond != 0 {
                    self.jump(target)?;
                }
            }
            Call => {
                let target = self.pop()?;
                if self.frames.len() >= self.config.frame_capacity {
                    return Err(self.fault(Fault::FrameOverflow {
                        limit: self.config.frame_capacity,
                    }));
                }
                self.push(self.ip as i64)?;
                self.frames.push(self.sp);
                self.jump(target)?;
            }
            Ret => {
                let value = self.pop()?;
                let fp = self
                    .frames
                    .pop()
                    .ok_or_else(|| self.fault(Fault::FrameUnderflow))?;
                self.sp = fp;
                self.require(1)?;
                let ret = self.pop()?;
                self.push(value)?;
                self.jump(ret)?;
            }

            Input => {
                let byte = self
                    .console
                    .read_byte()
                    .map_err(|e| self.fault(Fault::Io(e.to_string())))?;
                self.push(byte.map_or(-1, i64::from))?;
            }
            Output => {
                let value = self.pop()?;
                self.console
                    .write_byte(value as u8)
                    .map_err(|e| self.fault(Fault::Io(e.to_string())))?;
            }
        }
        Ok(Status::Running)
    }

    fn binary(&self, op: Opcode, a: i64, b: i64) -> Result<i64, RuntimeError> {
        use Opcode::*;
        Ok(match op {
            Add => a.wrapping_add(b),
            Sub => a.wrapping_sub(b),
            Mul => a.wrapping_mul(b),
            Div | Mod if b == 0 => return Err(self.fault(Fault::DivisionByZero)),
            Div => a.wrapping_div(b),
            Mod => a.wrapping_rem(b),
            And => a & b,
            Or => a | b,
            CmpEq => i64::from(a == b),
            CmpNe => i64::from(a != b),
            CmpLt => i64::from(a < b),
            CmpGt => i64::from(a > b),
            CmpLe => i64::from(a <= b),
            CmpGe => i64::from(a >= b),
            _ => unreachable!("not a binary opcode: {}", op),
        })
    }

    fn fault(&self, fault: Fault) -> RuntimeError {
        RuntimeError::new(self.current.0, self.current.1, fault)
    }

    /// Words currently on the operand stack
    pub fn depth(&self) -> usize {
        self.memory.len() - self.sp
    }

    fn require(&self, needed: usize) -> Result<(), RuntimeError> {
        let available = self.depth();
        if available < needed {
            return Err(self.fault(Fault::StackUnderflow { needed, available }));
        }
        Ok(())
    }

    /// Lowest address the operand stack may occupy
    fn heap_top(&self) -> Option<usize> {
        let value = self.memory[self.heap_pointer?];
        let top = usize::try_from(value).unwrap_or(0);
        Some(top.clamp(self.image_len, self.memory.len()))
    }

    fn push(&mut self, value: i64) -> Result<(), RuntimeError> {
        if self.sp <= self.image_len {
            return Err(self.fault(Fault::StackOverflow));
        }
        if let Some(heap_top) = self.heap_top() {
            if self.sp <= heap_top {
                return Err(self.fault(Fault::HeapCollision { heap_top }));
            }
        }
        self.sp -= 1;
        self.memory[self.sp] = value;
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, RuntimeError> {
        self.require(1)?;
        let value = self.memory[self.sp];
        self.sp += 1;
        Ok(value)
    }

    fn index(&self, addr: i64) -> Result<usize, RuntimeError> {
        usize::try_from(addr)
            .ok()
            .filter(|&a| a < self.memory.len())
            .ok_or_else(|| self.fault(Fault::MemoryAccess(addr)))
    }

    fn load(&self, addr: i64) -> Result<i64, RuntimeError> {
        Ok(self.memory[self.index(addr)?])
    }

    fn store(&mut self, addr: i64, value: i64) -> Result<(), RuntimeError> {
        let index = self.index(addr)?;
        self.memory[index] = value;
        Ok(())
    }

    fn jump(&mut self, target: i64) -> Result<(), RuntimeError> {
        self.ip = self.index(target)?;
        Ok(())
    }

    // ===== Inspection =====

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Top word of the operand stack
    pub fn top(&self) -> Option<i64> {
        self.memory.get(self.sp).copied()
    }

    /// Operand stack, top first
    pub fn stack(&self) -> &[i64] {
        &self.memory[self.sp..]
    }

    /// Saved frame pointers, innermost last
    pub fn frames(&self) -> &[usize] {
        &self.frames
    }

    pub fn memory(&self) -> &[i64] {
        &self.memory
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }
}
