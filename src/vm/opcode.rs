//! Instruction set
//!
//! Every instruction occupies one word holding its opcode number. `push` and
//! `pushl` are followed by one operand word; after assembly the two behave
//! identically (the label has become an address).

use std::fmt;

/// Stack machine opcodes; the discriminant is the encoded word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Opcode {
    Halt,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Inv,
    // Logic
    Not,
    And,
    Or,
    // Comparison
    CmpEq,
    CmpNe,
    CmpLt,
    CmpGt,
    CmpLe,
    CmpGe,
    // Stack
    Dup,
    Drop,
    Swap,
    Push,
    PushL,
    PushI,
    PopI,
    PushSf,
    // Control
    Jump,
    NzJump,
    Call,
    Ret,
    // I/O
    Input,
    Output,
}

/// Mnemonic table, in opcode-number order
static MNEMONICS: &[(&str, Opcode)] = &[
    ("halt", Opcode::Halt),
    ("add", Opcode::Add),
    ("sub", Opcode::Sub),
    ("mul", Opcode::Mul),
    ("div", Opcode::Div),
    ("mod", Opcode::Mod),
    ("inv", Opcode::Inv),
    ("not", Opcode::Not),
    ("and", Opcode::And),
    ("or", Opcode::Or),
    ("cmpeq", Opcode::CmpEq),
    ("cmpne", Opcode::CmpNe),
    ("cmplt", Opcode::CmpLt),
    ("cmpgt", Opcode::CmpGt),
    ("cmple", Opcode::CmpLe),
    ("cmpge", Opcode::CmpGe),
    ("dup", Opcode::Dup),
    ("drop", Opcode::Drop),
    ("swap", Opcode::Swap),
    ("push", Opcode::Push),
    ("pushl", Opcode::PushL),
    ("pushi", Opcode::PushI),
    ("popi", Opcode::PopI),
    ("pushsf", Opcode::PushSf),
    ("jump", Opcode::Jump),
    ("nzjump", Opcode::NzJump),
    ("call", Opcode::Call),
    ("ret", Opcode::Ret),
    ("input", Opcode::Input),
    ("output", Opcode::Output),
];

impl Opcode {
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        MNEMONICS
            .iter()
            .find(|(mnemonic, _)| *mnemonic == name)
            .map(|&(_, op)| op)
    }

    /// Decode a memory word
    pub fn decode(word: i64) -> Option<Opcode> {
        let index = usize::try_from(word).ok()?;
        MNEMONICS.get(index).map(|&(_, op)| op)
    }

    /// The word this opcode is stored as
    pub fn encode(self) -> i64 {
        self as i64
    }

    pub fn mnemonic(self) -> &'static str {
        MNEMONICS[self as usize].0
    }

    /// True for instructions followed by an operand word
    pub fn has_operand(self) -> bool {
        matches!(self, Opcode::Push | Opcode::PushL)
    }

    /// Operand-stack words that must be present before executing
    pub fn stack_inputs(self) -> usize {
        use Opcode::*;
        match self {
            Add | Sub | Mul | Div | Mod | And | Or | CmpEq | CmpNe | CmpLt | CmpGt | CmpLe
            | CmpGe | Swap | PopI | NzJump => 2,
            Inv | Not | Dup | Drop | PushI | Jump | Call | Ret | Output => 1,
            Halt | Push | PushL | PushSf | Input => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_table_order() {
        assert_eq!(Opcode::Halt.encode(), 0);
        assert_eq!(Opcode::decode(Opcode::Call.encode()), Some(Opcode::Call));
        assert_eq!(Opcode::decode(-1), None);
        assert_eq!(Opcode::decode(MNEMONICS.len() as i64), None);
    }

    #[test]
    fn test_table_matches_discriminants() {
        for (index, &(_, op)) in MNEMONICS.iter().enumerate() {
            assert_eq!(op.encode(), index as i64);
            assert_eq!(Opcode::decode(index as i64), Some(op));
        }
        assert_eq!(Opcode::Output.mnemonic(), "output");
    }

    #[test]
    fn test_every_mnemonic_resolves() {
        for &(name, op) in MNEMONICS {
            assert_eq!(Opcode::from_mnemonic(name), Some(op));
            assert_eq!(op.to_string(), name);
        }
        assert_eq!(Opcode::from_mnemonic("nop"), None);
    }

    #[test]
    fn test_operand_forms() {
        assert!(Opcode::Push.has_operand());
        assert!(Opcode::PushL.has_operand());
        assert!(!Opcode::PushI.has_operand());
        assert_eq!(Opcode::PopI.stack_inputs(), 2);
        assert_eq!(Opcode::Halt.stack_inputs(), 0);
    }
}
