//! Compile-time error types
//!
//! Every diagnostic carries the source line it was raised on. Errors are
//! fatal: the first one aborts the whole compilation.

use super::symbols::SymbolError;
use super::types::TypeError;

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileErrorKind {
    // Lexical / syntax
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("unterminated {0}")]
    Unterminated(&'static str),

    #[error("integer literal '{0}' is too large")]
    NumberTooLarge(String),

    // Semantic
    #[error("undeclared identifier '{0}'")]
    Undeclared(String),

    #[error("duplicate identifier '{0}'")]
    Duplicate(String),

    #[error("type mismatch: cannot assign '{value}' to '{target}'")]
    TypeMismatch { target: String, value: String },

    #[error("{0}")]
    Type(#[from] TypeError),

    #[error("'{0}' is not assignable")]
    NotAssignable(String),

    #[error("'{0}' used outside of a loop")]
    OutsideLoop(&'static str),

    #[error("function '{0}' is already defined")]
    Redefinition(String),

    #[error("'{0}' collides with a generated label")]
    Reserved(String),

    // Resources
    #[error("{what} exceeds its limit of {limit}")]
    Capacity { what: &'static str, limit: usize },
}

/// A line-tagged compile error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(line: usize, kind: CompileErrorKind) -> Self {
        CompileError { line, kind }
    }
}

impl From<SymbolError> for CompileErrorKind {
    fn from(err: SymbolError) -> Self {
        match err {
            SymbolError::Duplicate(name) => CompileErrorKind::Duplicate(name),
            SymbolError::Full { table, capacity } => CompileErrorKind::Capacity {
                what: table,
                limit: capacity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::types::Type;

    #[test]
    fn test_display_is_line_tagged() {
        let err = CompileError::new(12, CompileErrorKind::Undeclared("x".into()));
        assert_eq!(err.to_string(), "line 12: undeclared identifier 'x'");
    }

    #[test]
    fn test_symbol_errors_convert() {
        let kind: CompileErrorKind = SymbolError::Duplicate("n".into()).into();
        assert_eq!(kind, CompileErrorKind::Duplicate("n".into()));

        let kind: CompileErrorKind = SymbolError::Full {
            table: "locals",
            capacity: 4,
        }
        .into();
        assert_eq!(kind.to_string(), "locals exceeds its limit of 4");
    }

    #[test]
    fn test_type_errors_convert() {
        let kind: CompileErrorKind = TypeError::NotAPointer(Type::int()).into();
        assert_eq!(kind.to_string(), "cannot dereference non-pointer type 'int'");
    }
}
