//! Type model for the C dialect
//!
//! A [`Type`] is a primitive base kind plus an indirection depth and an
//! independent array flag. Only three bases exist (`void`, `int`, `char`), and
//! pointers may nest at most [`MAX_INDIRECTION`] levels deep.
//!
//! # Type Sizes
//!
//! Sizes are measured in VM cells (the unit of addressing):
//! - `char`: 1 cell
//! - `int`: [`WORD_SIZE`] cells
//! - any pointer: [`WORD_SIZE`] cells
//! - `void`: 0
//!
//! # Pointer Arithmetic
//!
//! Pointer arithmetic is scaled by the pointee size:
//! ```text
//! ptr + n  →  ptr + (n * sizeof(*ptr))
//! ```
//! [`Type::element_size`] returns that scaling factor.

use std::fmt;

/// Size of `int` and of every pointer type, in cells
pub const WORD_SIZE: i64 = 4;

/// Deepest pointer nesting the compiler accepts (`int***`)
pub const MAX_INDIRECTION: u8 = 3;

/// Base kinds supported by the dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    None,
    Int,
    Char,
}

/// Errors from indirection arithmetic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error(
        "cannot take the address of '{0}': indirection depth exceeds {max}",
        max = MAX_INDIRECTION
    )]
    DepthExceeded(Type),
    #[error("cannot dereference non-pointer type '{0}'")]
    NotAPointer(Type),
}

/// A value type: base kind, pointer depth and array flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    pub base: BaseKind,
    pub depth: u8, // 0 = not a pointer, 1 = *, 2 = **, 3 = ***
    pub array: bool,
}

impl Type {
    pub const fn new(base: BaseKind) -> Self {
        Type {
            base,
            depth: 0,
            array: false,
        }
    }

    pub const fn int() -> Self {
        Type::new(BaseKind::Int)
    }

    pub const fn char() -> Self {
        Type::new(BaseKind::Char)
    }

    pub const fn void() -> Self {
        Type::new(BaseKind::None)
    }

    /// Mark this type as an array of its current element type
    pub fn as_array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Size of a value of this type, in cells
    ///
    /// For an array type this is the size of one element; array lengths are
    /// not part of the type.
    pub fn sizeof(&self) -> i64 {
        if self.depth > 0 {
            return WORD_SIZE;
        }
        match self.base {
            BaseKind::Int => WORD_SIZE,
            BaseKind::Char => 1,
            BaseKind::None => 0,
        }
    }

    /// The type of `&value`
    pub fn reference(&self) -> Result<Type, TypeError> {
        // An array name decays to a pointer to its first element.
        if self.array && self.depth < MAX_INDIRECTION {
            return Ok(self.decay());
        }
        if self.decayed_depth() >= MAX_INDIRECTION {
            return Err(TypeError::DepthExceeded(*self));
        }
        Ok(Type {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// The type of `*value`
    pub fn dereference(&self) -> Result<Type, TypeError> {
        if self.array {
            return Ok(Type {
                array: false,
                ..*self
            });
        }
        if self.depth == 0 {
            return Err(TypeError::NotAPointer(*self));
        }
        Ok(Type {
            depth: self.depth - 1,
            ..*self
        })
    }

    /// True for pointers and arrays (anything that decays to an address)
    pub fn is_pointer_like(&self) -> bool {
        self.depth > 0 || self.array
    }

    /// Scaling factor for pointer arithmetic on this type
    ///
    /// Returns 1 for non-pointer types so the caller can skip scaling.
    pub fn element_size(&self) -> i64 {
        match self.dereference() {
            Ok(pointee) if self.is_pointer_like() => pointee.sizeof().max(1),
            _ => 1,
        }
    }

    /// Effective pointer depth, counting an array as one level
    fn decayed_depth(&self) -> u8 {
        self.depth + u8::from(self.array)
    }

    /// Array types decay to a pointer to their element (`int[]` → `int*`);
    /// other types are returned unchanged
    pub fn decay(&self) -> Type {
        Type {
            base: self.base,
            depth: self.decayed_depth(),
            array: false,
        }
    }

    /// Whether a value of type `value` may be stored into a target of this type
    pub fn accepts(&self, value: &Type) -> bool {
        match (self.is_pointer_like(), value.is_pointer_like()) {
            (false, false) => true,
            (true, true) => {
                let target = self.decay();
                let source = value.decay();
                target == source
                    || (target.base == BaseKind::None && target.depth == 1)
                    || (source.base == BaseKind::None && source.depth == 1)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            BaseKind::None => "void",
            BaseKind::Int => "int",
            BaseKind::Char => "char",
        };
        write!(f, "{}", base)?;
        for _ in 0..self.depth {
            write!(f, "*")?;
        }
        if self.array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
