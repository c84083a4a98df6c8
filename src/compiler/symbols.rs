//! Flat symbol tables
//!
//! The compiler keeps four independent lists: `locals` and `arguments` are
//! reset after every function, `globals` and `constants` live for the whole
//! translation unit. Each entry records a name, a [`Type`] and a slot index,
//! where the index is simply the entry's ordinal position in its list. That
//! index is what code generation turns into a frame offset (locals,
//! arguments) or a constant-pool slot (constants).
//!
//! Lookup is a linear scan. The tables are small (one function's worth of
//! names), and keeping insertion order is what gives each name its slot.

use super::types::Type;

/// What a symbol names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A variable, argument or constant value
    Data,
    /// A function (only ever stored in `globals`)
    Function,
}

/// One symbol table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub index: usize,
    pub kind: SymbolKind,
}

/// Why a symbol could not be stored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    #[error("duplicate identifier '{0}'")]
    Duplicate(String),
    #[error("symbol table '{table}' is full ({capacity} entries)")]
    Full {
        table: &'static str,
        capacity: usize,
    },
}

/// An ordered, capacity-limited list of symbols
#[derive(Debug, Clone)]
pub struct SymbolTable {
    label: &'static str,
    entries: Vec<Symbol>,
    capacity: usize,
}

impl SymbolTable {
    pub fn new(label: &'static str, capacity: usize) -> Self {
        SymbolTable {
            label,
            entries: Vec::new(),
            capacity,
        }
    }

    /// Append a data symbol and return its slot index
    pub fn store(&mut self, ty: Type, name: &str) -> Result<usize, SymbolError> {
        self.store_kind(ty, name, SymbolKind::Data)
    }

    /// Append a symbol of the given kind and return its slot index
    pub fn store_kind(
        &mut self,
        ty: Type,
        name: &str,
        kind: SymbolKind,
    ) -> Result<usize, SymbolError> {
        if self.find(name).is_some() {
            return Err(SymbolError::Duplicate(name.to_string()));
        }
        if self.entries.len() >= self.capacity {
            return Err(SymbolError::Full {
                table: self.label,
                capacity: self.capacity,
            });
        }
        let index = self.entries.len();
        self.entries.push(Symbol {
            name: name.to_string(),
            ty,
            index,
            kind,
        });
        Ok(index)
    }

    /// Find a symbol by name
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.entries.iter().find(|s| s.name == name)
    }

    /// First entry in the list (a function's own name, for `locals`)
    pub fn first(&self) -> Option<&Symbol> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_assigns_ordinal_indices() {
        let mut table = SymbolTable::new("locals", 8);
        assert_eq!(table.store(Type::int(), "a").unwrap(), 0);
        assert_eq!(table.store(Type::char(), "b").unwrap(), 1);
        assert_eq!(table.store(Type::int(), "c").unwrap(), 2);

        let b = table.find("b").unwrap();
        assert_eq!(b.index, 1);
        assert_eq!(b.ty, Type::char());
        assert_eq!(b.kind, SymbolKind::Data);
    }

    #[test]
    fn test_find_missing() {
        let mut table = SymbolTable::new("globals", 8);
        table.store(Type::int(), "counter").unwrap();
        assert!(table.find("count").is_none());
        assert!(table.find("counters").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = SymbolTable::new("locals", 8);
        table.store(Type::int(), "x").unwrap();
        assert_eq!(
            table.store(Type::char(), "x"),
            Err(SymbolError::Duplicate("x".to_string()))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut table = SymbolTable::new("arguments", 2);
        table.store(Type::int(), "a").unwrap();
        table.store(Type::int(), "b").unwrap();
        assert!(matches!(
            table.store(Type::int(), "c"),
            Err(SymbolError::Full { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_clear_resets_indices() {
        let mut table = SymbolTable::new("locals", 8);
        table.store_kind(Type::int(), "main", SymbolKind::Function).unwrap();
        table.store(Type::int(), "x").unwrap();
        assert_eq!(table.first().map(|s| s.name.as_str()), Some("main"));

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.store(Type::int(), "x").unwrap(), 0);
    }
}
