//! Unique label generation
//!
//! Control flow needs fresh jump targets. Labels come from a plain counter
//! rendered as `_L_` followed by the counter in little-endian base-26 letters
//! (`_L_a`, `_L_b`, ..., `_L_z`, `_L_ab`, ...). The leading underscore keeps
//! them out of the way of user function names, and the sequence depends only
//! on the order in which the parser asks for labels.

use std::fmt;

/// A generated label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    seq: usize,
    name: String,
}

impl Label {
    /// Position of this label in generation order
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Monotonic label counter for one compilation
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next: usize,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next unique label
    pub fn next_label(&mut self) -> Label {
        let seq = self.next;
        self.next += 1;

        let mut name = String::from("_L_");
        let mut n = seq;
        loop {
            name.push((b'a' + (n % 26) as u8) as char);
            n /= 26;
            if n == 0 {
                break;
            }
        }
        Label { seq, name }
    }

    /// Number of labels handed out so far
    pub fn issued(&self) -> usize {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_ordered_and_unique() {
        let mut gen = LabelGenerator::new();
        let labels: Vec<Label> = (0..100).map(|_| gen.next_label()).collect();

        for pair in labels.windows(2) {
            assert!(pair[0].seq() < pair[1].seq());
            assert_ne!(pair[0].name(), pair[1].name());
        }
        let mut names: Vec<&str> = labels.iter().map(|l| l.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 100);
        assert_eq!(gen.issued(), 100);
    }

    #[test]
    fn test_labels_are_reproducible() {
        let mut a = LabelGenerator::new();
        let mut b = LabelGenerator::new();
        for _ in 0..30 {
            assert_eq!(a.next_label(), b.next_label());
        }
    }

    #[test]
    fn test_label_shape() {
        let mut gen = LabelGenerator::new();
        let first = gen.next_label();
        assert_eq!(first.to_string(), "_L_a");
        assert!(first
            .name()
            .chars()
            .all(|c| c == '_' || c.is_ascii_alphanumeric()));
    }
}
