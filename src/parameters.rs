//! The parameter table of a compiled program.
//!
//! Holds the values of `DEFINE` constants, `DECLARE` parameters and the literal constants
//! written inline in instructions. Source operands in the
//! [Parameter](crate::instruction::RegisterFile::Parameter) register file index this table.

use std::collections::HashMap;

use crate::instruction::Vec4;

/// How a parameter table entry came to be.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// Defined with `DEFINE`. The value is fixed at compile time.
    Constant,
    /// Defined with `DECLARE`. The value can be changed after compilation.
    Declared,
    /// A literal written directly in an instruction operand.
    Anonymous,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Option<String>,
    pub kind: ParameterKind,
    pub value: Vec4,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterList {
    entries: Vec<Parameter>,
    names: HashMap<String, usize>,
}

impl ParameterList {
    pub fn new() -> ParameterList {
        ParameterList::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.entries.get(index)
    }

    /// Value of the entry at `index`. Out of range entries read as zero.
    pub fn value(&self, index: usize) -> Vec4 {
        self.entries
            .get(index)
            .map(|entry| entry.value)
            .unwrap_or([0.0; 4])
    }

    /// Index of the named entry.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Adds a named entry and returns its index.
    ///
    /// Callers are expected to have checked the name for duplicates with [ParameterList::lookup].
    pub fn add_named(&mut self, name: &str, kind: ParameterKind, value: Vec4) -> usize {
        let index = self.entries.len();

        self.entries.push(Parameter {
            name: Some(name.to_string()),
            kind,
            value,
        });

        self.names.insert(name.to_string(), index);

        index
    }

    /// Adds an inline literal and returns its index.
    ///
    /// Literals with identical bit patterns share a single entry.
    pub fn add_anonymous(&mut self, value: Vec4) -> usize {
        let existing = self.entries.iter().position(|entry| {
            entry.kind == ParameterKind::Anonymous
                && entry.value.iter().zip(value.iter()).all(|(a, b)| a.to_bits() == b.to_bits())
        });

        if let Some(index) = existing {
            return index;
        }

        self.entries.push(Parameter {
            name: None,
            kind: ParameterKind::Anonymous,
            value,
        });

        self.entries.len() - 1
    }

    /// Overwrites the value of an entry.
    pub(crate) fn set_value(&mut self, index: usize, value: Vec4) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.value = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_lookup() {
        let mut list = ParameterList::new();

        let half = list.add_named("half", ParameterKind::Constant, [0.5; 4]);
        let color = list.add_named("color", ParameterKind::Declared, [0.0, 0.0, 0.0, 1.0]);

        assert_eq!(list.lookup("half"), Some(half));
        assert_eq!(list.lookup("color"), Some(color));
        assert_eq!(list.lookup("missing"), None);
        assert_eq!(list.value(color), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_anonymous_literals_are_shared() {
        let mut list = ParameterList::new();

        let a = list.add_anonymous([1.0, 2.0, 3.0, 4.0]);
        let b = list.add_anonymous([1.0, 2.0, 3.0, 4.0]);
        let c = list.add_anonymous([-0.0, 0.0, 0.0, 0.0]);
        let d = list.add_anonymous([0.0, 0.0, 0.0, 0.0]);

        assert_eq!(a, b);
        assert_ne!(c, d);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_named_entries_are_not_shared() {
        let mut list = ParameterList::new();

        let named = list.add_named("one", ParameterKind::Constant, [1.0; 4]);
        let literal = list.add_anonymous([1.0; 4]);

        assert_ne!(named, literal);
    }
}
