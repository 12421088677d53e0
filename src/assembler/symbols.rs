use super::phases::types::Loc;
use crate::isa::hw::{Register, Word};
use derive_more::Display;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// A stable handle into a `SymbolTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Unknown,
    Address,
    Equ,
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: String,
    declared_at: Option<Loc>,
    kind: SymbolKind,
    value: Option<Word>,
    fixed: bool,
}

impl Symbol {
    fn new(name: &str, declared_at: Option<Loc>) -> Self {
        Symbol {
            name: name.to_owned(),
            declared_at,
            kind: SymbolKind::Unknown,
            value: None,
            fixed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_at(&self) -> Option<Loc> {
        self.declared_at
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn value(&self) -> Option<Word> {
        self.value
    }

    /// The register names are seeded into every table and may not be
    /// rebound.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn is_resolved(&self) -> bool {
        self.kind != SymbolKind::Unknown
    }

    pub(crate) fn bind(&mut self, kind: SymbolKind, value: Word) {
        self.kind = kind;
        self.value = Some(value);
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            by_name: HashMap::new(),
        };

        for reg in Register::iter() {
            let id = table.add_or_get(&reg.to_string(), None);
            let sym = table.get_mut(id);
            sym.bind(SymbolKind::Set, reg.index() as Word);
            sym.fixed = true;
        }

        table
    }

    /// Returns the symbol called `name`, creating it as `Unknown` if this is
    /// the first time it is seen. The recorded declaration location follows
    /// the latest mention.
    pub fn add_or_get(&mut self, name: &str, loc: Option<Loc>) -> SymbolId {
        if let Some(id) = self.lookup(name) {
            let sym = self.get_mut(id);
            if !sym.fixed && loc.is_some() {
                sym.declared_at = loc;
            }
            return id;
        }

        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol::new(name, loc));
        self.by_name.insert(name.to_owned(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    /// All symbols in the order they were first mentioned.
    pub fn all_symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(idx, sym)| (SymbolId(idx), sym))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|sym| !sym.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_seeded() {
        let table = SymbolTable::new();
        for (idx, name) in ["B", "C", "D", "E", "H", "L", "M", "A"].iter().enumerate() {
            let sym = table.get(table.lookup(name).unwrap());
            assert_eq!(sym.kind(), SymbolKind::Set);
            assert_eq!(sym.value(), Some(idx as Word));
            assert!(sym.is_fixed());
        }
        assert!(!table.exists("SP"));
        assert!(!table.exists("PSW"));
    }

    #[test]
    fn add_or_get_is_idempotent() {
        let mut table = SymbolTable::new();
        let first = table.add_or_get("LOOP", Some(Loc::new(1, 1)));
        let again = table.add_or_get("LOOP", Some(Loc::new(3, 5)));
        assert_eq!(first, again);
        assert_eq!(table.get(first).declared_at(), Some(Loc::new(3, 5)));
        assert_eq!(table.get(first).kind(), SymbolKind::Unknown);
        assert_eq!(table.all_symbols().count(), 9);
    }

    #[test]
    fn unresolved_symbols() {
        let mut table = SymbolTable::new();
        let a = table.add_or_get("ALPHA", None);
        table.add_or_get("BETA", None);
        table.get_mut(a).bind(SymbolKind::Address, 0x100);

        let names: Vec<_> = table.unresolved().map(Symbol::name).collect();
        assert_eq!(names, vec!["BETA"]);
    }
}
