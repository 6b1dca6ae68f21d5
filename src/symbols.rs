//! Tabla de símbolos.
//!
//! Las declaraciones `let` registran un identificador junto a su tipo
//! declarado y su valor, ambos como lexemas sin interpretar. No existen
//! ámbitos anidados. Una redeclaración reemplaza la entrada anterior.

use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub declared_type: String,
    pub value: String,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Declara un símbolo y retorna la entrada reemplazada, si existía.
    pub fn declare<N, T, V>(&mut self, name: N, declared_type: T, value: V) -> Option<Symbol>
    where
        N: Into<String>,
        T: Into<String>,
        V: Into<String>,
    {
        let symbol = Symbol {
            declared_type: declared_type.into(),
            value: value.into(),
        };

        self.symbols.insert(name.into(), symbol)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Itera en orden de nombre.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        let mut entries: Vec<_> = self
            .symbols
            .iter()
            .map(|(name, symbol)| (name.as_str(), symbol))
            .collect();

        entries.sort_by_key(|&(name, _)| name);
        entries.into_iter()
    }
}
