//! Per-file import alias tables and name canonicalization.
//!
//! An alias table maps a local name to the module or symbol an import bound
//! it to. Canonicalization is what makes cross-file resolution work: a usage
//! of `T` after `from mod import Thing as T` must be looked up as `Thing`,
//! and `m.helper` after `import mod as m` must be looked up with base `mod`.
//!
//! Tables are produced during extraction and read-only afterwards.

use std::collections::HashMap;

/// What a local name was bound to by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasEntry {
    /// `import MODULE as LOCAL`
    Module { module: String },
    /// `from MODULE import SYMBOL [as LOCAL]`
    Symbol { symbol: String, module: String },
}

/// One file's import aliases, keyed by local name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, AliasEntry>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module(&mut self, local: impl Into<String>, module: impl Into<String>) {
        self.entries.insert(
            local.into(),
            AliasEntry::Module {
                module: module.into(),
            },
        );
    }

    pub fn insert_symbol(
        &mut self,
        local: impl Into<String>,
        symbol: impl Into<String>,
        module: impl Into<String>,
    ) {
        self.entries.insert(
            local.into(),
            AliasEntry::Symbol {
                symbol: symbol.into(),
                module: module.into(),
            },
        );
    }

    pub fn get(&self, local: &str) -> Option<&AliasEntry> {
        self.entries.get(local)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical form of a bare name usage.
    ///
    /// Symbol aliases resolve to their origin symbol. Module aliases stay
    /// unchanged: the module only matters when the name is the base of an
    /// attribute access. Unknown names pass through untouched (locally
    /// defined, or external and therefore unresolvable anyway).
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.entries.get(name) {
            Some(AliasEntry::Symbol { symbol, .. }) => symbol,
            _ => name,
        }
    }

    /// Canonical form of an attribute-access base.
    ///
    /// Like [`canonical_name`](Self::canonical_name), except module aliases
    /// resolve to the origin module so `m.helper` can be matched against
    /// definitions in `mod`.
    pub fn canonical_attr_base<'a>(&'a self, name: &'a str) -> &'a str {
        match self.entries.get(name) {
            Some(AliasEntry::Symbol { symbol, .. }) => symbol,
            Some(AliasEntry::Module { module }) => module,
            None => name,
        }
    }

    /// The origin module a local name was imported from, if any.
    pub fn origin_module(&self, name: &str) -> Option<&str> {
        match self.entries.get(name)? {
            AliasEntry::Module { module } => Some(module),
            AliasEntry::Symbol { module, .. } => Some(module),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_alias_canonicalizes_to_origin_symbol() {
        let mut table = AliasTable::new();
        table.insert_symbol("T", "Thing", "mod");

        assert_eq!(table.canonical_name("T"), "Thing");
        assert_eq!(table.canonical_attr_base("T"), "Thing");
        assert_eq!(table.origin_module("T"), Some("mod"));
    }

    #[test]
    fn module_alias_only_affects_attr_bases() {
        let mut table = AliasTable::new();
        table.insert_module("np", "numpy");

        // Bare usage keeps the local name
        assert_eq!(table.canonical_name("np"), "np");
        // Attribute base resolves to the origin module
        assert_eq!(table.canonical_attr_base("np"), "numpy");
    }

    #[test]
    fn unknown_names_pass_through() {
        let table = AliasTable::new();
        assert_eq!(table.canonical_name("local_thing"), "local_thing");
        assert_eq!(table.canonical_attr_base("local_thing"), "local_thing");
        assert_eq!(table.origin_module("local_thing"), None);
    }

    #[test]
    fn later_import_overrides_earlier_binding() {
        let mut table = AliasTable::new();
        table.insert_symbol("x", "First", "a");
        table.insert_symbol("x", "Second", "b");
        assert_eq!(table.canonical_name("x"), "Second");
        assert_eq!(table.origin_module("x"), Some("b"));
    }
}
