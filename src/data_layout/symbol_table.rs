//! Insertion-ordered table mapping declared names to their data-segment
//! slot.
//!
//! Backed by a single `Vec<(String, SymbolEntry)>` rather than a
//! `HashMap`: lookups are a linear scan, which is fine for programs with
//! a few dozen names, and iteration order is declaration order — useful
//! for the printed symbol dump.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Const,
    Var,
    Str,
    Alloc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    pub addr: u32,
    pub size: u32,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<(String, SymbolEntry)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn insert(&mut self, name: String, entry: SymbolEntry) {
        self.entries.push((name, entry));
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Base word address of a declared name.
    pub fn resolve_addr(&self, name: &str) -> Option<u32> {
        self.get(name).map(|e| e.addr)
    }

    /// Literal value of a `const`. `None` if the name is absent or not a
    /// const.
    pub fn resolve_const_value(&self, name: &str) -> Option<i64> {
        self.get(name).filter(|e| e.kind == SymbolKind::Const).and_then(|e| e.value)
    }

    pub fn print_table(&self) {
        println!("//\tName\t\tKind\tAddr\tSize");
        println!("//\t----\t\t----\t----\t----");
        for (name, entry) in &self.entries {
            println!(
                "//\t{name}\t\t{:?}\t{}\t{}",
                entry.kind, entry.addr, entry.size
            );
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
