use std::collections::{BTreeMap, HashMap};

use sicvm::register;

/// The symbol table built while a program assembles. Labels are unique; a
/// lookup consults the register name table before the user symbols.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    order: Vec<String>,
    map: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records `label` at `locctr`. Returns false when the label is already
    /// present, which pass 1 reports as a duplicate-symbol error.
    pub fn insert(&mut self, label: &str, locctr: u32) -> bool {
        if self.map.contains_key(label) {
            return false;
        }
        self.map.insert(label.to_owned(), locctr);
        self.order.push(label.to_owned());
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.map.get(label).copied()
    }

    /// Register names shadow user symbols.
    pub fn lookup(&self, label: &str) -> Option<u32> {
        register::register_number(label).or_else(|| self.get(label))
    }

    /// Labels grouped by initial letter, letters ascending, insertion order
    /// within a letter. Each entry prints as `LABEL<TAB>locctr`.
    pub fn display(&self) -> String {
        let mut groups: BTreeMap<char, Vec<&str>> = BTreeMap::new();
        for label in &self.order {
            let initial = label.chars().next().unwrap_or(' ');
            groups.entry(initial).or_insert_with(Vec::new).push(label);
        }

        let mut out = String::new();
        for labels in groups.values() {
            for label in labels {
                out.push_str(&format!("{}\t{:04X}\n", label, self.map[*label]));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_rejects_duplicates() {
        let mut table = SymbolTable::new();
        assert!(table.insert("LOOP", 0x1003));
        assert!(!table.insert("LOOP", 0x2000));
        assert_eq!(table.get("LOOP"), Some(0x1003));
    }

    #[test]
    fn contains_after_insert() {
        let mut table = SymbolTable::new();
        table.insert("FIRST", 0x1000);
        assert!(table.contains("FIRST"));
        assert!(!table.contains("SECOND"));
    }

    #[test]
    fn registers_shadow_symbols() {
        let mut table = SymbolTable::new();
        table.insert("X", 0x5000);
        assert_eq!(table.lookup("X"), Some(1));
        assert_eq!(table.get("X"), Some(0x5000));
        assert_eq!(table.lookup("BUFFER"), None);
    }

    #[test]
    fn display_groups_by_initial_letter() {
        let mut table = SymbolTable::new();
        table.insert("ZERO", 0x30);
        table.insert("FIRST", 0x1000);
        table.insert("FIVE", 0x1003);
        table.insert("ALPHA", 0x10);

        assert_eq!(
            table.display(),
            "ALPHA\t0010\nFIRST\t1000\nFIVE\t1003\nZERO\t0030\n"
        );
    }
}
