//! Ordered collections of uniquely named tables.

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use tabio_model::KeywordValue;
use tracing::debug;

use crate::config::TableConfig;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{Result, SchemaError};
use crate::table::{Table, trim_keyword};

/// Highest numeric suffix tried when resolving a table name collision.
const MAX_NAME_SUFFIX: usize = 10_000;

const UNTITLED: &str = "Untitled";

/// Tables keyed by unique name, with set-level keywords and comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: IndexMap<String, Table>,
    keywords: IndexMap<String, KeywordValue>,
    comments: Vec<String>,
    masked: bool,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set whose new tables follow the configured masked default.
    pub fn with_config(config: &TableConfig) -> Self {
        Self::with_masked(config.masked_default())
    }

    pub fn with_masked(masked: bool) -> Self {
        Self {
            masked,
            ..Self::default()
        }
    }

    /// Build a set by appending each table in turn.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut set = Self::new();
        for table in tables {
            set.append(table)?;
        }
        Ok(set)
    }

    /// Empty table in this set's masked mode (not yet added).
    pub fn new_table(&self) -> Table {
        Table::with_masked(self.masked)
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Add a table under a unique key and return the key.
    ///
    /// A name already in use gets the first free suffix `name.00001`,
    /// `name.00002`, ...; an unnamed table becomes `Untitled.00001`, ... The
    /// table's own name is set to the key.
    pub fn append(&mut self, mut table: Table) -> Result<String> {
        let key = match table.name() {
            Some(name) if !self.tables.contains_key(name) => name.to_string(),
            Some(name) => {
                let key = self.free_name(name)?;
                diagnostics::emit(Diagnostic::TableRenamed {
                    from: name.to_string(),
                    to: key.clone(),
                });
                key
            }
            None => {
                let key = self.free_name(UNTITLED)?;
                diagnostics::emit(Diagnostic::UntitledTable { name: key.clone() });
                key
            }
        };
        table.set_name(Some(key.clone()));
        self.tables.insert(key.clone(), table);
        Ok(key)
    }

    fn free_name(&self, base: &str) -> Result<String> {
        (1..=MAX_NAME_SUFFIX)
            .map(|suffix| format!("{base}.{suffix:05}"))
            .find(|candidate| !self.tables.contains_key(candidate))
            .ok_or_else(|| {
                SchemaError::NameSpaceExhausted {
                    base: base.to_string(),
                }
                .into()
            })
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Mutable access to a table. Its name is restored to `name` when the
    /// guard is dropped, so keys and table names stay in step.
    pub fn get_mut(&mut self, name: &str) -> Option<TableMut<'_>> {
        let (key, table) = self.tables.get_full_mut(name).map(|(_, key, table)| (key, table))?;
        Some(TableMut { key, table })
    }

    pub fn get_index(&self, index: usize) -> Option<&Table> {
        self.tables.get_index(index).map(|(_, table)| table)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn keywords(&self) -> &IndexMap<String, KeywordValue> {
        &self.keywords
    }

    pub fn add_keyword(&mut self, key: &str, value: impl Into<KeywordValue>) {
        self.keywords
            .insert(key.trim().to_string(), trim_keyword(value.into()));
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn add_comment(&mut self, comment: &str) {
        self.comments.push(comment.trim().to_string());
    }

    /// Drop all tables, keywords, and comments.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.keywords.clear();
        self.comments.clear();
    }

    /// Descriptions of every table, separated by blank lines.
    pub fn describe(&self) -> String {
        self.tables
            .values()
            .map(Table::describe)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Mutable borrow of a table in a [`TableSet`].
#[derive(Debug)]
pub struct TableMut<'a> {
    key: &'a str,
    table: &'a mut Table,
}

impl Deref for TableMut<'_> {
    type Target = Table;

    fn deref(&self) -> &Table {
        self.table
    }
}

impl DerefMut for TableMut<'_> {
    fn deref_mut(&mut self) -> &mut Table {
        self.table
    }
}

impl Drop for TableMut<'_> {
    fn drop(&mut self) {
        if self.table.name() != Some(self.key) {
            debug!(key = self.key, "restored table name to its set key");
            self.table.set_name(Some(self.key.to_string()));
        }
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = (&'a String, &'a Table);
    type IntoIter = indexmap::map::Iter<'a, String, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_collisions_get_suffixes() {
        let mut set = TableSet::new();
        let (keys, diagnostics) = diagnostics::capture(|| {
            vec![
                set.append(Table::new().named("X")).unwrap(),
                set.append(Table::new().named("X")).unwrap(),
                set.append(Table::new()).unwrap(),
                set.append(Table::new()).unwrap(),
            ]
        });
        assert_eq!(keys, vec!["X", "X.00001", "Untitled.00001", "Untitled.00002"]);
        assert_eq!(set.names(), keys);
        assert_eq!(set.get("X.00001").unwrap().name(), Some("X.00001"));
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(
            diagnostics[0],
            Diagnostic::TableRenamed {
                from: "X".into(),
                to: "X.00001".into()
            }
        );
    }

    #[test]
    fn test_new_table_follows_masked_default() {
        let config = TableConfig::from_toml_str("[general]\nmasked_default = true").unwrap();
        let set = TableSet::with_config(&config);
        assert!(set.new_table().is_masked());
        assert!(!TableSet::new().new_table().is_masked());
    }

    #[test]
    fn test_keywords_and_comments_are_trimmed() {
        let mut set = TableSet::new();
        set.add_keyword(" origin ", " survey ");
        set.add_comment("  first pass ");
        assert_eq!(set.keywords()["origin"], KeywordValue::from("survey"));
        assert_eq!(set.comments(), &["first pass".to_string()]);
    }

    #[test]
    fn test_get_mut_keeps_name_equal_to_key() {
        let mut set = TableSet::new();
        set.append(Table::new().named("stars")).unwrap();
        {
            let mut table = set.get_mut("stars").unwrap();
            table.add_keyword("epoch", 2000.0);
            table.set_name(Some("galaxies".to_string()));
        }
        {
            let mut table = set.get_mut("stars").unwrap();
            table.reset();
        }
        let table = set.get("stars").unwrap();
        assert_eq!(table.name(), Some("stars"));
        assert!(table.keywords().is_empty());
        assert!(set.get("galaxies").is_none());
        assert!(set.get_mut("galaxies").is_none());
    }
}
