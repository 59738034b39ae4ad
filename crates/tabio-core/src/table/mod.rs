//! In-memory tables.
//!
//! A [`Table`] is an ordered set of equally long, uniquely named columns plus
//! free-form keywords and comments. Columns are changed through the
//! structural API ([`Table::add_column`], [`Table::remove_columns`], ...) so
//! every column always has a descriptor and all columns share one row count.

mod describe;
mod rows;
mod structure;

use indexmap::IndexMap;
use tabio_model::{ColumnDescriptor, KeywordValue};

use crate::column::Column;
use crate::config::TableConfig;
use crate::error::{Result, SchemaError};

/// A named collection of typed columns with metadata.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub(crate) name: Option<String>,
    pub(crate) columns: IndexMap<String, Column>,
    pub(crate) keywords: IndexMap<String, KeywordValue>,
    pub(crate) comments: Vec<String>,
    pub(crate) primary_key: Option<String>,
    pub(crate) masked: bool,
}

impl Table {
    /// Empty, unnamed, unmasked table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table using the configured masked default.
    pub fn with_config(config: &TableConfig) -> Self {
        Self::with_masked(config.masked_default())
    }

    /// Empty table with an explicit masked mode.
    pub fn with_masked(masked: bool) -> Self {
        Self {
            masked,
            ..Self::default()
        }
    }

    /// Set the name, builder style.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Whether missing values are tracked with masks.
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Number of rows (0 when there are no columns).
    pub fn len(&self) -> usize {
        self.columns
            .first()
            .map_or(0, |(_, column)| column.rows())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.num_columns())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Descriptor of a column.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name).map(Column::descriptor)
    }

    /// Mutable descriptor of a column (unit, description, and format).
    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnDescriptor> {
        self.columns.get_mut(name).map(Column::descriptor_mut)
    }

    /// Descriptor, data, and null representation of a column.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Columns in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    pub(crate) fn require_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| SchemaError::missing(name).into())
    }

    /// Display format of a column as text, e.g. `25.17e`.
    pub fn format_of(&self, name: &str) -> Result<String> {
        Ok(self.require_column(name)?.descriptor().format().to_string())
    }

    pub fn keywords(&self) -> &IndexMap<String, KeywordValue> {
        &self.keywords
    }

    /// Add or replace a keyword; key and string values are trimmed.
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

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Drop all columns, keywords, comments, and the primary key.
    pub fn reset(&mut self) {
        self.columns.clear();
        self.keywords.clear();
        self.comments.clear();
        self.primary_key = None;
    }

    /// Names of columns holding more than one element per row.
    pub fn vector_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, column)| column.is_vector())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub(crate) fn trim_keyword(value: KeywordValue) -> KeywordValue {
    match value {
        KeywordValue::Str(text) => KeywordValue::Str(text.trim().to_string()),
        other => other,
    }
}

impl PartialEq for Table {
    /// Name, columns, keywords, and comments, all order-sensitive.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns.iter().eq(other.columns.iter())
            && self.keywords.iter().eq(other.keywords.iter())
            && self.comments == other.comments
    }
}
