//! Adding, removing, renaming, and appending columns.

use tabio_model::{ColumnData, ElementType};
use tracing::debug;

use super::Table;
use crate::column::Column;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{AppendMismatchKind, Result, SchemaError};
use crate::typing::{self, ColumnInput, ColumnOptions, Position};

impl Table {
    /// Add a column built from `input` and `options`.
    ///
    /// Nothing changes unless every check passes: the name must be new, the
    /// row count must match, and a `before`/`after` anchor must exist.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        input: impl Into<ColumnInput>,
        options: ColumnOptions,
    ) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SchemaError::duplicate(name).into());
        }
        let position = options.position.clone();
        let column = typing::build_column(&name, input.into(), options, self.masked)?;
        if !self.columns.is_empty() && column.rows() != self.len() {
            return Err(SchemaError::RowCountMismatch {
                name,
                expected: self.len(),
                actual: column.rows(),
            }
            .into());
        }
        let index = self.resolve_position(position.as_ref())?;
        debug!(column = %name, index, element_type = %column.element_type(), "adding column");
        self.columns.shift_insert(index, name, column);
        Ok(())
    }

    fn resolve_position(&self, position: Option<&Position>) -> Result<usize> {
        let anchor = |name: &str| {
            self.columns
                .get_index_of(name)
                .ok_or_else(|| SchemaError::missing(name))
        };
        Ok(match position {
            None => self.columns.len(),
            Some(Position::Before(name)) => anchor(name.as_str())?,
            Some(Position::After(name)) => anchor(name.as_str())? + 1,
            Some(Position::Index(index)) => (*index).min(self.columns.len()),
        })
    }

    /// Add a zero-filled column.
    ///
    /// `shape` is `(rows, width)`. It is required when the table has no
    /// columns; otherwise it defaults to `(len(), 1)`.
    pub fn add_empty_column(
        &mut self,
        name: impl Into<String>,
        dtype: ElementType,
        shape: Option<(usize, usize)>,
        options: ColumnOptions,
    ) -> Result<()> {
        let (rows, width) = match shape {
            Some((rows, width)) => (rows, width.max(1)),
            None if self.columns.is_empty() => return Err(SchemaError::ShapeRequired.into()),
            None => (self.len(), 1),
        };
        let len = rows
            .checked_mul(width)
            .ok_or(SchemaError::ShapeOverflow { rows, width })?;
        let data = ColumnData::zeros(dtype, len);
        let input = if width > 1 {
            ColumnInput::Vector { data, width }
        } else {
            ColumnInput::Data(data)
        };
        self.add_column(name, input, options)
    }

    /// Remove one column.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        self.remove_columns(&[name])
    }

    /// Remove several columns; all names are checked before any is removed.
    pub fn remove_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if let Some(missing) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.columns.contains_key(*name))
        {
            return Err(SchemaError::missing(missing).into());
        }
        for name in names {
            let name = name.as_ref();
            self.columns.shift_remove(name);
            if self.primary_key.as_deref() == Some(name) {
                self.primary_key = None;
            }
        }
        Ok(())
    }

    /// Keep only the named columns, removing all others.
    pub fn keep_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if let Some(missing) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.columns.contains_key(*name))
        {
            return Err(SchemaError::missing(missing).into());
        }
        let remove: Vec<String> = self
            .columns
            .keys()
            .filter(|name| !names.iter().any(|keep| keep.as_ref() == name.as_str()))
            .cloned()
            .collect();
        if remove.len() == self.columns.len() {
            return Err(SchemaError::NothingToKeep {
                names: names.iter().map(|name| name.as_ref().to_string()).collect(),
            }
            .into());
        }
        self.remove_columns(&remove)
    }

    /// Rename a column in place; the primary key follows the rename.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        if self.columns.contains_key(new) {
            return Err(SchemaError::duplicate(new).into());
        }
        let Some(index) = self.columns.get_index_of(old) else {
            return Err(SchemaError::missing(old).into());
        };
        let Some((_, column)) = self.columns.shift_remove_index(index) else {
            return Err(SchemaError::missing(old).into());
        };
        self.columns.shift_insert(index, new.to_string(), column);
        if self.primary_key.as_deref() == Some(old) {
            self.primary_key = Some(new.to_string());
        }
        Ok(())
    }

    /// Append the rows of another table with identical columns.
    ///
    /// A table without columns takes over the other table's columns.
    pub fn append(&mut self, other: &Table) -> Result<()> {
        if self.columns.is_empty() {
            for (name, column) in &other.columns {
                let mut column = column.clone();
                self.conform_mask(&mut column, name);
                self.columns.insert(name.clone(), column);
            }
            return Ok(());
        }
        self.check_appendable(other)?;
        for (name, column) in &mut self.columns {
            let Some(incoming) = other.columns.get(name) else {
                continue;
            };
            column.data.extend_from(&incoming.data)?;
            if let Some(mask) = column.mask.as_mut() {
                match &incoming.mask {
                    Some(other_mask) => mask.extend_from_slice(other_mask),
                    None => mask.extend(std::iter::repeat_n(false, incoming.data.len())),
                }
            } else if incoming.mask.as_ref().is_some_and(|m| m.iter().any(|&v| v)) {
                diagnostics::emit(Diagnostic::MaskIgnored {
                    column: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn conform_mask(&self, column: &mut Column, name: &str) {
        if self.masked {
            if column.mask.is_none() {
                column.mask = Some(vec![false; column.data.len()]);
                column.fill = Some(typing::default_fill(column.element_type()));
            }
        } else {
            column.fill = None;
            if column.mask.take().is_some_and(|m| m.iter().any(|&v| v)) {
                diagnostics::emit(Diagnostic::MaskIgnored {
                    column: name.to_string(),
                });
            }
        }
    }

    fn check_appendable(&self, other: &Table) -> Result<()> {
        let mismatch = |column: &str, kind| SchemaError::AppendMismatch {
            column: column.to_string(),
            kind,
        };
        for (index, (name, column)) in self.columns.iter().enumerate() {
            let Some((other_name, incoming)) = other.columns.get_index(index) else {
                return Err(mismatch(name, AppendMismatchKind::MissingColumn).into());
            };
            if other_name != name {
                return Err(mismatch(name, AppendMismatchKind::MissingColumn).into());
            }
            let (ours, theirs) = (column.descriptor(), incoming.descriptor());
            let kind = if ours.element_type() != theirs.element_type()
                || ours.shape() != theirs.shape()
            {
                Some(AppendMismatchKind::Type)
            } else if ours.unit() != theirs.unit() {
                Some(AppendMismatchKind::Unit)
            } else if ours.null() != theirs.null() {
                Some(AppendMismatchKind::Null)
            } else if ours.description() != theirs.description() {
                Some(AppendMismatchKind::Description)
            } else if ours.format() != theirs.format() {
                Some(AppendMismatchKind::Format)
            } else {
                None
            };
            if let Some(kind) = kind {
                return Err(mismatch(name, kind).into());
            }
        }
        if let Some((extra, _)) = other.columns.get_index(self.columns.len()) {
            return Err(mismatch(extra, AppendMismatchKind::MissingColumn).into());
        }
        Ok(())
    }
}
