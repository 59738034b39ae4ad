//! Row access, row selection, sorting, and the primary key.

use std::cmp::Ordering;

use tabio_model::{Cell, ColumnData, ColumnDescriptor, DisplayFormat, ElementType, Value};
use tracing::debug;

use super::Table;
use crate::column::Column;
use crate::error::{Result, SchemaError};
use crate::typing::default_fill;

impl Table {
    fn check_row(&self, row: usize) -> Result<()> {
        let len = self.len();
        if row >= len {
            return Err(SchemaError::RowOutOfRange { row, len }.into());
        }
        Ok(())
    }

    /// One row as native values, in column order.
    pub fn row(&self, row: usize) -> Result<Vec<Value>> {
        self.check_row(row)?;
        Ok(self
            .columns
            .values()
            .filter_map(|column| column.value(row))
            .collect())
    }

    /// One row as plain values; NaN and masked elements become `Cell::Null`.
    ///
    /// Sentinel values are returned as they are stored.
    pub fn row_plain(&self, row: usize) -> Result<Vec<Cell>> {
        self.check_row(row)?;
        Ok(self
            .columns
            .values()
            .filter_map(|column| column.cell(row))
            .collect())
    }

    /// New table with the rows where `mask` is true.
    pub fn where_mask(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.len() {
            return Err(SchemaError::MaskLengthMismatch {
                expected: self.len(),
                actual: mask.len(),
            }
            .into());
        }
        let selected: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect();
        Ok(self.select(&selected))
    }

    /// New table with the given rows in the given order (repeats allowed).
    pub fn rows(&self, ids: &[usize]) -> Result<Table> {
        if let Some(&row) = ids.iter().find(|&&row| row >= self.len()) {
            return Err(SchemaError::RowOutOfRange {
                row,
                len: self.len(),
            }
            .into());
        }
        Ok(self.select(ids))
    }

    /// Copy metadata and the selected rows; the primary key is not carried.
    fn select(&self, rows: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.take_rows(rows)))
                .collect(),
            keywords: self.keywords.clone(),
            comments: self.comments.clone(),
            primary_key: None,
            masked: self.masked,
        }
    }

    /// Stable ascending sort by one or more columns.
    ///
    /// NaN sorts after every number; vector columns compare element by
    /// element.
    pub fn sort<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<()> {
        let key_columns = keys
            .iter()
            .map(|key| self.require_column(key.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            key_columns
                .iter()
                .map(|column| column.data().compare_rows(a, b, column.width()))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        for column in self.columns.values_mut() {
            *column = column.take_rows(&order);
        }
        Ok(())
    }

    /// Use a column as the unique, non-null row identifier.
    ///
    /// On failure the previous primary key is kept. Later mutations do not
    /// re-validate the key.
    pub fn set_primary_key(&mut self, name: &str) -> Result<()> {
        let column = self.require_column(name)?;
        if (0..column.data().len()).any(|index| column.is_null(index)) {
            return Err(SchemaError::PrimaryKeyNulls {
                name: name.to_string(),
            }
            .into());
        }
        if has_duplicate_rows(column) {
            return Err(SchemaError::PrimaryKeyDuplicates {
                name: name.to_string(),
            }
            .into());
        }
        self.primary_key = Some(name.to_string());
        Ok(())
    }

    /// Convert integer columns to the smallest type of the same signedness
    /// that holds every value and the null sentinel.
    ///
    /// Returns the converted columns with their new types.
    pub fn narrow_integer_columns(&mut self) -> Result<Vec<(String, ElementType)>> {
        let mut narrowed = Vec::new();
        for (name, column) in &mut self.columns {
            let current = column.element_type();
            let Some(target) = narrowest_integer_type(column) else {
                continue;
            };
            if target.byte_width() >= current.byte_width() {
                continue;
            }
            let descriptor = column.descriptor();
            let format = if descriptor.format() == &DisplayFormat::default_for(current) {
                DisplayFormat::default_for(target)
            } else {
                descriptor.format().clone()
            };
            let mut replacement = ColumnDescriptor::new(target)
                .with_shape(descriptor.shape())
                .with_format(format);
            replacement.set_unit(descriptor.unit().map(str::to_string));
            replacement.set_description(descriptor.description().map(str::to_string));
            if let Some(null) = descriptor.null() {
                replacement = replacement.with_null(null.clone())?;
            }
            column.data = column.data.cast(target)?;
            column.descriptor = replacement;
            if let Some(fill) = column.fill.take() {
                column.fill = Some(narrowed_fill(fill, target)?);
            }
            debug!(column = %name, from = %current, to = %target, "narrowed integer column");
            narrowed.push((name.clone(), target));
        }
        Ok(narrowed)
    }
}

fn has_duplicate_rows(column: &Column) -> bool {
    let width = column.width();
    let data = column.data();
    let mut order: Vec<usize> = (0..column.rows()).collect();
    order.sort_by(|&a, &b| data.compare_rows(a, b, width));
    order
        .windows(2)
        .any(|pair| data.compare_rows(pair[0], pair[1], width).is_eq())
}

/// The fill converted to `target`, or the type's default when it does not fit.
fn narrowed_fill(fill: Value, target: ElementType) -> Result<Value> {
    let converted = ColumnData::from_values(target, std::slice::from_ref(&fill))?.get(0);
    Ok(match converted {
        Some(value) if value.as_i64().is_some() && value.as_i64() == fill.as_i64() => value,
        _ => default_fill(target),
    })
}

fn narrowest_integer_type(column: &Column) -> Option<ElementType> {
    let element_type = column.element_type();
    let (mut lo, mut hi) = column.data().integer_bounds()?;
    if let Some(null) = column.descriptor().null() {
        let value = match null {
            Value::UInt64(v) => i128::from(*v),
            other => i128::from(other.as_i64()?),
        };
        lo = lo.min(value);
        hi = hi.max(value);
    }
    if element_type.is_signed_integer() {
        Some(ElementType::smallest_signed(
            i64::try_from(lo).ok()?,
            i64::try_from(hi).ok()?,
        ))
    } else {
        Some(ElementType::smallest_unsigned(u64::try_from(hi).ok()?))
    }
}
