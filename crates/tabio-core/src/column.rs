//! A table column: descriptor plus storage.

use tabio_model::{Cell, ColumnData, ColumnDescriptor, ElementType, Value};

/// How missing values are represented in a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nullability<'a> {
    /// No representation of missing values beyond NaN in float columns.
    NoNulls,
    /// Elements equal to the sentinel are missing.
    Sentinel(&'a Value),
    /// Elements whose mask entry is `true` are missing.
    Mask(&'a [bool]),
}

/// Descriptor and data of one column.
///
/// Masked tables give every column a mask (one entry per element) and a fill
/// value; unmasked tables give none.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) descriptor: ColumnDescriptor,
    pub(crate) data: ColumnData,
    pub(crate) mask: Option<Vec<bool>>,
    pub(crate) fill: Option<Value>,
}

impl Column {
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// Mutable descriptor; only unit, description, and format can change.
    pub fn descriptor_mut(&mut self) -> &mut ColumnDescriptor {
        &mut self.descriptor
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn element_type(&self) -> ElementType {
        self.descriptor.element_type()
    }

    /// Elements per row.
    pub fn width(&self) -> usize {
        self.descriptor.shape()
    }

    pub fn is_vector(&self) -> bool {
        self.descriptor.is_vector()
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.width()
    }

    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    pub fn fill(&self) -> Option<&Value> {
        self.fill.as_ref()
    }

    pub fn nullability(&self) -> Nullability<'_> {
        match (&self.mask, self.descriptor.null()) {
            (Some(mask), _) => Nullability::Mask(mask),
            (None, Some(null)) => Nullability::Sentinel(null),
            (None, None) => Nullability::NoNulls,
        }
    }

    /// Whether the element at a flat index is missing (masked, sentinel, or NaN).
    pub fn is_null(&self, index: usize) -> bool {
        if self.data.is_nan(index) {
            return true;
        }
        match self.nullability() {
            Nullability::Mask(mask) => mask.get(index).copied().unwrap_or(false),
            Nullability::Sentinel(null) => self.data.get(index).as_ref() == Some(null),
            Nullability::NoNulls => false,
        }
    }

    /// Whether the element at a flat index is masked out.
    pub fn is_masked(&self, index: usize) -> bool {
        self.mask
            .as_ref()
            .and_then(|mask| mask.get(index).copied())
            .unwrap_or(false)
    }

    /// Native value of one row.
    pub fn value(&self, row: usize) -> Option<Value> {
        self.data.row(row, self.width())
    }

    /// Plain value of one row; NaN and masked elements become `Cell::Null`.
    pub fn cell(&self, row: usize) -> Option<Cell> {
        let width = self.width();
        let plain = |index: usize| -> Option<Cell> {
            if self.is_masked(index) {
                return Some(Cell::Null);
            }
            self.data.get(index).map(Cell::from)
        };
        if width == 1 {
            plain(row)
        } else {
            let start = row.checked_mul(width)?;
            (start..start + width)
                .map(plain)
                .collect::<Option<Vec<_>>>()
                .map(Cell::List)
        }
    }

    /// Copy of this column holding only the given rows, in order.
    pub(crate) fn take_rows(&self, rows: &[usize]) -> Column {
        let width = self.width();
        Column {
            descriptor: self.descriptor.clone(),
            data: self.data.take_rows(rows, width),
            mask: self.mask.as_ref().map(|mask| {
                rows.iter()
                    .flat_map(|&row| mask[row * width..(row + 1) * width].iter().copied())
                    .collect()
            }),
            fill: self.fill.clone(),
        }
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
            && self.data == other.data
            && self.mask == other.mask
            && self.fill == other.fill
    }
}
