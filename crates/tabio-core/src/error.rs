//! Error types for table operations, registration, and dispatch.

use std::path::PathBuf;

use tabio_model::ModelError;
use thiserror::Error;

/// Errors raised by table, table set, registry, and codec operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// No codec is registered for the tag and operation.
    #[error("format {tag:?} is not registered for {operation}")]
    UnknownFormat { tag: String, operation: String },

    /// No format tag is registered for the extension.
    #[error("unknown file extension {extension:?}; pass an explicit format")]
    UnknownExtension { extension: String },

    /// A multi-table source needs a selector.
    #[error("source contains several tables; select one with the {selector:?} option: {}", format_candidates(.candidates))]
    AmbiguousSource {
        selector: String,
        candidates: Vec<(usize, String)>,
    },

    /// Output target exists and overwriting was not requested.
    #[error("file exists: {path} (set overwrite to replace it)")]
    ExistingTarget { path: PathBuf },

    /// The format cannot represent vector columns.
    #[error("format does not support vector columns: {}", .columns.join(", "))]
    VectorColumns { columns: Vec<String> },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A registry key is already taken.
    #[error("{kind} {key:?} is already registered")]
    RegistrationConflict { kind: String, key: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    /// Malformed input or unsupported content for a codec.
    #[error("{format}: {message}")]
    Format { format: String, message: String },

    #[error("failed to parse configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural errors of tables and table sets.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("column {name:?} already exists")]
    DuplicateColumn { name: String },

    #[error("column {name:?} does not exist")]
    MissingColumn { name: String },

    #[error("column {name:?} has {actual} rows but the table has {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("shape is required when adding an empty column to a table without columns")]
    ShapeRequired,

    #[error("shape ({rows}, {width}) has too many elements")]
    ShapeOverflow { rows: usize, width: usize },

    #[error("keeping {names:?} would leave no columns")]
    NothingToKeep { names: Vec<String> },

    #[error("mask has {actual} entries but {expected} are required")]
    MaskLengthMismatch { expected: usize, actual: usize },

    #[error("row {row} is out of range for a table of {len} rows")]
    RowOutOfRange { row: usize, len: usize },

    #[error("primary key column {name:?} contains null values")]
    PrimaryKeyNulls { name: String },

    #[error("primary key column {name:?} contains duplicate values")]
    PrimaryKeyDuplicates { name: String },

    #[error("cannot append: column {column:?} differs ({kind})")]
    AppendMismatch { column: String, kind: AppendMismatchKind },

    #[error("null value {value:?} is not valid for column {name:?}")]
    InvalidNull { name: String, value: String },

    #[error("mask for column {name:?} has {actual} entries but the column has {expected}")]
    MissingMask {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no free name left for table {base:?}")]
    NameSpaceExhausted { base: String },
}

/// Reason two tables cannot be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMismatchKind {
    MissingColumn,
    Type,
    Unit,
    Null,
    Description,
    Format,
}

impl AppendMismatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppendMismatchKind::MissingColumn => "missing column",
            AppendMismatchKind::Type => "type",
            AppendMismatchKind::Unit => "unit",
            AppendMismatchKind::Null => "null",
            AppendMismatchKind::Description => "description",
            AppendMismatchKind::Format => "format",
        }
    }
}

impl std::fmt::Display for AppendMismatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn format_candidates(candidates: &[(usize, String)]) -> String {
    candidates
        .iter()
        .map(|(index, name)| format!("{index}: {name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

impl TableError {
    /// Create a Format error.
    pub fn format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            format: format.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_format(tag: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnknownFormat {
            tag: tag.into(),
            operation: operation.into(),
        }
    }
}

impl SchemaError {
    pub(crate) fn missing(name: impl Into<String>) -> Self {
        Self::MissingColumn { name: name.into() }
    }

    pub(crate) fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateColumn { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TableError::AmbiguousSource {
            selector: "tid".to_string(),
            candidates: vec![(0, "stars".to_string()), (1, "galaxies".to_string())],
        };
        assert_eq!(
            format!("{err}"),
            "source contains several tables; select one with the \"tid\" option: 0: stars, 1: galaxies"
        );

        let err = TableError::from(SchemaError::AppendMismatch {
            column: "flux".to_string(),
            kind: AppendMismatchKind::Unit,
        });
        assert_eq!(format!("{err}"), "cannot append: column \"flux\" differs (unit)");
    }
}
