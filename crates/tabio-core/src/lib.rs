pub mod column;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod registry;
pub mod table;
pub mod table_set;
pub mod typing;

pub use column::{Column, Nullability};
pub use config::{GeneralConfig, TableConfig};
pub use diagnostics::{Diagnostic, Policy};
pub use error::{AppendMismatchKind, Result, SchemaError, TableError};
pub use io::{IoRequest, ensure_no_vector_columns, ensure_writable};
pub use registry::{
    FormatInfo, Operation, Registry, TableReader, TableSetReader, TableSetWriter, TableWriter,
};
pub use table::Table;
pub use table_set::{TableMut, TableSet};
pub use typing::{ColumnInput, ColumnOptions, Position, default_fill};

pub use tabio_model::{
    Cell, ColumnData, ColumnDescriptor, DisplayFormat, ElementType, KeywordValue, ModelError,
    Value, parse_bool,
};
