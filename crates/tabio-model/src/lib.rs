pub mod data;
pub mod descriptor;
pub mod element;
pub mod error;
pub mod format;
pub mod value;

pub use data::{ColumnData, fit_str};
pub use descriptor::ColumnDescriptor;
pub use element::ElementType;
pub use error::{ModelError, Result};
pub use format::DisplayFormat;
pub use value::{Cell, KeywordValue, Value, parse_bool};
