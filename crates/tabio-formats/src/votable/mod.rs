//! VOTable documents with TABLEDATA serialization.
//!
//! Table keywords map to `PARAM` elements and comments to
//! `INFO name="comment"` elements. Numeric vector columns use `arraysize`.
//! An empty `TD` is a missing value.

mod reader;
mod writer;

pub use reader::{read_votable, read_votable_set};
pub use writer::{write_votable, write_votable_set};

use tabio_core::{ElementType, Result, TableError};

const FORMAT: &str = "vo";

/// Option selecting one table of a multi-table document.
const SELECTOR: &str = "tid";

/// `INFO` name used for comments.
const COMMENT_INFO: &str = "comment";

fn element_type(datatype: &str) -> Result<ElementType> {
    Ok(match datatype {
        "boolean" => ElementType::Bool,
        "unsignedByte" => ElementType::UInt8,
        "short" => ElementType::Int16,
        "int" => ElementType::Int32,
        "long" => ElementType::Int64,
        "float" => ElementType::Float32,
        "double" => ElementType::Float64,
        "char" | "unicodeChar" => ElementType::Str(0),
        other => {
            return Err(TableError::format(
                FORMAT,
                format!("unsupported datatype {other:?}"),
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_types() {
        assert_eq!(element_type("short").unwrap(), ElementType::Int16);
        assert_eq!(element_type("unicodeChar").unwrap(), ElementType::Str(0));
        assert!(element_type("floatComplex").is_err());
    }
}
