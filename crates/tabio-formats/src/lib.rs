//! Built-in codecs for tabio tables.
//!
//! - **ipac**: fixed-width IPAC tables (`.tbl`, `.ipac`)
//! - **vo**: VOTable XML with TABLEDATA, single tables and table sets (`.xml`, `.vot`)
//! - **ascii**: comma-separated text (`.csv`)
//! - **rdb**: tab-separated text with a type row (`.rdb`)
//! - **html**: HTML tables, write only (`.html`, `.htm`)

mod common;
mod delimited;
mod html;
mod ipac;
mod votable;
mod xml;

use tabio_core::{Registry, Result};

pub use delimited::{read_ascii, read_rdb, write_ascii, write_rdb};
pub use html::write_html;
pub use ipac::{read_ipac, write_ipac};
pub use votable::{read_votable, read_votable_set, write_votable, write_votable_set};

/// Register every built-in codec and its file extensions.
pub fn register_builtin_formats(registry: &mut Registry) -> Result<()> {
    registry.register_reader("ipac", read_ipac, false)?;
    registry.register_writer("ipac", write_ipac, false)?;
    registry.register_extensions("ipac", &["ipac", "tbl"], false)?;

    registry.register_reader("vo", read_votable, false)?;
    registry.register_writer("vo", write_votable, false)?;
    registry.register_set_reader("vo", read_votable_set, false)?;
    registry.register_set_writer("vo", write_votable_set, false)?;
    registry.register_extensions("vo", &["xml", "vot"], false)?;

    registry.register_reader("ascii", read_ascii, false)?;
    registry.register_writer("ascii", write_ascii, false)?;
    registry.register_extensions("ascii", &["csv"], false)?;

    registry.register_reader("rdb", read_rdb, false)?;
    registry.register_writer("rdb", write_rdb, false)?;
    registry.register_extensions("rdb", &["rdb"], false)?;

    registry.register_writer("html", write_html, false)?;
    registry.register_extensions("html", &["html", "htm"], false)?;
    Ok(())
}

/// A registry holding all built-in codecs.
pub fn builtin_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    register_builtin_formats(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tabio_core::Operation;

    #[test]
    fn test_builtin_registry_detects_extensions() {
        let registry = builtin_registry().unwrap();
        let detect = |name: &str| registry.determine_type(Path::new(name), false).unwrap();
        assert_eq!(detect("catalog.tbl"), "ipac");
        assert_eq!(detect("catalog.vot.gz"), "vo");
        assert_eq!(detect("catalog.CSV"), "ascii");
        assert_eq!(detect("catalog.rdb"), "rdb");
        assert_eq!(detect("catalog.htm"), "html");
    }

    #[test]
    fn test_builtin_capabilities() {
        let registry = builtin_registry().unwrap();
        let formats = registry.formats();
        let vo = formats.iter().find(|info| info.tag == "vo").unwrap();
        assert!(vo.supports(Operation::SetRead));
        assert!(vo.supports(Operation::SetWrite));
        let html = formats.iter().find(|info| info.tag == "html").unwrap();
        assert!(!html.supports(Operation::Read));
        assert!(html.supports(Operation::Write));
    }

    #[test]
    fn test_registering_twice_conflicts() {
        let mut registry = builtin_registry().unwrap();
        assert!(register_builtin_formats(&mut registry).is_err());
    }
}
