//! Read/write dispatch through a [`Registry`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tabio_model::KeywordValue;
use tracing::{debug, info_span};

use crate::diagnostics::{self, Diagnostic, Policy};
use crate::error::{Result, TableError};
use crate::registry::Registry;
use crate::table::Table;
use crate::table_set::TableSet;

/// A read or write request: where, in which format, and with which options.
#[derive(Debug, Clone)]
pub struct IoRequest {
    location: PathBuf,
    format: Option<String>,
    verbose: bool,
    overwrite: bool,
    options: IndexMap<String, KeywordValue>,
}

impl IoRequest {
    /// Request for a location with format auto-detection, verbose, no overwrite.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            format: None,
            verbose: true,
            overwrite: false,
            options: IndexMap::new(),
        }
    }

    /// Use an explicit format tag instead of the file extension.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Suppress diagnostics for this request.
    pub fn quiet(self) -> Self {
        self.verbose(false)
    }

    /// Allow replacing an existing output file.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set a format-specific option.
    pub fn option(mut self, key: &str, value: impl Into<KeywordValue>) -> Self {
        self.options.insert(key.to_lowercase(), value.into());
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn allows_overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn options(&self) -> &IndexMap<String, KeywordValue> {
        &self.options
    }

    pub fn get_option(&self, key: &str) -> Option<&KeywordValue> {
        self.options.get(&key.to_lowercase())
    }

    /// Integer option, failing with a format error when it is not an integer.
    pub fn usize_option(&self, format: &str, key: &str) -> Result<Option<usize>> {
        self.get_option(key)
            .map(|value| {
                value
                    .as_i64()
                    .and_then(|v| usize::try_from(v).ok())
                    .ok_or_else(|| {
                        TableError::format(format, format!("option {key:?} must be a non-negative integer, got {value}"))
                    })
            })
            .transpose()
    }

    /// Resolve the format tag: the explicit one, or the one registered for
    /// the file extension.
    pub fn resolve_format(&self, registry: &Registry) -> Result<String> {
        match &self.format {
            Some(tag) => Ok(tag.trim().to_lowercase()),
            None => registry.determine_type(&self.location, self.verbose),
        }
    }
}

/// Fail if `path` exists and overwriting was not requested.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(TableError::ExistingTarget {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Fail if the table has vector columns.
pub fn ensure_no_vector_columns(table: &Table) -> Result<()> {
    let columns = table.vector_columns();
    if columns.is_empty() {
        Ok(())
    } else {
        Err(TableError::VectorColumns { columns })
    }
}

impl Table {
    /// Replace this table's content with the table at the request location.
    pub fn read(&mut self, registry: &Registry, request: &IoRequest) -> Result<()> {
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        let tag = request.resolve_format(registry)?;
        let span = info_span!("read", format = %tag, location = %request.location().display());
        let _entered = span.enter();
        let reader = registry.reader(&tag)?;
        debug!("reading table");
        self.reset();
        reader.read(self, request)?;
        debug!(rows = self.len(), columns = self.num_columns(), "read table");
        Ok(())
    }

    /// Write this table to the request location.
    pub fn write(&self, registry: &Registry, request: &IoRequest) -> Result<()> {
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        let tag = request.resolve_format(registry)?;
        let span = info_span!("write", format = %tag, location = %request.location().display());
        let _entered = span.enter();
        let writer = registry.writer(&tag)?;
        debug!(rows = self.len(), columns = self.num_columns(), "writing table");
        writer.write(self, request)
    }

    /// Read with the format given separately.
    #[deprecated(note = "use `read` with `IoRequest::with_format`")]
    pub fn read_as(&mut self, registry: &Registry, format: &str, request: &IoRequest) -> Result<()> {
        let request = request.clone().with_format(format);
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        diagnostics::emit(Diagnostic::Deprecated {
            old: "read_as".to_string(),
            replacement: "read".to_string(),
        });
        self.read(registry, &request)
    }

    /// Write with the format given separately.
    #[deprecated(note = "use `write` with `IoRequest::with_format`")]
    pub fn write_as(&self, registry: &Registry, format: &str, request: &IoRequest) -> Result<()> {
        let request = request.clone().with_format(format);
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        diagnostics::emit(Diagnostic::Deprecated {
            old: "write_as".to_string(),
            replacement: "write".to_string(),
        });
        self.write(registry, &request)
    }
}

impl TableSet {
    /// Replace this set's content with every table at the request location.
    pub fn read(&mut self, registry: &Registry, request: &IoRequest) -> Result<()> {
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        let tag = request.resolve_format(registry)?;
        let span = info_span!("read_set", format = %tag, location = %request.location().display());
        let _entered = span.enter();
        let reader = registry.set_reader(&tag)?;
        self.reset();
        reader.read_set(self, request)?;
        debug!(tables = self.len(), "read table set");
        Ok(())
    }

    /// Write every table of this set to the request location.
    pub fn write(&self, registry: &Registry, request: &IoRequest) -> Result<()> {
        let _policy = diagnostics::scoped(Policy::from_verbose(request.is_verbose()));
        let tag = request.resolve_format(registry)?;
        let span = info_span!("write_set", format = %tag, location = %request.location().display());
        let _entered = span.enter();
        let writer = registry.set_writer(&tag)?;
        debug!(tables = self.len(), "writing table set");
        writer.write_set(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{self, policy};
    use crate::typing::ColumnOptions;

    fn fixed_reader(table: &mut Table, request: &IoRequest) -> Result<()> {
        assert_eq!(policy(), Policy::from_verbose(request.is_verbose()));
        diagnostics::emit(Diagnostic::codec("demo", "reading"));
        table.set_name(Some("fixed".to_string()));
        table.add_column("n", vec![1_i32, 2], ColumnOptions::new())
    }

    fn failing_writer(_: &Table, _: &IoRequest) -> Result<()> {
        Err(TableError::format("demo", "always fails"))
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_reader("demo", fixed_reader, false).unwrap();
        registry.register_writer("demo", failing_writer, false).unwrap();
        registry.register_extensions("demo", &["dm"], false).unwrap();
        registry
    }

    #[test]
    fn test_read_resets_then_populates() {
        let mut table = Table::new();
        table.add_keyword("stale", 1_i64);
        table
            .add_column("old", vec![0.5_f64], ColumnOptions::new())
            .unwrap();
        table.read(&registry(), &IoRequest::new("x.dm")).unwrap();
        assert_eq!(table.name(), Some("fixed"));
        assert_eq!(table.column_names(), vec!["n"]);
        assert!(table.keywords().is_empty());
    }

    #[test]
    fn test_quiet_request_suppresses_and_restores() {
        let mut table = Table::new();
        let (result, diagnostics) = diagnostics::capture(|| {
            table.read(&registry(), &IoRequest::new("x.dm").quiet())
        });
        result.unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(policy(), Policy::Emit);
    }

    #[test]
    fn test_policy_restored_after_failed_write() {
        let table = Table::new();
        let err = table
            .write(&registry(), &IoRequest::new("out.dm").quiet())
            .unwrap_err();
        assert!(matches!(err, TableError::Format { .. }));
        assert_eq!(policy(), Policy::Emit);
    }

    #[test]
    fn test_unknown_format_and_operation() {
        let mut table = Table::new();
        let err = table
            .read(&registry(), &IoRequest::new("x.dm").with_format("nope"))
            .unwrap_err();
        assert!(matches!(err, TableError::UnknownFormat { ref tag, .. } if tag == "nope"));
        let mut set = TableSet::new();
        let err = set.read(&registry(), &IoRequest::new("x.dm")).unwrap_err();
        assert!(
            matches!(err, TableError::UnknownFormat { ref operation, .. } if operation == "set read")
        );
    }

    #[test]
    #[allow(deprecated)]
    fn test_read_as_warns_and_forwards() {
        let mut table = Table::new();
        let (result, diagnostics) = diagnostics::capture(|| {
            table.read_as(&registry(), "DEMO", &IoRequest::new("no-extension"))
        });
        result.unwrap();
        assert_eq!(table.len(), 2);
        assert!(matches!(diagnostics[0], Diagnostic::Deprecated { .. }));
    }

    #[test]
    fn test_ensure_writable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dm");
        ensure_writable(&path, false).unwrap();
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            ensure_writable(&path, false),
            Err(TableError::ExistingTarget { .. })
        ));
        ensure_writable(&path, true).unwrap();
    }

    #[test]
    fn test_usize_option() {
        let request = IoRequest::new("x").option("TID", 2_i64).option("bad", "x");
        assert_eq!(request.usize_option("vo", "tid").unwrap(), Some(2));
        assert_eq!(request.usize_option("vo", "none").unwrap(), None);
        assert!(request.usize_option("vo", "bad").is_err());
    }
}
