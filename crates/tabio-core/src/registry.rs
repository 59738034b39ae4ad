//! Format registry: codecs by tag and tags by file extension.
//!
//! The registry is an ordinary value. Applications build one at startup
//! (usually through `tabio_formats::builtin_registry`) and pass it by
//! reference to [`Table::read`](crate::Table::read) and friends.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, TableError};
use crate::io::IoRequest;
use crate::table::Table;
use crate::table_set::TableSet;

/// Populates a table from a source.
pub trait TableReader: Send + Sync {
    fn read(&self, table: &mut Table, request: &IoRequest) -> Result<()>;
}

/// Writes a table to a target.
pub trait TableWriter: Send + Sync {
    fn write(&self, table: &Table, request: &IoRequest) -> Result<()>;
}

/// Populates a table set from a source.
pub trait TableSetReader: Send + Sync {
    fn read_set(&self, set: &mut TableSet, request: &IoRequest) -> Result<()>;
}

/// Writes a table set to a target.
pub trait TableSetWriter: Send + Sync {
    fn write_set(&self, set: &TableSet, request: &IoRequest) -> Result<()>;
}

impl<F> TableReader for F
where
    F: Fn(&mut Table, &IoRequest) -> Result<()> + Send + Sync,
{
    fn read(&self, table: &mut Table, request: &IoRequest) -> Result<()> {
        self(table, request)
    }
}

impl<F> TableWriter for F
where
    F: Fn(&Table, &IoRequest) -> Result<()> + Send + Sync,
{
    fn write(&self, table: &Table, request: &IoRequest) -> Result<()> {
        self(table, request)
    }
}

impl<F> TableSetReader for F
where
    F: Fn(&mut TableSet, &IoRequest) -> Result<()> + Send + Sync,
{
    fn read_set(&self, set: &mut TableSet, request: &IoRequest) -> Result<()> {
        self(set, request)
    }
}

impl<F> TableSetWriter for F
where
    F: Fn(&TableSet, &IoRequest) -> Result<()> + Send + Sync,
{
    fn write_set(&self, set: &TableSet, request: &IoRequest) -> Result<()> {
        self(set, request)
    }
}

/// Operation a codec provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    SetRead,
    SetWrite,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::SetRead => "set read",
            Operation::SetWrite => "set write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one registered format tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInfo {
    pub tag: String,
    pub operations: Vec<Operation>,
    pub extensions: Vec<String>,
}

impl FormatInfo {
    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// Compression suffixes skipped when detecting a format from a file name.
const COMPRESSION_SUFFIXES: &[&str] = &["gz", "bz2", "bzip2"];

/// Codecs keyed by lowercase tag, and tags keyed by lowercase extension.
#[derive(Clone, Default)]
pub struct Registry {
    readers: IndexMap<String, Arc<dyn TableReader>>,
    writers: IndexMap<String, Arc<dyn TableWriter>>,
    set_readers: IndexMap<String, Arc<dyn TableSetReader>>,
    set_writers: IndexMap<String, Arc<dyn TableSetWriter>>,
    extensions: IndexMap<String, String>,
}

fn insert_entry<V>(
    map: &mut IndexMap<String, V>,
    kind: Operation,
    key: &str,
    value: V,
    allow_override: bool,
) -> Result<()> {
    let key = key.trim().to_lowercase();
    if map.contains_key(&key) && !allow_override {
        return Err(TableError::RegistrationConflict {
            kind: format!("{kind} codec"),
            key,
        });
    }
    map.insert(key, value);
    Ok(())
}

impl Registry {
    /// Registry without any formats.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_reader(
        &mut self,
        tag: &str,
        reader: impl TableReader + 'static,
        allow_override: bool,
    ) -> Result<()> {
        let reader: Arc<dyn TableReader> = Arc::new(reader);
        insert_entry(&mut self.readers, Operation::Read, tag, reader, allow_override)
    }

    pub fn register_writer(
        &mut self,
        tag: &str,
        writer: impl TableWriter + 'static,
        allow_override: bool,
    ) -> Result<()> {
        let writer: Arc<dyn TableWriter> = Arc::new(writer);
        insert_entry(&mut self.writers, Operation::Write, tag, writer, allow_override)
    }

    pub fn register_set_reader(
        &mut self,
        tag: &str,
        reader: impl TableSetReader + 'static,
        allow_override: bool,
    ) -> Result<()> {
        let reader: Arc<dyn TableSetReader> = Arc::new(reader);
        insert_entry(&mut self.set_readers, Operation::SetRead, tag, reader, allow_override)
    }

    pub fn register_set_writer(
        &mut self,
        tag: &str,
        writer: impl TableSetWriter + 'static,
        allow_override: bool,
    ) -> Result<()> {
        let writer: Arc<dyn TableSetWriter> = Arc::new(writer);
        insert_entry(&mut self.set_writers, Operation::SetWrite, tag, writer, allow_override)
    }

    /// Map file extensions (case-insensitive) to a tag.
    ///
    /// All extensions are checked before any is registered.
    pub fn register_extensions(
        &mut self,
        tag: &str,
        extensions: &[&str],
        allow_override: bool,
    ) -> Result<()> {
        let tag = tag.trim().to_lowercase();
        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .collect();
        if !allow_override
            && let Some(taken) = extensions.iter().find(|ext| self.extensions.contains_key(*ext))
        {
            return Err(TableError::RegistrationConflict {
                kind: "extension".to_string(),
                key: taken.clone(),
            });
        }
        for extension in extensions {
            self.extensions.insert(extension, tag.clone());
        }
        Ok(())
    }

    /// Detect the format tag of a location from its file name.
    ///
    /// The file name is lowercased and a trailing compression suffix is
    /// skipped. A name without a dot is looked up whole.
    pub fn determine_type(&self, location: &Path, verbose: bool) -> Result<String> {
        let file_name = location
            .file_name()
            .map_or_else(|| location.to_string_lossy(), |name| name.to_string_lossy())
            .to_lowercase();
        let extension = extension_of(&file_name);
        match self.extensions.get(extension) {
            Some(tag) => {
                if verbose {
                    info!(format = %tag, "auto-detected format");
                }
                Ok(tag.clone())
            }
            None => Err(TableError::UnknownExtension {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn reader(&self, tag: &str) -> Result<Arc<dyn TableReader>> {
        lookup(&self.readers, tag, Operation::Read)
    }

    pub fn writer(&self, tag: &str) -> Result<Arc<dyn TableWriter>> {
        lookup(&self.writers, tag, Operation::Write)
    }

    pub fn set_reader(&self, tag: &str) -> Result<Arc<dyn TableSetReader>> {
        lookup(&self.set_readers, tag, Operation::SetRead)
    }

    pub fn set_writer(&self, tag: &str) -> Result<Arc<dyn TableSetWriter>> {
        lookup(&self.set_writers, tag, Operation::SetWrite)
    }

    /// Registered tags with their operations and extensions.
    pub fn formats(&self) -> Vec<FormatInfo> {
        let mut tags: Vec<&String> = Vec::new();
        for tag in self
            .readers
            .keys()
            .chain(self.writers.keys())
            .chain(self.set_readers.keys())
            .chain(self.set_writers.keys())
            .chain(self.extensions.values())
        {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags.into_iter()
            .map(|tag| {
                let operations = [
                    (Operation::Read, self.readers.contains_key(tag)),
                    (Operation::Write, self.writers.contains_key(tag)),
                    (Operation::SetRead, self.set_readers.contains_key(tag)),
                    (Operation::SetWrite, self.set_writers.contains_key(tag)),
                ]
                .into_iter()
                .filter_map(|(operation, present)| present.then_some(operation))
                .collect();
                let extensions = self
                    .extensions
                    .iter()
                    .filter(|(_, owner)| *owner == tag)
                    .map(|(extension, _)| extension.clone())
                    .collect();
                FormatInfo {
                    tag: tag.clone(),
                    operations,
                    extensions,
                }
            })
            .collect()
    }
}

fn lookup<V: ?Sized>(
    map: &IndexMap<String, Arc<V>>,
    tag: &str,
    operation: Operation,
) -> Result<Arc<V>> {
    let tag = tag.trim().to_lowercase();
    map.get(&tag)
        .cloned()
        .ok_or_else(|| TableError::unknown_format(tag, operation.as_str()))
}

fn extension_of(file_name: &str) -> &str {
    let mut parts = file_name.rsplit('.');
    let last = parts.next().unwrap_or(file_name);
    if !file_name.contains('.') {
        return file_name;
    }
    if COMPRESSION_SUFFIXES.contains(&last)
        && let Some(previous) = parts.next()
    {
        return previous;
    }
    last
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .field("writers", &self.writers.keys().collect::<Vec<_>>())
            .field("set_readers", &self.set_readers.keys().collect::<Vec<_>>())
            .field("set_writers", &self.set_writers.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_reader(_: &mut Table, _: &IoRequest) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let mut registry = Registry::new();
        registry.register_reader("demo", noop_reader, false).unwrap();
        let err = registry
            .register_reader("DEMO", noop_reader, false)
            .unwrap_err();
        assert!(matches!(err, TableError::RegistrationConflict { ref key, .. } if key == "demo"));
        registry.register_reader("demo", noop_reader, true).unwrap();
    }

    #[test]
    fn test_extension_conflicts_leave_registry_unchanged() {
        let mut registry = Registry::new();
        registry.register_extensions("a", &["x"], false).unwrap();
        assert!(registry.register_extensions("b", &["y", "x"], false).is_err());
        assert!(registry.determine_type(Path::new("f.y"), false).is_err());
        registry.register_extensions("b", &["y", "x"], true).unwrap();
        assert_eq!(registry.determine_type(Path::new("f.x"), false).unwrap(), "b");
    }

    #[test]
    fn test_determine_type() {
        let mut registry = Registry::new();
        registry
            .register_extensions("ipac", &["tbl", "ipac"], false)
            .unwrap();
        let detect = |location: &str| registry.determine_type(Path::new(location), false);
        assert_eq!(detect("data/catalog.TBL").unwrap(), "ipac");
        assert_eq!(detect("catalog.tbl.gz").unwrap(), "ipac");
        assert_eq!(detect("catalog.tbl.bz2").unwrap(), "ipac");
        assert_eq!(detect("IPAC").unwrap(), "ipac");
        assert_eq!(detect("some.dir/ipac").unwrap(), "ipac");
        assert!(matches!(
            detect("catalog.fits"),
            Err(TableError::UnknownExtension { ref extension }) if extension == "fits"
        ));
    }

    #[test]
    fn test_lookup_names_missing_operation() {
        let mut registry = Registry::new();
        registry.register_reader("demo", noop_reader, false).unwrap();
        assert!(registry.reader("Demo").is_ok());
        let err = registry.writer("demo").err().unwrap();
        assert_eq!(err.to_string(), "format \"demo\" is not registered for write");
    }

    #[test]
    fn test_formats_lists_capabilities() {
        let mut registry = Registry::new();
        registry.register_reader("demo", noop_reader, false).unwrap();
        registry.register_extensions("demo", &["dm"], false).unwrap();
        let formats = registry.formats();
        assert_eq!(formats.len(), 1);
        assert!(formats[0].supports(Operation::Read));
        assert!(!formats[0].supports(Operation::Write));
        assert_eq!(formats[0].extensions, vec!["dm".to_string()]);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
