//! Library configuration loaded from TOML.
//!
//! ```toml
//! [general]
//! masked_default = true
//! ```
//!
//! Configuration is never read implicitly: the application loads it and
//! passes it to [`Table::with_config`](crate::Table::with_config) or
//! [`TableSet::with_config`](crate::TableSet::with_config).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TableError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub general: GeneralConfig,
}

/// Defaults applied to newly created tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Whether new tables track missing values with masks instead of sentinels.
    pub masked_default: bool,
}

impl TableConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content, path.to_path_buf())?;
        tracing::debug!(path = %path.display(), "loaded table configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, PathBuf::from("<string>"))
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self> {
        toml::from_str(content).map_err(|source| TableError::Config { path, source })
    }

    pub fn masked_default(&self) -> bool {
        self.general.masked_default
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unmasked() {
        assert!(!TableConfig::default().masked_default());
        assert!(!TableConfig::from_toml_str("").unwrap().masked_default());
    }

    #[test]
    fn test_parse_masked_default() {
        let config = TableConfig::from_toml_str("[general]\nmasked_default = true\n").unwrap();
        assert!(config.masked_default());
        let round = TableConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(round, config);
    }

    #[test]
    fn test_invalid_toml_names_source() {
        let err = TableConfig::from_toml_str("[general]\nmasked_default = 3\n").unwrap_err();
        assert!(matches!(err, TableError::Config { .. }));
        assert!(err.to_string().contains("<string>"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabio.toml");
        fs::write(&path, "[general]\nmasked_default = true\n").unwrap();
        assert!(TableConfig::load(&path).unwrap().masked_default());
    }
}
