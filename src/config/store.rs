//! Configuration stores consumed by the orchestrator.

use std::path::{Path, PathBuf};

use crate::config::loader::{load_sections, parse_sections, ConfigError};
use crate::config::schema::{ConfigSection, Sections};

/// Source of the configuration sections that gate subsystem startup.
pub trait ConfigurationStore: Send + Sync {
    /// (Re)load every section. Called once at the beginning of startup.
    fn load(&mut self) -> Result<(), ConfigError>;

    /// Look up a loaded section by name.
    fn section(&self, name: &str) -> Option<&ConfigSection>;
}

/// Reads a TOML file on every [`ConfigurationStore::load`].
#[derive(Debug, Clone)]
pub struct FileConfigurationStore {
    path: PathBuf,
    sections: Sections,
}

impl FileConfigurationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sections: Sections::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }
}

impl ConfigurationStore for FileConfigurationStore {
    fn load(&mut self) -> Result<(), ConfigError> {
        self.sections = load_sections(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            sections = self.sections.len(),
            "Configuration loaded"
        );
        Ok(())
    }

    fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }
}

/// Parses an inline TOML document on every load. Useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigurationStore {
    document: String,
    sections: Sections,
}

impl InMemoryConfigurationStore {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            sections: Sections::new(),
        }
    }
}

impl ConfigurationStore for InMemoryConfigurationStore {
    fn load(&mut self) -> Result<(), ConfigError> {
        self.sections = parse_sections(&self.document)?;
        Ok(())
    }

    fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sections_empty_until_loaded() {
        let mut store = InMemoryConfigurationStore::new("[api]\n");
        assert!(store.section("api").is_none());

        store.load().unwrap();
        assert!(store.section("api").is_some());
    }

    #[test]
    fn test_file_store_reloads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[redis]").unwrap();

        let mut store = FileConfigurationStore::new(file.path());
        store.load().unwrap();
        assert!(store.section("redis").is_some());
        assert!(store.section("tasks").is_none());

        writeln!(file, "[tasks]").unwrap();
        store.load().unwrap();
        assert!(store.section("tasks").is_some());
    }
}
