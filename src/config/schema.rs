//! Configuration schema definitions.
//!
//! A configuration document is a TOML table whose top-level keys are
//! sections. The orchestrator only cares whether a section exists; the
//! section body belongs to the manager that reads it.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::config::loader::ConfigError;

/// One named top-level section of the configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSection {
    name: String,
    value: toml::Value,
}

impl ConfigSection {
    pub fn new(name: impl Into<String>, value: toml::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Section name (the top-level key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw section body.
    pub fn value(&self) -> &toml::Value {
        &self.value
    }

    /// Look up a key inside a table section.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.value.get(key)
    }

    /// Deserialize the section body into a manager's own settings type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        self.value
            .clone()
            .try_into()
            .map_err(|source| ConfigError::Section {
                section: self.name.clone(),
                source,
            })
    }
}

/// All sections of a loaded configuration document, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    inner: BTreeMap<String, ConfigSection>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a parsed document into its top-level sections.
    pub fn from_table(table: toml::Table) -> Self {
        let inner = table
            .into_iter()
            .map(|(name, value)| (name.clone(), ConfigSection::new(name, value)))
            .collect();
        Self { inner }
    }

    pub fn insert(&mut self, section: ConfigSection) {
        self.inner.insert(section.name.clone(), section);
    }

    pub fn get(&self, name: &str) -> Option<&ConfigSection> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigSection> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
