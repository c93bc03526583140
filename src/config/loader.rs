//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::Sections;
use crate::config::validation::{validate_sections, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Section {
        section: String,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Section { section, source } => {
                write!(f, "Invalid [{}] section: {}", section, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Section { source, .. } => Some(source),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Parse and validate a configuration document.
pub fn parse_sections(content: &str) -> Result<Sections, ConfigError> {
    let table: toml::Table = toml::from_str(content).map_err(ConfigError::Parse)?;
    let sections = Sections::from_table(table);

    validate_sections(&sections).map_err(ConfigError::Validation)?;

    Ok(sections)
}

/// Load and validate configuration from a TOML file.
pub fn load_sections(path: &Path) -> Result<Sections, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_sections(&content)
}
