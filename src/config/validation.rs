//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Recognized subsystem sections must be tables
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Sections → Result<(), Vec<ValidationError>>
//! - Section bodies are not inspected; managers validate their own settings

use thiserror::Error;

use crate::config::schema::Sections;
use crate::subsystem::SubsystemKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("section [{section}] must be a table, found {found}")]
    NotATable { section: String, found: &'static str },
}

pub fn validate_sections(sections: &Sections) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<ValidationError> = SubsystemKind::ALL
        .iter()
        .filter_map(|kind| sections.get(kind.section_name()))
        .filter(|section| !section.value().is_table())
        .map(|section| ValidationError::NotATable {
            section: section.name().to_string(),
            found: section.value().type_str(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
