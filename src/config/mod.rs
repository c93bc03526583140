//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse into top-level sections)
//!     → validation.rs (semantic checks)
//!     → Sections (immutable until the next load)
//!     → store.rs (ConfigurationStore consumed by the orchestrator)
//!     → section presence decides which subsystems boot
//! ```
//!
//! # Design Decisions
//! - The orchestrator only checks section presence; bodies belong to managers
//! - Managers deserialize their own section via `ConfigSection::deserialize`
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{ConfigSection, Sections};
pub use store::{ConfigurationStore, FileConfigurationStore, InMemoryConfigurationStore};
