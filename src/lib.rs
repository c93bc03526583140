//! Service runtime: boots configured subsystems in dependency order,
//! supervises their tasks under one cancellation-aware group, and tears them
//! down in reverse order.

pub mod app;
pub mod args;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod subsystem;

/// Error type returned by hooks, managers and supervised tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use app::{LifecycleError, Orchestrator};
pub use config::{ConfigSection, ConfigurationStore, FileConfigurationStore};
pub use lifecycle::{Shutdown, TaskGroup};
pub use subsystem::{ConnectionManager, SchemaRegistry, ServiceManager, SubsystemKind, Subsystems};
