//! Subsystem manager interfaces.
//!
//! # Responsibilities
//! - Name the closed set of optional subsystems and their config sections
//! - Define the contract the orchestrator drives for each manager
//! - Hold the managers the embedding application registers
//!
//! # Design Decisions
//! - Connection-style managers (cache, storage) connect endpoints; they never
//!   touch the task group
//! - Service-style managers (api, tasks) register their run loops into the
//!   supervised task group and must honour its cancellation token
//! - The schema registry is optional; everything else must be registered when
//!   its section is declared

use std::fmt;

use async_trait::async_trait;

use crate::config::ConfigSection;
use crate::lifecycle::TaskGroup;
use crate::BoxError;

/// Optional subsystem, gated by the presence of its configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsystemKind {
    Cache,
    Storage,
    Api,
    Tasks,
}

impl SubsystemKind {
    /// Start order. Teardown walks [`SubsystemKind::TEARDOWN`] instead.
    pub const ALL: [SubsystemKind; 4] = [Self::Cache, Self::Storage, Self::Api, Self::Tasks];

    /// Teardown order.
    pub const TEARDOWN: [SubsystemKind; 4] = [Self::Tasks, Self::Api, Self::Cache, Self::Storage];

    /// Configuration section that declares this subsystem.
    pub fn section_name(self) -> &'static str {
        match self {
            Self::Cache => "redis",
            Self::Storage => "storage",
            Self::Api => "api",
            Self::Tasks => "tasks",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Storage => "storage",
            Self::Api => "api",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manager for a pool of outbound connections (cache endpoints, databases).
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Read endpoint definitions from the subsystem's section.
    async fn load_from_configuration(&mut self, section: &ConfigSection) -> Result<(), BoxError>;

    /// Open every endpoint that is marked to connect at startup.
    async fn connect_all_at_start(&mut self) -> Result<(), BoxError>;

    /// Close every open endpoint. May be called after a partial start.
    async fn disconnect_all(&mut self) -> Result<(), BoxError>;
}

/// Registry of schema tables bound to the storage subsystem.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Bind every registered table to its (already connected) storage endpoint.
    async fn connect_all(&mut self) -> Result<(), BoxError>;
}

/// Manager of long-running services (API servers, scheduled tasks).
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Read service definitions from the subsystem's section.
    async fn load_from_configuration(&mut self, section: &ConfigSection) -> Result<(), BoxError> {
        let _ = section;
        Ok(())
    }

    /// Launch every service loop into `group`.
    ///
    /// Loops must return once the group's token is cancelled.
    async fn start_all(&mut self, group: &TaskGroup) -> Result<(), BoxError>;

    /// Ask every service to stop. May be called after a partial start.
    async fn stop_all(&mut self) -> Result<(), BoxError>;
}

/// Managers registered by the embedding application.
#[derive(Default)]
pub struct Subsystems {
    pub(crate) cache: Option<Box<dyn ConnectionManager>>,
    pub(crate) storage: Option<Box<dyn ConnectionManager>>,
    pub(crate) tables: Option<Box<dyn SchemaRegistry>>,
    pub(crate) api: Option<Box<dyn ServiceManager>>,
    pub(crate) tasks: Option<Box<dyn ServiceManager>>,
}

impl Subsystems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, manager: impl ConnectionManager + 'static) -> Self {
        self.cache = Some(Box::new(manager));
        self
    }

    pub fn with_storage(mut self, manager: impl ConnectionManager + 'static) -> Self {
        self.storage = Some(Box::new(manager));
        self
    }

    pub fn with_tables(mut self, registry: impl SchemaRegistry + 'static) -> Self {
        self.tables = Some(Box::new(registry));
        self
    }

    pub fn with_api(mut self, manager: impl ServiceManager + 'static) -> Self {
        self.api = Some(Box::new(manager));
        self
    }

    pub fn with_tasks(mut self, manager: impl ServiceManager + 'static) -> Self {
        self.tasks = Some(Box::new(manager));
        self
    }

    /// Whether a manager is registered for `kind`.
    pub fn is_registered(&self, kind: SubsystemKind) -> bool {
        match kind {
            SubsystemKind::Cache => self.cache.is_some(),
            SubsystemKind::Storage => self.storage.is_some(),
            SubsystemKind::Api => self.api.is_some(),
            SubsystemKind::Tasks => self.tasks.is_some(),
        }
    }
}

impl fmt::Debug for Subsystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subsystems")
            .field("cache", &self.cache.is_some())
            .field("storage", &self.storage.is_some())
            .field("tables", &self.tables.is_some())
            .field("api", &self.api.is_some())
            .field("tasks", &self.tasks.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_names() {
        assert_eq!(SubsystemKind::Cache.section_name(), "redis");
        assert_eq!(SubsystemKind::Storage.section_name(), "storage");
        assert_eq!(SubsystemKind::Api.section_name(), "api");
        assert_eq!(SubsystemKind::Tasks.section_name(), "tasks");
    }

    #[test]
    fn test_teardown_order() {
        assert_eq!(
            SubsystemKind::TEARDOWN,
            [
                SubsystemKind::Tasks,
                SubsystemKind::Api,
                SubsystemKind::Cache,
                SubsystemKind::Storage
            ]
        );
    }

    struct Idle;

    #[async_trait]
    impl ServiceManager for Idle {
        async fn start_all(&mut self, _group: &TaskGroup) -> Result<(), BoxError> {
            Ok(())
        }

        async fn stop_all(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn test_registration() {
        let subsystems = Subsystems::new().with_tasks(Idle);
        assert!(subsystems.is_registered(SubsystemKind::Tasks));
        assert!(!subsystems.is_registered(SubsystemKind::Api));
        assert!(!subsystems.is_registered(SubsystemKind::Cache));
    }
}
