//! Subsystem presence.
//!
//! Two views of the same closed set of subsystems:
//! - [`DeclaredSubsystems`]: which sections the loaded configuration declares,
//!   resolved once right after the configuration loads
//! - [`Presence`]: which subsystems the orchestrator has attempted to start in
//!   this run; teardown is gated on it

use crate::config::{ConfigSection, ConfigurationStore};
use crate::subsystem::SubsystemKind;

/// Presence flags, one per subsystem.
///
/// A flag is set right before the first manager call for that subsystem and
/// is never cleared during the run, so `stop` also tears down subsystems whose
/// start failed partway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    cache: bool,
    storage: bool,
    api: bool,
    tasks: bool,
}

impl Presence {
    pub fn is_present(&self, kind: SubsystemKind) -> bool {
        match kind {
            SubsystemKind::Cache => self.cache,
            SubsystemKind::Storage => self.storage,
            SubsystemKind::Api => self.api,
            SubsystemKind::Tasks => self.tasks,
        }
    }

    pub fn cache(&self) -> bool {
        self.cache
    }

    pub fn storage(&self) -> bool {
        self.storage
    }

    pub fn api(&self) -> bool {
        self.api
    }

    pub fn tasks(&self) -> bool {
        self.tasks
    }

    /// No subsystem was attempted.
    pub fn is_empty(&self) -> bool {
        !(self.cache || self.storage || self.api || self.tasks)
    }

    pub(crate) fn mark(&mut self, kind: SubsystemKind) {
        match kind {
            SubsystemKind::Cache => self.cache = true,
            SubsystemKind::Storage => self.storage = true,
            SubsystemKind::Api => self.api = true,
            SubsystemKind::Tasks => self.tasks = true,
        }
    }
}

/// Subsystem sections declared by the loaded configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredSubsystems {
    cache: Option<ConfigSection>,
    storage: Option<ConfigSection>,
    api: Option<ConfigSection>,
    tasks: Option<ConfigSection>,
}

impl DeclaredSubsystems {
    pub fn resolve(store: &dyn ConfigurationStore) -> Self {
        let lookup = |kind: SubsystemKind| store.section(kind.section_name()).cloned();
        Self {
            cache: lookup(SubsystemKind::Cache),
            storage: lookup(SubsystemKind::Storage),
            api: lookup(SubsystemKind::Api),
            tasks: lookup(SubsystemKind::Tasks),
        }
    }

    pub fn section(&self, kind: SubsystemKind) -> Option<&ConfigSection> {
        match kind {
            SubsystemKind::Cache => self.cache.as_ref(),
            SubsystemKind::Storage => self.storage.as_ref(),
            SubsystemKind::Api => self.api.as_ref(),
            SubsystemKind::Tasks => self.tasks.as_ref(),
        }
    }

    pub fn is_declared(&self, kind: SubsystemKind) -> bool {
        self.section(kind).is_some()
    }

    /// Declared subsystems in start order.
    pub fn kinds(&self) -> impl Iterator<Item = SubsystemKind> + '_ {
        SubsystemKind::ALL
            .into_iter()
            .filter(move |kind| self.is_declared(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryConfigurationStore;

    fn declared(doc: &str) -> DeclaredSubsystems {
        let mut store = InMemoryConfigurationStore::new(doc);
        store.load().unwrap();
        DeclaredSubsystems::resolve(&store)
    }

    #[test]
    fn test_resolve_recognized_sections() {
        let declared = declared("[redis]\n[tasks]\n[unrelated]\n");
        assert_eq!(
            declared.kinds().collect::<Vec<_>>(),
            vec![SubsystemKind::Cache, SubsystemKind::Tasks]
        );
        assert_eq!(
            declared.section(SubsystemKind::Cache).map(|s| s.name()),
            Some("redis")
        );
        assert!(!declared.is_declared(SubsystemKind::Storage));
    }

    #[test]
    fn test_resolve_nothing() {
        assert_eq!(declared("").kinds().count(), 0);
    }

    #[test]
    fn test_presence_mark() {
        let mut presence = Presence::default();
        assert!(presence.is_empty());

        presence.mark(SubsystemKind::Api);
        assert!(presence.api());
        assert!(presence.is_present(SubsystemKind::Api));
        assert!(!presence.is_present(SubsystemKind::Tasks));
        assert!(!presence.is_empty());
    }
}
