//! The orchestrator: `run → start → execute → stop`.

use tracing::Instrument;

use crate::app::error::{LifecycleError, StartStep};
use crate::app::hooks::{HookContext, HookPoint, Hooks};
use crate::app::identity::{debug_enabled, Identity, DEBUG_KEY_ENV};
use crate::app::presence::{DeclaredSubsystems, Presence};
use crate::args::{ArgDescriptor, ArgRegistry, RegistryError};
use crate::config::ConfigurationStore;
use crate::lifecycle::{Shutdown, TaskGroup};
use crate::observability::metrics;
use crate::subsystem::{SubsystemKind, Subsystems};
use crate::BoxError;

/// Boots, supervises and tears down the configured subsystems.
///
/// Owned by the embedding application's entry point. Configure it (identity,
/// managers, hooks, commands) before calling [`Orchestrator::run`].
pub struct Orchestrator {
    identity: Identity,
    is_loop: bool,
    debug_key: String,
    debug: bool,
    presence: Presence,
    declared: DeclaredSubsystems,
    hooks: Hooks,
    args: ArgRegistry,
    configuration: Box<dyn ConfigurationStore>,
    subsystems: Subsystems,
    shutdown: Shutdown,
}

impl Orchestrator {
    pub fn new(configuration: impl ConfigurationStore + 'static) -> Self {
        Self {
            identity: Identity::default(),
            is_loop: false,
            debug_key: String::new(),
            debug: false,
            presence: Presence::default(),
            declared: DeclaredSubsystems::default(),
            hooks: Hooks::default(),
            args: ArgRegistry::new(),
            configuration: Box::new(configuration),
            subsystems: Subsystems::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Establish identity, run mode and debug key.
    ///
    /// Debug mode turns on when the `DEBUG_KEY` environment variable equals `debug_key`.
    pub fn set(
        &mut self,
        name_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        is_loop: bool,
        debug_key: impl Into<String>,
    ) {
        self.identity.name_id = name_id.into();
        self.identity.title = title.into();
        self.identity.description = description.into();
        self.is_loop = is_loop;
        self.debug_key = debug_key.into();
        self.debug = debug_enabled(
            std::env::var(DEBUG_KEY_ENV).ok().as_deref(),
            &self.debug_key,
        );
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.identity.version = version.into();
    }

    pub fn with_subsystems(mut self, subsystems: Subsystems) -> Self {
        self.subsystems = subsystems;
        self
    }

    /// Use an externally owned stop handle instead of the built-in one.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn name_id(&self) -> &str {
        &self.identity.name_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn debug_key(&self) -> &str {
        &self.debug_key
    }

    /// Subsystems attempted during the last `start`.
    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Subsystem sections declared by the last loaded configuration.
    pub fn declared(&self) -> &DeclaredSubsystems {
        &self.declared
    }

    /// Handle for requesting a stop from outside the orchestrator.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn args(&self) -> &ArgRegistry {
        &self.args
    }

    pub fn define_command<F>(
        &mut self,
        name: impl Into<String>,
        token: impl Into<String>,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Orchestrator, &ArgDescriptor, &[String]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.args.define_command(name, token, callback)
    }

    pub fn define_option<F>(
        &mut self,
        name: impl Into<String>,
        token: impl Into<String>,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Orchestrator, &ArgDescriptor, &[String]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.args.define_option(name, token, callback)
    }

    /// Run the command or option bound to `invocation[0]` with the remaining values.
    ///
    /// Returns `Ok(false)` for an empty invocation.
    pub fn dispatch(&self, invocation: &[String]) -> Result<bool, BoxError> {
        let Some((token, values)) = invocation.split_first() else {
            return Ok(false);
        };
        let descriptor = self
            .args
            .find_by_token(token)
            .ok_or_else(|| RegistryError::UnknownToken {
                token: token.clone(),
            })?;
        descriptor.invoke(self, values)?;
        Ok(true)
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn set_hook<F>(&mut self, point: HookPoint, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.hooks.set(point, hook);
    }

    pub fn on_define<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::Define, hook);
    }

    pub fn on_define_configuration<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::DefineConfiguration, hook);
    }

    pub fn on_define_api<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::DefineApi, hook);
    }

    /// Where long-running work independent of any subsystem is launched.
    pub fn on_execute<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::Execute, hook);
    }

    pub fn on_start_storage_ready<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::StartStorageReady, hook);
    }

    /// Errors from this hook are logged and never abort teardown.
    pub fn on_stopping<F>(&mut self, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.set_hook(HookPoint::Stopping, hook);
    }

    /// Run the define-phase hooks, then start and supervise the subsystems.
    ///
    /// In loop mode this returns once every supervised task has finished (or
    /// one has failed) and teardown has run. An `Err` is the only failure
    /// signal; the host should treat it as fatal.
    pub async fn run(&mut self) -> Result<(), LifecycleError> {
        let span = tracing::info_span!("app", name_id = %self.identity.name_id);
        self.run_phases().instrument(span).await
    }

    /// Tear down every attempted subsystem in reverse start order.
    ///
    /// Stops at the first failing step. Loop-mode `run` calls this itself.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        let span = tracing::info_span!("app", name_id = %self.identity.name_id);
        self.teardown().instrument(span).await
    }

    async fn run_phases(&mut self) -> Result<(), LifecycleError> {
        metrics::record_phase("define");
        for point in HookPoint::DEFINE_PHASE {
            if let Err(e) = self.invoke_hook(point, None) {
                tracing::error!(error = %e, "Define phase failed");
                return Err(e);
            }
        }

        if let Err(e) = self.execute().await {
            tracing::error!(error = %e, "Run failed");
            return Err(e);
        }
        Ok(())
    }

    async fn execute(&mut self) -> Result<(), LifecycleError> {
        let root = self.shutdown.child_token();
        let _cancel_root = root.clone().drop_guard();
        let group = TaskGroup::new(&root);

        let outcome = self.supervise(&group).await;

        // A failed start still tears down whatever presence says was attempted.
        if self.is_loop {
            if outcome.is_err() {
                group.cancel();
            }
            if let Err(e) = self.teardown().await {
                tracing::warn!(error = %e, "Error in stopping");
            }
        }
        outcome
    }

    async fn supervise(&mut self, group: &TaskGroup) -> Result<(), LifecycleError> {
        self.start(group).await?;

        metrics::record_phase("execute");
        tracing::info!("Starting");
        if let Err(e) = self.invoke_hook(HookPoint::Execute, Some(group)) {
            tracing::error!(error = %e, "Execute hook failed");
            return Err(e);
        }

        if self.is_loop {
            tracing::info!(tasks = group.len(), "Waiting...");
            if let Err(failure) = group.wait().await {
                tracing::info!(reason = %failure, "Exit reason");
                return Err(LifecycleError::Task(failure));
            }
            tracing::info!("All supervised tasks finished");
        }
        Ok(())
    }

    async fn start(&mut self, group: &TaskGroup) -> Result<(), LifecycleError> {
        metrics::record_phase("start");
        tracing::info!(
            title = %self.identity.title,
            version = %self.identity.version,
            description = %self.identity.description,
            "Starting subsystems"
        );

        self.presence = Presence::default();
        if let Err(e) = self.configuration.load() {
            tracing::error!(error = %e, "Configuration load failed");
            return Err(LifecycleError::Configuration(e));
        }
        self.declared = DeclaredSubsystems::resolve(self.configuration.as_ref());
        tracing::debug!(
            declared = ?self.declared.kinds().collect::<Vec<_>>(),
            "Subsystem sections resolved"
        );

        if let Some(section) = self.declared.section(SubsystemKind::Cache) {
            let manager = registered(&mut self.subsystems.cache, SubsystemKind::Cache)?;
            self.presence.mark(SubsystemKind::Cache);
            manager
                .load_from_configuration(section)
                .await
                .map_err(startup_failure(SubsystemKind::Cache, StartStep::Load))?;
        }

        if let Some(section) = self.declared.section(SubsystemKind::Storage) {
            let manager = registered(&mut self.subsystems.storage, SubsystemKind::Storage)?;
            self.presence.mark(SubsystemKind::Storage);
            manager
                .load_from_configuration(section)
                .await
                .map_err(startup_failure(SubsystemKind::Storage, StartStep::Load))?;
        }

        if self.presence.cache() {
            if let Some(manager) = self.subsystems.cache.as_deref_mut() {
                manager
                    .connect_all_at_start()
                    .await
                    .map_err(startup_failure(SubsystemKind::Cache, StartStep::Connect))?;
            }
        }

        if self.presence.storage() {
            if let Some(manager) = self.subsystems.storage.as_deref_mut() {
                manager
                    .connect_all_at_start()
                    .await
                    .map_err(startup_failure(SubsystemKind::Storage, StartStep::Connect))?;
            }
            match self.subsystems.tables.as_deref_mut() {
                Some(tables) => tables
                    .connect_all()
                    .await
                    .map_err(startup_failure(SubsystemKind::Storage, StartStep::RegisterTables))?,
                None => tracing::debug!("No schema registry registered; skipping table registration"),
            }
            if let Err(e) = self.invoke_hook(HookPoint::StartStorageReady, None) {
                tracing::error!(error = %e, "Storage ready hook failed");
                return Err(e);
            }
        }

        for kind in [SubsystemKind::Api, SubsystemKind::Tasks] {
            let Some(section) = self.declared.section(kind) else {
                continue;
            };
            let slot = match kind {
                SubsystemKind::Api => &mut self.subsystems.api,
                _ => &mut self.subsystems.tasks,
            };
            let manager = registered(slot, kind)?;
            self.presence.mark(kind);
            manager
                .load_from_configuration(section)
                .await
                .map_err(startup_failure(kind, StartStep::Load))?;
            manager
                .start_all(group)
                .await
                .map_err(startup_failure(kind, StartStep::Start))?;
        }

        tracing::info!(presence = ?self.presence, "Subsystems started");
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), LifecycleError> {
        metrics::record_phase("stop");
        tracing::info!("Stopping");
        if let Err(e) = self.invoke_hook(HookPoint::Stopping, None) {
            tracing::warn!(error = %e, "Stopping hook failed; continuing teardown");
        }

        for kind in SubsystemKind::TEARDOWN {
            if !self.presence.is_present(kind) {
                continue;
            }
            if let Err(source) = stop_subsystem(&mut self.subsystems, kind).await {
                metrics::record_teardown_failure(kind.as_str());
                let err = LifecycleError::Shutdown {
                    subsystem: kind,
                    source,
                };
                tracing::error!(error = %err, "Teardown aborted");
                return Err(err);
            }
            tracing::debug!(subsystem = %kind, "Subsystem stopped");
        }

        tracing::info!("Stopped");
        Ok(())
    }

    fn invoke_hook(
        &mut self,
        point: HookPoint,
        group: Option<&TaskGroup>,
    ) -> Result<(), LifecycleError> {
        let ctx = HookContext::new(point, &self.identity, self.debug, self.presence, group);
        self.hooks
            .invoke(&ctx)
            .map_err(|source| LifecycleError::Hook { point, source })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("identity", &self.identity)
            .field("is_loop", &self.is_loop)
            .field("debug", &self.debug)
            .field("presence", &self.presence)
            .field("hooks", &self.hooks)
            .field("subsystems", &self.subsystems)
            .finish_non_exhaustive()
    }
}

fn registered<M: ?Sized>(
    slot: &mut Option<Box<M>>,
    subsystem: SubsystemKind,
) -> Result<&mut M, LifecycleError> {
    slot.as_deref_mut().ok_or_else(|| {
        let err = LifecycleError::MissingManager {
            subsystem,
            section: subsystem.section_name(),
        };
        tracing::error!(error = %err, "Startup failed");
        err
    })
}

fn startup_failure(
    subsystem: SubsystemKind,
    step: StartStep,
) -> impl FnOnce(BoxError) -> LifecycleError {
    move |source| {
        let err = LifecycleError::Startup {
            subsystem,
            step,
            source,
        };
        tracing::error!(error = %err, "Startup failed");
        err
    }
}

async fn stop_subsystem(subsystems: &mut Subsystems, kind: SubsystemKind) -> Result<(), BoxError> {
    match kind {
        SubsystemKind::Tasks => match subsystems.tasks.as_deref_mut() {
            Some(manager) => manager.stop_all().await,
            None => Ok(()),
        },
        SubsystemKind::Api => match subsystems.api.as_deref_mut() {
            Some(manager) => manager.stop_all().await,
            None => Ok(()),
        },
        SubsystemKind::Cache => match subsystems.cache.as_deref_mut() {
            Some(manager) => manager.disconnect_all().await,
            None => Ok(()),
        },
        SubsystemKind::Storage => match subsystems.storage.as_deref_mut() {
            Some(manager) => manager.disconnect_all().await,
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::ErrorKind;
    use crate::config::InMemoryConfigurationStore;

    #[test]
    fn test_set_and_name_id() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::default());
        app.set("svc1", "Title", "Desc", true, "k");
        assert_eq!(app.name_id(), "svc1");
        assert_eq!(app.identity().title, "Title");
        assert_eq!(app.identity().description, "Desc");
        assert!(app.is_loop());
        assert_eq!(app.debug_key(), "k");
    }

    #[tokio::test]
    async fn test_stop_without_presence_only_runs_hook() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::default());
        app.on_stopping(|_| Err("ignored".into()));
        app.stop().await.unwrap();
        assert!(app.presence().is_empty());
    }

    #[tokio::test]
    async fn test_declared_section_without_manager() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::new("[redis]\n"));
        let err = app.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Startup);
        assert_eq!(err.subsystem(), Some(SubsystemKind::Cache));
        assert!(!app.presence().cache());
    }

    #[test]
    fn test_dispatch_by_token() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::default());
        app.define_command("greet", "hello", |_, _, values| {
            if values == ["world".to_string()] {
                Ok(())
            } else {
                Err("unexpected values".into())
            }
        })
        .unwrap();

        assert!(!app.dispatch(&[]).unwrap());
        assert!(app.dispatch(&["hello".to_string(), "world".to_string()]).unwrap());

        let err = app.dispatch(&["nope".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "no command or option is bound to `nope`");
    }

    #[tokio::test]
    async fn test_configuration_error_sets_no_flags() {
        let mut app = Orchestrator::new(InMemoryConfigurationStore::new("[redis"));
        let err = app.run().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
        assert!(app.presence().is_empty());
    }
}
