//! Shared recording managers for orchestrator integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use service_runtime::config::{ConfigError, InMemoryConfigurationStore};
use service_runtime::FileConfigurationStore;
use service_runtime::{
    BoxError, ConfigSection, ConfigurationStore, ConnectionManager, Orchestrator, SchemaRegistry,
    ServiceManager, Subsystems, TaskGroup,
};

/// Ordered log of every manager and hook call.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.count(call) > 0
    }

    /// Calls ending in one of `suffixes`, in order.
    pub fn filtered(&self, suffixes: &[&str]) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| suffixes.iter().any(|s| c.ends_with(s)))
            .collect()
    }
}

/// Configuration store that records each load.
pub struct RecordingConfiguration {
    inner: Box<dyn ConfigurationStore>,
    recorder: Recorder,
}

impl RecordingConfiguration {
    pub fn new(document: &str, recorder: &Recorder) -> Self {
        Self {
            inner: Box::new(InMemoryConfigurationStore::new(document)),
            recorder: recorder.clone(),
        }
    }

    /// Reads `path` on every load, so tests can rewrite it between runs.
    pub fn file(path: &Path, recorder: &Recorder) -> Self {
        Self {
            inner: Box::new(FileConfigurationStore::new(path)),
            recorder: recorder.clone(),
        }
    }
}

impl ConfigurationStore for RecordingConfiguration {
    fn load(&mut self) -> Result<(), ConfigError> {
        self.recorder.record("configuration.load");
        self.inner.load()
    }

    fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.inner.section(name)
    }
}

/// Connection manager recording `<name>.load`, `<name>.connect`, `<name>.disconnect`.
pub struct RecordingConnection {
    name: &'static str,
    recorder: Recorder,
    fail_on: Option<&'static str>,
}

impl RecordingConnection {
    pub fn new(name: &'static str, recorder: &Recorder) -> Self {
        Self {
            name,
            recorder: recorder.clone(),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, step: &'static str) -> Self {
        self.fail_on = Some(step);
        self
    }

    fn step(&self, step: &'static str) -> Result<(), BoxError> {
        self.recorder.record(format!("{}.{}", self.name, step));
        if self.fail_on == Some(step) {
            return Err(format!("{} {} failed", self.name, step).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionManager for RecordingConnection {
    async fn load_from_configuration(&mut self, section: &ConfigSection) -> Result<(), BoxError> {
        assert!(!section.name().is_empty());
        self.step("load")
    }

    async fn connect_all_at_start(&mut self) -> Result<(), BoxError> {
        self.step("connect")
    }

    async fn disconnect_all(&mut self) -> Result<(), BoxError> {
        self.step("disconnect")
    }
}

pub struct RecordingTables {
    recorder: Recorder,
    fail: bool,
}

impl RecordingTables {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl SchemaRegistry for RecordingTables {
    async fn connect_all(&mut self) -> Result<(), BoxError> {
        self.recorder.record("tables.connect");
        if self.fail {
            return Err("table registration failed".into());
        }
        Ok(())
    }
}

/// Service manager recording `<name>.load`, `<name>.start`, `<name>.stop`.
///
/// When `run_loop` is set, `start_all` launches one task that runs until the
/// group is cancelled and then records `<name>.loop_exit`.
pub struct RecordingService {
    name: &'static str,
    recorder: Recorder,
    fail_on: Option<&'static str>,
    run_loop: bool,
}

impl RecordingService {
    pub fn new(name: &'static str, recorder: &Recorder) -> Self {
        Self {
            name,
            recorder: recorder.clone(),
            fail_on: None,
            run_loop: false,
        }
    }

    pub fn failing_on(mut self, step: &'static str) -> Self {
        self.fail_on = Some(step);
        self
    }

    pub fn with_loop(mut self) -> Self {
        self.run_loop = true;
        self
    }

    fn step(&self, step: &'static str) -> Result<(), BoxError> {
        self.recorder.record(format!("{}.{}", self.name, step));
        if self.fail_on == Some(step) {
            return Err(format!("{} {} failed", self.name, step).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for RecordingService {
    async fn load_from_configuration(&mut self, _section: &ConfigSection) -> Result<(), BoxError> {
        self.step("load")
    }

    async fn start_all(&mut self, group: &TaskGroup) -> Result<(), BoxError> {
        self.step("start")?;
        if self.run_loop {
            let recorder = self.recorder.clone();
            let name = self.name;
            group.launch(format!("{name}-loop"), move |token| async move {
                token.cancelled().await;
                recorder.record(format!("{name}.loop_exit"));
                Ok(())
            })?;
        }
        Ok(())
    }

    async fn stop_all(&mut self) -> Result<(), BoxError> {
        self.step("stop")
    }
}

/// Every manager registered, none failing.
pub fn recording_subsystems(recorder: &Recorder) -> Subsystems {
    Subsystems::new()
        .with_cache(RecordingConnection::new("cache", recorder))
        .with_storage(RecordingConnection::new("storage", recorder))
        .with_tables(RecordingTables::new(recorder))
        .with_api(RecordingService::new("api", recorder))
        .with_tasks(RecordingService::new("tasks", recorder))
}

pub fn orchestrator(document: &str, recorder: &Recorder, subsystems: Subsystems, is_loop: bool) -> Orchestrator {
    orchestrator_with(RecordingConfiguration::new(document, recorder), subsystems, is_loop)
}

pub fn orchestrator_with(
    configuration: RecordingConfiguration,
    subsystems: Subsystems,
    is_loop: bool,
) -> Orchestrator {
    let mut app = Orchestrator::new(configuration).with_subsystems(subsystems);
    app.set("svc1", "Test Service", "integration test", is_loop, "test-debug-key");
    app
}

/// Configuration document declaring the given sections as empty tables.
pub fn document(sections: &[&str]) -> String {
    sections.iter().map(|s| format!("[{s}]\n")).collect()
}
