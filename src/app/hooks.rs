//! Lifecycle hooks.
//!
//! # Hook points
//! ```text
//! run:     on_define → on_define_configuration → on_define_api
//! start:   ... storage connected → on_start_storage_ready → api → tasks
//! execute: start → on_execute → wait (loop mode)
//! stop:    on_stopping → tasks → api → cache → storage
//! ```
//!
//! # Design Decisions
//! - Every hook is optional; an unset hook is skipped
//! - Hooks are synchronous and block the phase that calls them
//! - Hooks see the orchestrator only through `HookContext`, so they cannot
//!   mutate lifecycle state while it is running

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::app::identity::Identity;
use crate::app::presence::Presence;
use crate::lifecycle::{TaskGroup, TaskGroupError, TaskResult};
use crate::BoxError;

/// Boxed hook callback.
pub type HookFn = Box<dyn FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send>;

/// Named extension point in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    Define,
    DefineConfiguration,
    DefineApi,
    Execute,
    StartStorageReady,
    Stopping,
}

impl HookPoint {
    pub const ALL: [HookPoint; 6] = [
        Self::Define,
        Self::DefineConfiguration,
        Self::DefineApi,
        Self::Execute,
        Self::StartStorageReady,
        Self::Stopping,
    ];

    /// Hooks run by `run` before anything starts, in order.
    pub const DEFINE_PHASE: [HookPoint; 3] =
        [Self::Define, Self::DefineConfiguration, Self::DefineApi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Define => "on_define",
            Self::DefineConfiguration => "on_define_configuration",
            Self::DefineApi => "on_define_api",
            Self::Execute => "on_execute",
            Self::StartStorageReady => "on_start_storage_ready",
            Self::Stopping => "on_stopping",
        }
    }

    pub fn is_define_phase(self) -> bool {
        Self::DEFINE_PHASE.contains(&self)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook can see while it runs.
pub struct HookContext<'a> {
    point: HookPoint,
    identity: &'a Identity,
    debug: bool,
    presence: Presence,
    group: Option<&'a TaskGroup>,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        point: HookPoint,
        identity: &'a Identity,
        debug: bool,
        presence: Presence,
        group: Option<&'a TaskGroup>,
    ) -> Self {
        Self {
            point,
            identity,
            debug,
            presence,
            group,
        }
    }

    pub fn point(&self) -> HookPoint {
        self.point
    }

    pub fn identity(&self) -> &Identity {
        self.identity
    }

    pub fn name_id(&self) -> &str {
        &self.identity.name_id
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Subsystems attempted so far in this run.
    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// The running task group. Only available to `on_execute`.
    pub fn task_group(&self) -> Option<&TaskGroup> {
        self.group
    }

    /// Launch a supervised task from `on_execute`.
    pub fn launch<F, Fut>(&self, name: impl Into<String>, task: F) -> Result<(), TaskGroupError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        match self.group {
            Some(group) => group.launch(name, task),
            None => Err(TaskGroupError::Unavailable {
                task: name.into(),
                point: self.point.as_str(),
            }),
        }
    }
}

/// The six optional hook slots.
#[derive(Default)]
pub struct Hooks {
    slots: [Option<HookFn>; 6],
}

impl Hooks {
    pub fn set<F>(&mut self, point: HookPoint, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + Send + 'static,
    {
        self.slots[point.index()] = Some(Box::new(hook));
    }

    pub fn clear(&mut self, point: HookPoint) {
        self.slots[point.index()] = None;
    }

    pub fn is_set(&self, point: HookPoint) -> bool {
        self.slots[point.index()].is_some()
    }

    /// Run the hook at `ctx.point()` if one is set.
    pub(crate) fn invoke(&mut self, ctx: &HookContext<'_>) -> Result<(), BoxError> {
        match self.slots[ctx.point().index()].as_mut() {
            Some(hook) => {
                tracing::debug!(hook = %ctx.point(), "Invoking hook");
                hook(ctx)
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = HookPoint::ALL
            .iter()
            .filter(|point| self.is_set(**point))
            .map(|point| point.as_str())
            .collect();
        f.debug_struct("Hooks").field("set", &set).finish()
    }
}
