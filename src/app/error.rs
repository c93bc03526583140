use std::fmt;

use thiserror::Error;

use crate::app::hooks::HookPoint;
use crate::config::ConfigError;
use crate::lifecycle::TaskFailure;
use crate::subsystem::SubsystemKind;
use crate::BoxError;

/// Coarse classification of a lifecycle failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A define-phase hook failed; nothing was started.
    DefinePhase,
    /// Configuration load, a manager step, or a startup hook failed.
    Startup,
    /// A supervised task failed or panicked.
    TaskFailure,
    /// A teardown step failed; later teardown steps were skipped.
    Shutdown,
}

/// Manager call that failed during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStep {
    Load,
    Connect,
    RegisterTables,
    Start,
}

impl fmt::Display for StartStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StartStep::Load => "configuration load",
            StartStep::Connect => "connect",
            StartStep::RegisterTables => "table registration",
            StartStep::Start => "start",
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{point} hook failed: {source}")]
    Hook {
        point: HookPoint,
        #[source]
        source: BoxError,
    },

    #[error("configuration load failed: {0}")]
    Configuration(#[source] ConfigError),

    #[error("[{section}] section is declared but no {subsystem} manager is registered")]
    MissingManager {
        subsystem: SubsystemKind,
        section: &'static str,
    },

    #[error("{subsystem} {step} failed: {source}")]
    Startup {
        subsystem: SubsystemKind,
        step: StartStep,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Task(#[from] TaskFailure),

    #[error("{subsystem} teardown failed: {source}")]
    Shutdown {
        subsystem: SubsystemKind,
        #[source]
        source: BoxError,
    },
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Hook { point, .. } if point.is_define_phase() => ErrorKind::DefinePhase,
            LifecycleError::Hook {
                point: HookPoint::Stopping,
                ..
            } => ErrorKind::Shutdown,
            LifecycleError::Hook { .. }
            | LifecycleError::Configuration(_)
            | LifecycleError::MissingManager { .. }
            | LifecycleError::Startup { .. } => ErrorKind::Startup,
            LifecycleError::Task(_) => ErrorKind::TaskFailure,
            LifecycleError::Shutdown { .. } => ErrorKind::Shutdown,
        }
    }

    /// Subsystem the failure is attributed to, if any.
    pub fn subsystem(&self) -> Option<SubsystemKind> {
        match self {
            LifecycleError::MissingManager { subsystem, .. }
            | LifecycleError::Startup { subsystem, .. }
            | LifecycleError::Shutdown { subsystem, .. } => Some(*subsystem),
            _ => None,
        }
    }
}
