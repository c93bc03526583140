//! Supervised task group.
//!
//! Couples the fate of independently running tasks: every task receives the
//! group's cancellation token, the first failure cancels that token, and
//! [`TaskGroup::wait`] reports the first failure once every task has returned.
//!
//! ```text
//! launch(a) ─┐
//! launch(b) ─┼─▶ JoinSet ──▶ wait() ──▶ Ok(()) | Err(first failure)
//! launch(c) ─┘      │
//!                   └─ b fails ─▶ token.cancel() ─▶ a, c unwind
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::BoxError;

/// What a supervised task returns.
pub type TaskResult = Result<(), BoxError>;

/// Why a supervised task ended the group.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("task `{task}` failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: BoxError,
    },

    #[error("task `{task}` panicked: {message}")]
    Panicked { task: String, message: String },
}

impl TaskFailure {
    /// Name the task was launched under.
    pub fn task(&self) -> &str {
        match self {
            TaskFailure::Failed { task, .. } | TaskFailure::Panicked { task, .. } => task,
        }
    }
}

#[derive(Debug, Error)]
pub enum TaskGroupError {
    #[error("cannot launch `{task}`: task group is already waiting")]
    Sealed { task: String },

    #[error("cannot launch `{task}` from {point}: no task group is running")]
    Unavailable { task: String, point: &'static str },
}

struct Tasks {
    sealed: bool,
    set: JoinSet<Option<TaskFailure>>,
}

/// Cancellation-aware group of concurrently running tasks.
///
/// Single use: once [`TaskGroup::wait`] has been called no further task can
/// be launched. Dropping a group that was never awaited aborts its tasks.
pub struct TaskGroup {
    token: CancellationToken,
    tasks: Mutex<Tasks>,
}

impl TaskGroup {
    /// Create a group whose token is a child of `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: Mutex::new(Tasks {
                sealed: false,
                set: JoinSet::new(),
            }),
        }
    }

    /// The token every task in this group observes.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the group without a failure. Tasks are expected to return `Ok`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Number of tasks launched and not yet collected by `wait`.
    pub fn len(&self) -> usize {
        self.tasks.lock().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Launch `task` on the runtime with the group's token.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn launch<F, Fut>(&self, name: impl Into<String>, task: F) -> Result<(), TaskGroupError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let name = name.into();
        if self.tasks.lock().sealed {
            return Err(TaskGroupError::Sealed { task: name });
        }

        // Built outside the lock so the closure may call back into the group.
        let future = task(self.token.clone());
        let token = self.token.clone();
        let label = name.clone();

        {
            let mut tasks = self.tasks.lock();
            if tasks.sealed {
                return Err(TaskGroupError::Sealed { task: name });
            }
            tasks.set.spawn(async move {
                let failure = match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(())) => None,
                    Ok(Err(source)) => Some(TaskFailure::Failed {
                        task: label,
                        source,
                    }),
                    Err(payload) => Some(TaskFailure::Panicked {
                        task: label,
                        message: panic_message(payload.as_ref()),
                    }),
                };
                if let Some(failure) = &failure {
                    tracing::warn!(error = %failure, "Supervised task failed; cancelling group");
                    token.cancel();
                }
                failure
            });
        }

        metrics::record_task_launched();
        tracing::debug!(task = %name, "Task launched");
        Ok(())
    }

    /// Wait for every launched task and return the first failure.
    ///
    /// Seals the group: later `launch` calls fail with [`TaskGroupError::Sealed`].
    pub async fn wait(&self) -> Result<(), TaskFailure> {
        let mut set = {
            let mut tasks = self.tasks.lock();
            tasks.sealed = true;
            std::mem::replace(&mut tasks.set, JoinSet::new())
        };

        let mut first: Option<TaskFailure> = None;
        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok(failure) => failure,
                Err(e) => {
                    tracing::warn!(error = %e, "Supervised task aborted");
                    metrics::record_task_outcome("aborted");
                    continue;
                }
            };

            match failure {
                None => metrics::record_task_outcome("completed"),
                Some(failure) => {
                    metrics::record_task_outcome("failed");
                    if first.is_none() {
                        first = Some(failure);
                    } else {
                        tracing::debug!(error = %failure, "Additional task failure after the first");
                    }
                }
            }
        }

        match first {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tasks = self.tasks.lock();
        f.debug_struct("TaskGroup")
            .field("cancelled", &self.token.is_cancelled())
            .field("sealed", &tasks.sealed)
            .field("tasks", &tasks.set.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
