//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Supervision (task_group.rs):
//!     launch tasks → first failure cancels token → wait returns first failure
//!
//! Shutdown (shutdown.rs):
//!     Shutdown::trigger → root token cancelled → running group cancelled
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: tasks poll their token and return
//! - One task group per orchestrator execution, derived from the shutdown root
//! - No intrinsic timeouts; deadlines are applied by triggering `Shutdown`

pub mod shutdown;
pub mod signals;
pub mod task_group;

pub use shutdown::Shutdown;
pub use task_group::{TaskFailure, TaskGroup, TaskGroupError, TaskResult};
