//! Service orchestrator.
//!
//! # Data Flow
//! ```text
//! run:
//!     on_define → on_define_configuration → on_define_api → execute
//!
//! execute:
//!     root token (child of Shutdown) → TaskGroup
//!     → start → on_execute → wait (loop mode) → stop (loop mode)
//!
//! start (fail-fast):
//!     config load → cache load → storage load
//!     → cache connect → storage connect → tables → on_start_storage_ready
//!     → api start_all(group) → tasks start_all(group)
//!
//! stop (fail-fast):
//!     on_stopping → tasks → api → cache → storage
//! ```
//!
//! # Design Decisions
//! - One explicit `Orchestrator` value per process, owned by `main`
//! - Section presence is resolved once per run into typed flags
//! - A presence flag is set before the first manager call for that
//!   subsystem, so `stop` covers partially started subsystems
//! - Every phase stops at its first error; the error is logged where it is
//!   detected and returned

pub mod error;
pub mod hooks;
pub mod identity;
pub mod orchestrator;
pub mod presence;

pub use error::{ErrorKind, LifecycleError, StartStep};
pub use hooks::{HookContext, HookFn, HookPoint, Hooks};
pub use identity::{Identity, DEBUG_KEY_ENV};
pub use orchestrator::Orchestrator;
pub use presence::{DeclaredSubsystems, Presence};
