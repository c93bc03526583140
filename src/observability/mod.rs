//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator, task group, stores produce:
//!     → logging.rs (structured log events inside the `app` span)
//!     → metrics.rs (phase and task counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
