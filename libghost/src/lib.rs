//! # libghost — storage fault injection for RK8s clusters
//!
//! `libghost` picks a random persistent volume, disrupts it, and then
//! recovers or cleans up, so that workloads depending on that storage can be
//! checked for tolerance to storage-layer failure.  One call to
//! [`LifecycleController::run`] performs exactly one injection cycle.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `Volume`, `Claim`, list payloads. |
//! | [`error`] | [`GhostError`] enum covering all failure modes. |
//! | [`inventory`] | [`ClusterClient`] trait — list, delete, detach, attach. |
//! | [`backend`] | `kubectl` subprocess client and an in-memory fake. |
//! | [`selection`] | [`SelectionPolicy`] over a seedable [`RandomSource`]. |
//! | [`lifecycle`] | [`LifecycleController`] state machine and outcomes. |
//! | [`logging`] | [`LogSink`], the scoped file log. |

pub mod backend;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod logging;
pub mod selection;
pub mod types;

pub use backend::kubectl::KubectlClient;
pub use backend::memory::MemoryCluster;
pub use error::GhostError;
pub use inventory::ClusterClient;
pub use lifecycle::{
    InjectionOutcome, InjectionPath, LifecycleController, Progress, Step, TerminalState,
};
pub use logging::{LogFormat, LogSink};
pub use selection::{RandomSource, ScriptedSource, SeededSource, SelectionPolicy};
pub use types::*;
