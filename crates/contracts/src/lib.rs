//! # Contracts
//!
//! Frozen interface contracts shared by every output crate.
//! All business crates depend on this crate, never the reverse.
//!
//! ## Record Model
//! - `AlertBatch`: the alerts raised for one analyzed packet
//! - `StatsSnapshot`: a table of named counters captured at one instant
//!
//! ## Module Model
//! - `ModuleDescriptor`: a named bundle of optional lifecycle callables
//! - `SharedContext` / `ThreadContext`: backend-wide and per-worker state

mod blueprint;
mod context;
mod error;
mod module;
mod record;

pub use blueprint::*;
pub use bytes::Bytes;
pub use context::{OutputContext, SharedContext, ThreadContext, WorkerInfo};
pub use error::*;
pub use module::*;
pub use record::*;
