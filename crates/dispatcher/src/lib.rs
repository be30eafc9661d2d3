//! # Dispatcher
//!
//! Output dispatch core.
//!
//! Responsibilities:
//! - Resolve output modules by name (`ModuleTable`)
//! - Hold the ordered, frozen chain of logger registrations (`LoggerRegistry`)
//! - Build and tear down each worker's `DispatchStore`
//! - Fan records out to every logger of their kind, in registration order
//!
//! # Lifecycle
//!
//! ```no_run
//! use std::sync::Arc;
//! use contracts::{OutputConfig, StatsSnapshot, WorkerInfo};
//! use dispatcher::{factory, ModuleTable, RegistryBuilder};
//!
//! # fn main() -> Result<(), dispatcher::DispatchError> {
//! let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
//! factory::register_outputs(&mut builder, &[OutputConfig::new("stats", "stats-table")])?;
//! let registry = builder.freeze();
//!
//! let mut store = registry.thread_init(WorkerInfo::new(0, "W#00"))?;
//! let snapshot = StatsSnapshot::from_totals(chrono::Utc::now(), 1, [("packets", 10)]);
//! registry.dispatch(&mut store, &snapshot)?;
//! registry.exit_report(&store)?;
//! registry.thread_deinit(store)?;
//!
//! registry.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
mod engine;
pub mod error;
pub mod factory;
mod lifecycle;
pub mod metrics;
pub mod module_table;
pub mod registry;
pub mod store;

pub use contracts::{Record, RecordHandler, RecordRef};
pub use error::DispatchError;
pub use factory::register_outputs;
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use module_table::{ModuleId, ModuleTable};
pub use registry::{LoggerRegistration, LoggerRegistry, RegistryBuilder};
pub use store::DispatchStore;
