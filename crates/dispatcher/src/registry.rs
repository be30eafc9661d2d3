//! Logger Registry
//!
//! Registrations are appended to a `RegistryBuilder` during single-threaded
//! startup. `freeze` turns the builder into an immutable `LoggerRegistry`
//! that workers share through an `Arc`; no entry can be added, removed or
//! reordered afterwards.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ModuleDescriptor, RecordHandler, RecordKind, SharedContext};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::metrics::{LoggerMetrics, MetricsSnapshot};
use crate::module_table::{ModuleId, ModuleTable};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// One configured backend instance
pub struct LoggerRegistration {
    label: String,
    name: String,
    module_id: ModuleId,
    module: Arc<ModuleDescriptor>,
    handler: RecordHandler,
    shared: SharedContext,
    metrics: LoggerMetrics,
}

impl LoggerRegistration {
    /// Instance label (the module name unless registered with `register_as`)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Module table key
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// Descriptor resolved at registration
    pub fn module(&self) -> &ModuleDescriptor {
        &self.module
    }

    pub fn handler(&self) -> &RecordHandler {
        &self.handler
    }

    pub fn kind(&self) -> RecordKind {
        self.handler.kind()
    }

    pub fn shared_context(&self) -> &SharedContext {
        &self.shared
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for LoggerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistration")
            .field("label", &self.label)
            .field("name", &self.name)
            .field("module_id", &self.module_id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Startup-time registry under construction
pub struct RegistryBuilder {
    table: Arc<ModuleTable>,
    entries: Vec<LoggerRegistration>,
}

impl RegistryBuilder {
    pub fn new(table: Arc<ModuleTable>) -> Self {
        Self {
            table,
            entries: Vec::new(),
        }
    }

    pub fn module_table(&self) -> &ModuleTable {
        &self.table
    }

    /// Append a registration labelled with its module name
    pub fn register(
        &mut self,
        name: &str,
        handler: RecordHandler,
        shared: SharedContext,
    ) -> Result<(), DispatchError> {
        self.register_as(name, name, handler, shared)
    }

    /// Append a registration under an instance label
    ///
    /// Fails with a configuration error, leaving the builder unchanged,
    /// when `name` has no module table entry. Registrations are never
    /// deduplicated.
    #[instrument(
        name = "registry_register",
        skip(self, handler, shared),
        fields(index = self.entries.len(), kind = %handler.kind())
    )]
    pub fn register_as(
        &mut self,
        label: &str,
        name: &str,
        handler: RecordHandler,
        shared: SharedContext,
    ) -> Result<(), DispatchError> {
        let Some((module_id, module)) = self.table.resolve(name) else {
            warn!(logger = %label, module = %name, "Module not found");
            return Err(DispatchError::resolution(label, name));
        };
        let module = Arc::clone(module);

        observability::record_logger_registered(name);
        debug!(logger = %label, module = %name, %module_id, "Logger registered");

        self.entries.push(LoggerRegistration {
            label: label.to_string(),
            name: name.to_string(),
            module_id,
            module,
            handler,
            shared,
            metrics: LoggerMetrics::new(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finish startup; the returned registry is immutable
    #[instrument(name = "registry_freeze", skip(self), fields(loggers = self.entries.len()))]
    pub fn freeze(self) -> Arc<LoggerRegistry> {
        let registry = LoggerRegistry {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            entries: self.entries,
            closed: AtomicBool::new(false),
        };
        observability::record_registry_frozen(registry.len());
        info!(
            loggers = registry.len(),
            names = ?registry.labels().collect::<Vec<_>>(),
            "Logger registry frozen"
        );
        Arc::new(registry)
    }
}

/// Frozen, insertion-ordered chain of logger registrations
#[derive(Debug)]
pub struct LoggerRegistry {
    id: u64,
    entries: Vec<LoggerRegistration>,
    closed: AtomicBool,
}

impl LoggerRegistry {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Module names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(LoggerRegistration::name)
    }

    /// Instance labels in registration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(LoggerRegistration::label)
    }

    pub fn entries(&self) -> &[LoggerRegistration] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&LoggerRegistration> {
        self.entries.get(index)
    }

    /// Per-logger metrics, in registration order
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.entries
            .iter()
            .map(|e| (e.label.clone(), e.metrics.snapshot()))
            .collect()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Release every shared context, in registration order
    ///
    /// Succeeds only once every worker has dropped its handle. Returns the
    /// number of contexts closed. A refused call leaves the remaining
    /// handles in charge: the last one may retry, and dropping it closes
    /// the contexts all the same.
    #[instrument(name = "registry_shutdown", skip(self))]
    pub fn shutdown(self: Arc<Self>) -> Result<usize, DispatchError> {
        let registry = match Arc::try_unwrap(self) {
            Ok(registry) => registry,
            Err(shared) => {
                let holders = Arc::strong_count(&shared) - 1;
                warn!(holders, "Registry shutdown while still in use");
                return Err(DispatchError::RegistryInUse { holders });
            }
        };

        let count = registry.close_all();
        info!(closed = count, "Logger registry shut down");
        Ok(count)
    }

    /// Close every shared context exactly once across shutdown and drop
    fn close_all(&self) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        for entry in &self.entries {
            let snapshot = entry.metrics.snapshot();
            if snapshot.active_threads > 0 {
                warn!(
                    logger = %entry.label,
                    active = snapshot.active_threads,
                    "Closing logger with worker contexts still alive"
                );
            }
            entry.shared.close();
            debug!(
                logger = %entry.label,
                delivered = snapshot.delivered,
                "Logger closed"
            );
        }
        self.entries.len()
    }
}

impl Drop for LoggerRegistry {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            let closed = self.close_all();
            info!(closed, "Logger registry dropped without shutdown, outputs closed");
        }
    }
}
