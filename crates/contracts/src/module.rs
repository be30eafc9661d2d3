//! Module descriptors and record handlers
//!
//! A `ModuleDescriptor` is the module table's view of one output module:
//! a name plus optional lifecycle callables. A `RecordHandler` is the
//! record-consuming callable a registration supplies, typed by record kind.

use std::fmt;
use std::sync::Arc;

use crate::{
    AlertBatch, ContractError, RecordKind, RecordRef, SharedContext, StatsSnapshot, ThreadContext,
    WorkerInfo,
};

/// Builds a worker's context from the registration's shared context
pub type ThreadInitFn =
    Arc<dyn Fn(&WorkerInfo, &SharedContext) -> Result<ThreadContext, ContractError> + Send + Sync>;

/// Releases a worker's context
pub type ThreadDeinitFn = Arc<dyn Fn(&WorkerInfo, ThreadContext) + Send + Sync>;

/// Reports a worker's final counters
pub type ExitStatsFn = Arc<dyn Fn(&WorkerInfo, &ThreadContext) + Send + Sync>;

/// Delivers an alert batch to one backend
pub type AlertLogFn = Arc<dyn Fn(&mut ThreadContext, &AlertBatch) + Send + Sync>;

/// Delivers a stats snapshot to one backend
pub type StatsLogFn = Arc<dyn Fn(&mut ThreadContext, &StatsSnapshot) + Send + Sync>;

/// Lifecycle callables of one output module
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    thread_init: Option<ThreadInitFn>,
    thread_deinit: Option<ThreadDeinitFn>,
    exit_stats_print: Option<ExitStatsFn>,
}

impl ModuleDescriptor {
    /// Descriptor with no lifecycle callables
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            thread_init: None,
            thread_deinit: None,
            exit_stats_print: None,
        }
    }

    pub fn with_thread_init<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkerInfo, &SharedContext) -> Result<ThreadContext, ContractError>
            + Send
            + Sync
            + 'static,
    {
        self.thread_init = Some(Arc::new(f));
        self
    }

    pub fn with_thread_deinit<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkerInfo, ThreadContext) + Send + Sync + 'static,
    {
        self.thread_deinit = Some(Arc::new(f));
        self
    }

    pub fn with_exit_stats_print<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkerInfo, &ThreadContext) + Send + Sync + 'static,
    {
        self.exit_stats_print = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_init(&self) -> Option<&ThreadInitFn> {
        self.thread_init.as_ref()
    }

    pub fn thread_deinit(&self) -> Option<&ThreadDeinitFn> {
        self.thread_deinit.as_ref()
    }

    pub fn exit_stats_print(&self) -> Option<&ExitStatsFn> {
        self.exit_stats_print.as_ref()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("thread_init", &self.thread_init.is_some())
            .field("thread_deinit", &self.thread_deinit.is_some())
            .field("exit_stats_print", &self.exit_stats_print.is_some())
            .finish()
    }
}

/// Record-consuming callable, specialized to one record kind at registration
#[derive(Clone)]
pub enum RecordHandler {
    Alert(AlertLogFn),
    Stats(StatsLogFn),
}

impl RecordHandler {
    pub fn alert<F>(f: F) -> Self
    where
        F: Fn(&mut ThreadContext, &AlertBatch) + Send + Sync + 'static,
    {
        Self::Alert(Arc::new(f))
    }

    pub fn stats<F>(f: F) -> Self
    where
        F: Fn(&mut ThreadContext, &StatsSnapshot) + Send + Sync + 'static,
    {
        Self::Stats(Arc::new(f))
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Alert(_) => RecordKind::Alert,
            Self::Stats(_) => RecordKind::Stats,
        }
    }

    /// Invoke the handler if the record is of its kind
    ///
    /// Returns whether the handler was invoked.
    #[inline]
    pub fn deliver(&self, ctx: &mut ThreadContext, record: RecordRef<'_>) -> bool {
        match (self, record) {
            (Self::Alert(f), RecordRef::Alert(batch)) => {
                f(ctx, batch);
                true
            }
            (Self::Stats(f), RecordRef::Stats(snapshot)) => {
                f(ctx, snapshot);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for RecordHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHandler::{}", self.kind())
    }
}
