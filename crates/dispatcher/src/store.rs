//! Per-thread Dispatch Store

use contracts::{ThreadContext, WorkerInfo};

/// A worker's thread contexts, paired by index with the registry entries
///
/// Owned by exactly one worker. Built by `LoggerRegistry::thread_init` and
/// consumed by `LoggerRegistry::thread_deinit`.
#[derive(Debug)]
pub struct DispatchStore {
    worker: WorkerInfo,
    registry_id: u64,
    entries: Vec<ThreadContext>,
}

impl DispatchStore {
    pub(crate) fn new(worker: WorkerInfo, registry_id: u64, entries: Vec<ThreadContext>) -> Self {
        Self {
            worker,
            registry_id,
            entries,
        }
    }

    pub fn worker(&self) -> &WorkerInfo {
        &self.worker
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Thread context paired with registry entry `index`
    pub fn context(&self, index: usize) -> Option<&ThreadContext> {
        self.entries.get(index)
    }

    pub(crate) fn registry_id(&self) -> u64 {
        self.registry_id
    }

    pub(crate) fn entries(&self) -> &[ThreadContext] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ThreadContext] {
        &mut self.entries
    }

    pub(crate) fn into_parts(self) -> (WorkerInfo, Vec<ThreadContext>) {
        (self.worker, self.entries)
    }
}
