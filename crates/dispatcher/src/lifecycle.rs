//! Lifecycle Coordinator
//!
//! Builds, reports on and tears down a worker's `DispatchStore`. Every walk
//! pairs registry entry `i` with store entry `i`.

use contracts::{ThreadContext, WorkerInfo};
use tracing::{debug, error, info, instrument};

use crate::error::DispatchError;
use crate::registry::{LoggerRegistration, LoggerRegistry};
use crate::store::DispatchStore;

impl LoggerRegistry {
    /// Build the calling worker's dispatch store
    ///
    /// One entry is appended per registration, in registration order: the
    /// module's thread-init result, or a placeholder for modules without
    /// one. A failing thread-init aborts the whole call after the contexts
    /// already built are handed back to their modules' thread-deinit.
    #[instrument(
        name = "thread_init",
        skip(self, worker),
        fields(worker = %worker, loggers = self.len())
    )]
    pub fn thread_init(&self, worker: WorkerInfo) -> Result<DispatchStore, DispatchError> {
        let mut entries = Vec::with_capacity(self.len());

        for (index, registration) in self.entries().iter().enumerate() {
            let ctx = match registration.module().thread_init() {
                Some(init) => match init(&worker, registration.shared_context()) {
                    Ok(ctx) => ctx,
                    Err(source) => {
                        error!(
                            logger = %registration.label(),
                            index,
                            error = %source,
                            "Thread init failed, rolling back"
                        );
                        self.release(&worker, entries);
                        observability::record_thread_init(&worker.name, false);
                        return Err(DispatchError::ThreadInit {
                            worker: worker.name.clone(),
                            logger: registration.label().to_string(),
                            index,
                            source,
                        });
                    }
                },
                None => ThreadContext::placeholder(),
            };
            registration.metrics().inc_active_threads();
            entries.push(ctx);
        }

        observability::record_thread_init(&worker.name, true);
        debug!(entries = entries.len(), "Dispatch store ready");
        Ok(DispatchStore::new(worker, self.id(), entries))
    }

    /// Tear down a worker's store
    ///
    /// Each module's thread-deinit receives its own context exactly once.
    /// The store is consumed either way; on a pairing violation its
    /// contexts are dropped without running thread-deinit.
    #[instrument(name = "thread_deinit", skip(self, store), fields(worker = %store.worker()))]
    pub fn thread_deinit(&self, store: DispatchStore) -> Result<(), DispatchError> {
        self.check_pairing(&store, "thread_deinit")?;

        let (worker, entries) = store.into_parts();
        self.release(&worker, entries);

        observability::record_thread_deinit(&worker.name);
        debug!("Dispatch store released");
        Ok(())
    }

    /// Print each logger's final counters for this worker
    #[instrument(name = "exit_report", skip(self, store), fields(worker = %store.worker()))]
    pub fn exit_report(&self, store: &DispatchStore) -> Result<(), DispatchError> {
        self.check_pairing(store, "exit_report")?;

        for (registration, ctx) in self.entries().iter().zip(store.entries()) {
            if let Some(print) = registration.module().exit_stats_print() {
                print(store.worker(), ctx);
            }
        }

        info!(loggers = self.len(), "Exit stats reported");
        Ok(())
    }

    /// Lock-step release of `entries` against the leading registrations
    fn release(&self, worker: &WorkerInfo, entries: Vec<ThreadContext>) {
        for (registration, ctx) in self.entries().iter().zip(entries) {
            release_one(registration, worker, ctx);
        }
    }

    /// Verify `store` was built by this registry and pairs 1:1 with it
    pub(crate) fn check_pairing(
        &self,
        store: &DispatchStore,
        operation: &'static str,
    ) -> Result<(), DispatchError> {
        if store.registry_id() != self.id() {
            return Err(DispatchError::invariant(
                operation,
                format!(
                    "store of worker '{}' was built by another registry",
                    store.worker()
                ),
            ));
        }
        if store.len() != self.len() {
            return Err(DispatchError::invariant(
                operation,
                format!(
                    "store of worker '{}' has {} entries, registry has {}",
                    store.worker(),
                    store.len(),
                    self.len()
                ),
            ));
        }
        Ok(())
    }
}

fn release_one(registration: &LoggerRegistration, worker: &WorkerInfo, ctx: ThreadContext) {
    if let Some(deinit) = registration.module().thread_deinit() {
        deinit(worker, ctx);
    }
    registration.metrics().dec_active_threads();
}
