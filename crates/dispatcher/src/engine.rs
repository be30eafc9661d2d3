//! Dispatch Engine - per-record fan-out
//!
//! Runs on the packet path: no spans, no allocation.

use contracts::RecordRef;

use crate::error::DispatchError;
use crate::registry::LoggerRegistry;
use crate::store::DispatchStore;

impl LoggerRegistry {
    /// Deliver `record` to every logger of its kind, in registration order
    ///
    /// Each handler receives the worker's own context for that logger.
    /// Returns the number of handlers invoked; an empty registry is a no-op.
    pub fn dispatch<'a>(
        &self,
        store: &mut DispatchStore,
        record: impl Into<RecordRef<'a>>,
    ) -> Result<usize, DispatchError> {
        if self.is_empty() {
            return Ok(0);
        }
        self.check_pairing(store, "dispatch")?;

        let record = record.into();
        let mut invoked = 0;
        for (registration, ctx) in self.entries().iter().zip(store.entries_mut()) {
            if registration.handler().deliver(ctx, record) {
                registration.metrics().inc_delivered();
                invoked += 1;
            } else {
                registration.metrics().inc_skipped();
            }
        }
        Ok(invoked)
    }
}
