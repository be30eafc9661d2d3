//! Output contexts
//!
//! `SharedContext` is backend-wide state living as long as its registration.
//! `ThreadContext` is the opaque per-worker state a module's thread-init returns.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identity of the worker thread driving a dispatch store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub id: usize,
    pub name: String,
}

impl WorkerInfo {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Backend-wide output state
///
/// Implementors serialize their own interior access (typically a mutex
/// around the output resource); many workers hold it at once.
pub trait OutputContext: AsAny + Send + Sync {
    /// Flush and release the underlying resource
    ///
    /// Called exactly once, by registry shutdown.
    fn close(&self) {}
}

impl OutputContext for () {}

/// Cloneable handle to a registration's output state
#[derive(Clone)]
pub struct SharedContext(Arc<dyn OutputContext>);

impl SharedContext {
    pub fn new<T: OutputContext + 'static>(ctx: T) -> Self {
        Self(Arc::new(ctx))
    }

    /// Context with no backing state
    pub fn none() -> Self {
        Self::new(())
    }

    /// Borrow the concrete context type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let ctx: &dyn OutputContext = &*self.0;
        ctx.as_any().downcast_ref::<T>()
    }

    pub fn close(&self) {
        self.0.close();
    }

    /// Number of live handles to this context
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("handles", &self.handle_count())
            .finish()
    }
}

/// Opaque per-worker state produced by a module's thread-init
///
/// A placeholder (no state) stands in for modules without thread-init.
#[derive(Default)]
pub struct ThreadContext {
    inner: Option<Box<dyn Any + Send>>,
}

impl ThreadContext {
    pub fn new<T: Any + Send>(state: T) -> Self {
        Self {
            inner: Some(Box::new(state)),
        }
    }

    /// Placeholder context carrying no state
    pub fn placeholder() -> Self {
        Self { inner: None }
    }

    pub fn is_placeholder(&self) -> bool {
        self.inner.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_ref()?.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.inner.as_mut()?.downcast_mut::<T>()
    }

    /// Take ownership of the concrete state
    pub fn into_inner<T: Any>(self) -> Option<Box<T>> {
        self.inner?.downcast::<T>().ok()
    }
}

impl fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContext")
            .field("placeholder", &self.is_placeholder())
            .finish()
    }
}
