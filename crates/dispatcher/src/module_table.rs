//! Module Table - name-keyed module descriptors
//!
//! Built once at startup and consulted (never mutated) by the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::ModuleDescriptor;

use crate::backends;
use crate::error::DispatchError;

/// Index of a module in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Name-keyed table of module descriptors
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: Vec<Arc<ModuleDescriptor>>,
    by_name: HashMap<String, ModuleId>,
}

impl ModuleTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in output modules
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for descriptor in backends::builtin_modules() {
            // Built-in names are distinct constants
            let _ = table.register(descriptor);
        }
        table
    }

    /// Add a module
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<ModuleId, DispatchError> {
        if self.by_name.contains_key(descriptor.name()) {
            return Err(DispatchError::DuplicateModule {
                name: descriptor.name().to_string(),
            });
        }

        let id = ModuleId(self.modules.len());
        self.by_name.insert(descriptor.name().to_string(), id);
        self.modules.push(Arc::new(descriptor));
        Ok(id)
    }

    /// Look a module up by name
    pub fn resolve(&self, name: &str) -> Option<(ModuleId, &Arc<ModuleDescriptor>)> {
        let id = *self.by_name.get(name)?;
        self.modules.get(id.0).map(|desc| (id, desc))
    }

    pub fn get(&self, id: ModuleId) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(id.0)
    }

    /// Module names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|desc| desc.name())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter().map(|desc| desc.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
