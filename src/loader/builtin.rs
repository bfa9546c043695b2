//! Modules linked into the host binary.
//!
//! Lets a host ship its adapters statically while keeping the same
//! configuration and resolution flow as dynamic plugins: each module is
//! registered under a virtual path, and configuration refers to that path.
//! Every load attempt is recorded, which makes probing observable.
//!
//! Modules are held as [`PluginDeclaration`]s and pass the same API check as
//! dynamic libraries.

use super::{check_declaration, LoadedModule, ModuleCache, ModuleLoader};
use crate::error::ModuleLoadError;
use dashmap::DashMap;
use lab_plugin_api::{ModuleDescriptor, PluginDeclaration};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds the descriptor of a builtin module.
pub type RegisterFn = fn() -> ModuleDescriptor;

/// Loader for modules compiled into the host.
#[derive(Debug, Default)]
pub struct BuiltinModuleLoader {
    registry: DashMap<PathBuf, PluginDeclaration>,
    cache: ModuleCache,
    attempts: DashMap<PathBuf, usize>,
}

impl BuiltinModuleLoader {
    /// Creates a loader with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `register` under the virtual `path`, builder style.
    pub fn with_module(self, path: impl Into<PathBuf>, register: RegisterFn) -> Self {
        self.register(path, register);
        self
    }

    /// Registers `register` under the virtual `path`.
    pub fn register(&self, path: impl Into<PathBuf>, register: RegisterFn) {
        self.register_declaration(path, PluginDeclaration::new(register));
    }

    /// Registers a plugin declaration under the virtual `path`, builder style.
    pub fn with_declaration(self, path: impl Into<PathBuf>, declaration: PluginDeclaration) -> Self {
        self.register_declaration(path, declaration);
        self
    }

    /// Registers a plugin declaration under the virtual `path`.
    pub fn register_declaration(&self, path: impl Into<PathBuf>, declaration: PluginDeclaration) {
        self.registry.insert(path.into(), declaration);
    }

    /// Removes the module registered at `path`. Already loaded instances stay
    /// cached.
    pub fn unregister(&self, path: &Path) -> bool {
        self.registry.remove(path).is_some()
    }

    /// Number of load attempts made for `path`.
    pub fn attempts(&self, path: &Path) -> usize {
        self.attempts.get(path).map(|count| *count).unwrap_or(0)
    }

    /// Number of load attempts across all paths.
    pub fn total_attempts(&self) -> usize {
        self.attempts.iter().map(|entry| *entry.value()).sum()
    }

    /// Paths attempted so far, in no particular order.
    pub fn attempted_paths(&self) -> Vec<PathBuf> {
        self.attempts.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl ModuleLoader for BuiltinModuleLoader {
    fn load_module(&self, path: &Path) -> Result<Arc<LoadedModule>, ModuleLoadError> {
        *self.attempts.entry(path.to_path_buf()).or_insert(0) += 1;

        if let Some(module) = self.cache.get(path) {
            return Ok(module);
        }

        let declaration = self
            .registry
            .get(path)
            .map(|entry| *entry.value())
            .ok_or_else(|| ModuleLoadError::NotFound(path.to_path_buf()))?;
        check_declaration(path, &declaration)?;

        Ok(self.cache.insert(path.to_path_buf(), (declaration.register)()))
    }

    fn loaded_modules(&self) -> Vec<Arc<LoadedModule>> {
        self.cache.modules()
    }
}
