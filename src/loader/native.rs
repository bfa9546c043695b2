//! Dynamic-library module loader.

use super::{check_declaration, LoadedModule, ModuleCache, ModuleLoader};
use crate::error::ModuleLoadError;
use lab_plugin_api::{PluginDeclaration, PLUGIN_ENTRY_SYMBOL};
use libloading::Library;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loads modules from dynamic libraries exporting a
/// [`PluginDeclaration`] (see `lab_plugin_api::export_plugin!`).
///
/// Libraries stay loaded for the lifetime of the loader: the factories of
/// every exported type live in library code. A library whose module identity
/// is already loaded from another file is closed again right away.
#[derive(Debug, Default)]
pub struct NativeModuleLoader {
    cache: ModuleCache,
    libraries: Mutex<Vec<Library>>,
}

impl NativeModuleLoader {
    /// Creates a loader with an empty module cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of libraries kept open.
    pub fn library_count(&self) -> usize {
        self.libraries.lock().len()
    }

    /// Opens the library at `path` and reads its declaration.
    #[allow(unsafe_code)]
    fn open(path: &Path) -> Result<(Library, PluginDeclaration), ModuleLoadError> {
        // SAFETY: loading a library runs its initializers and the declaration
        // symbol is trusted to have the `PluginDeclaration` layout. Both hold
        // for libraries built with `export_plugin!` against the same API
        // crate, which `check_declaration` verifies before the descriptor is
        // used.
        unsafe {
            let library = Library::new(path).map_err(|e| ModuleLoadError::Library {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            let declaration = {
                let symbol = library
                    .get::<*const PluginDeclaration>(PLUGIN_ENTRY_SYMBOL)
                    .map_err(|_| ModuleLoadError::MissingEntryPoint {
                        path: path.to_path_buf(),
                        symbol: entry_symbol_name(),
                    })?;
                symbol.read()
            };

            Ok((library, declaration))
        }
    }
}

impl ModuleLoader for NativeModuleLoader {
    fn load_module(&self, path: &Path) -> Result<Arc<LoadedModule>, ModuleLoadError> {
        if !path.is_file() {
            return Err(ModuleLoadError::NotFound(path.to_path_buf()));
        }
        let canonical: PathBuf = path
            .canonicalize()
            .map_err(|_| ModuleLoadError::NotFound(path.to_path_buf()))?;

        if let Some(module) = self.cache.get(&canonical) {
            return Ok(module);
        }

        tracing::debug!(path = %canonical.display(), "Opening module library");
        let (library, declaration) = Self::open(&canonical)?;

        check_declaration(&canonical, &declaration)?;

        let descriptor = (declaration.register)();
        if let Some(existing) = self.cache.get_by_identity(&descriptor.identity().full_name()) {
            // The descriptor's factories live in `library`; drop them first.
            drop(descriptor);
            drop(library);
            self.cache.alias(canonical, existing.clone());
            return Ok(existing);
        }

        self.libraries.lock().push(library);
        Ok(self.cache.insert(canonical, descriptor))
    }

    fn loaded_modules(&self) -> Vec<Arc<LoadedModule>> {
        self.cache.modules()
    }
}

fn entry_symbol_name() -> String {
    String::from_utf8_lossy(PLUGIN_ENTRY_SYMBOL)
        .trim_end_matches('\0')
        .to_string()
}
