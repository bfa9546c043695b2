//! Runtime module loading.
//!
//! A [`ModuleLoader`] turns a path into a [`LoadedModule`]: the module's
//! identity, the references it declares and its exported types. Two loaders
//! ship with the host:
//!
//! - [`NativeModuleLoader`]: opens dynamic libraries with `libloading`
//! - [`BuiltinModuleLoader`]: modules linked into the host binary, registered
//!   under virtual paths
//!
//! Loaders only read modules. Binding a module's references is the job of
//! [`DynamicLoader`](crate::resolution::DynamicLoader), which consults the
//! resolution strategies when the ordinary lookup fails.
//!
//! Both loaders share the [`ModuleCache`] semantics: a module is loaded once
//! per process. A second load of the same path, or of another path carrying
//! the same identity, returns the instance loaded first. Both also refuse a
//! [`PluginDeclaration`] built against another plugin API with a
//! [`ModuleLoadError`], so the composer's backup retry applies to it.

mod builtin;
mod native;

pub use builtin::BuiltinModuleLoader;
pub use native::NativeModuleLoader;

use crate::error::ModuleLoadError;
use dashmap::DashMap;
use lab_plugin_api::{
    Incompatibility, ModuleDescriptor, ModuleIdentity, PluginDeclaration, ResolvedType,
    API_VERSION, CORE_VERSION,
};
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Platform dynamic-library extension (`so`, `dylib` or `dll`), lowercase.
pub const MODULE_EXTENSION: &str = std::env::consts::DLL_EXTENSION;

/// File name of the module with short name `short_name`, e.g. `omega.so`.
pub fn module_file_name(short_name: &str) -> String {
    format!("{}.{}", short_name, MODULE_EXTENSION)
}

/// Refuses a declaration that was not built against the host's plugin API.
pub fn check_declaration(path: &Path, declaration: &PluginDeclaration) -> Result<(), ModuleLoadError> {
    match declaration.check() {
        Ok(()) => Ok(()),
        Err(Incompatibility::Build) => Err(ModuleLoadError::ForeignApiBuild {
            path: path.to_path_buf(),
        }),
        Err(Incompatibility::ApiVersion | Incompatibility::CoreVersion) => {
            Err(ModuleLoadError::IncompatibleApi {
                path: path.to_path_buf(),
                plugin_api: declaration.api_version,
                plugin_core: declaration.core_version.to_string(),
                host_api: API_VERSION,
                host_core: CORE_VERSION.to_string(),
            })
        }
    }
}

/// Loads modules from paths.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module at `path`, or returns the cached instance.
    fn load_module(&self, path: &Path) -> Result<Arc<LoadedModule>, ModuleLoadError>;

    /// Modules loaded so far, in load order.
    fn loaded_modules(&self) -> Vec<Arc<LoadedModule>>;

    /// Loaded module whose full identity equals `full_name` exactly.
    fn find_loaded(&self, full_name: &str) -> Option<Arc<LoadedModule>> {
        self.loaded_modules()
            .into_iter()
            .find(|module| module.identity().full_name() == full_name)
    }
}

/// A module loaded into the process.
pub struct LoadedModule {
    identity: Arc<ModuleIdentity>,
    path: PathBuf,
    references: Vec<String>,
    types: Vec<ResolvedType>,
}

impl LoadedModule {
    /// Builds a loaded module from the descriptor read at `path`.
    pub fn from_descriptor(descriptor: ModuleDescriptor, path: PathBuf) -> Self {
        let (identity, references, definitions) = descriptor.into_parts();
        let identity = Arc::new(identity);
        let types = definitions
            .into_iter()
            .map(|definition| ResolvedType::new(definition, identity.clone()))
            .collect();
        Self {
            identity,
            path,
            references,
            types,
        }
    }

    /// Module identity.
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// Path the module was first loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full identities of the modules this module references.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Exported types in declaration order.
    pub fn types(&self) -> &[ResolvedType] {
        &self.types
    }

    /// First exported type whose short or fully-qualified name equals
    /// `class_name` (exact, case-sensitive).
    pub fn find_type(&self, class_name: &str) -> Option<&ResolvedType> {
        self.types
            .iter()
            .find(|ty| ty.definition().matches_class_name(class_name))
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("identity", &self.identity.full_name())
            .field("path", &self.path)
            .field("references", &self.references)
            .field("types", &self.types.len())
            .finish()
    }
}

/// Process-wide cache of loaded modules, keyed by path and by identity.
#[derive(Default)]
pub struct ModuleCache {
    by_path: DashMap<PathBuf, Arc<LoadedModule>>,
    by_identity: DashMap<String, Arc<LoadedModule>>,
    order: RwLock<Vec<Arc<LoadedModule>>>,
}

impl ModuleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Module previously loaded from `path`.
    pub fn get(&self, path: &Path) -> Option<Arc<LoadedModule>> {
        self.by_path.get(path).map(|entry| entry.value().clone())
    }

    /// Module with full identity `full_name`.
    pub fn get_by_identity(&self, full_name: &str) -> Option<Arc<LoadedModule>> {
        self.by_identity
            .get(full_name)
            .map(|entry| entry.value().clone())
    }

    /// Records a module read from `path`.
    ///
    /// If a module with the same identity is already loaded, `path` becomes
    /// an alias of it and the existing instance is returned.
    pub fn insert(&self, path: PathBuf, descriptor: ModuleDescriptor) -> Arc<LoadedModule> {
        let full_name = descriptor.identity().full_name();
        let mut created = false;
        let module = self
            .by_identity
            .entry(full_name.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(LoadedModule::from_descriptor(descriptor, path.clone()))
            })
            .value()
            .clone();

        if created {
            self.order.write().push(module.clone());
            tracing::info!(module = %full_name, path = %path.display(), "Loaded module");
        } else {
            tracing::debug!(
                module = %full_name,
                path = %path.display(),
                first_path = %module.path().display(),
                "Module already loaded; reusing instance"
            );
        }
        self.by_path.insert(path, module.clone());
        module
    }

    /// Records `path` as another location of an already loaded module.
    pub fn alias(&self, path: PathBuf, module: Arc<LoadedModule>) {
        tracing::debug!(
            module = %module.identity().full_name(),
            path = %path.display(),
            first_path = %module.path().display(),
            "Module already loaded; reusing instance"
        );
        self.by_path.insert(path, module);
    }

    /// Loaded modules in load order.
    pub fn modules(&self) -> Vec<Arc<LoadedModule>> {
        self.order.read().clone()
    }

    /// Number of distinct modules.
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCache")
            .field("modules", &self.len())
            .field("paths", &self.by_path.len())
            .finish()
    }
}
