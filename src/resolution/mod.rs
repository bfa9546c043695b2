//! Dynamic module resolution.
//!
//! When a loaded module declares a reference that its ordinary lookup cannot
//! satisfy, the [`DynamicLoader`] runs an ordered list of
//! [`ResolutionStrategy`]s, stopping at the first one that gives an answer.
//! The default list (see [`strategies::default_strategies`]):
//!
//! 1. skip satellite resource modules
//! 2. reuse an already loaded module with the exact identity
//! 3. try each fallback directory in order
//! 4. try the active directory
//!
//! A miss is not an error: [`DynamicLoader::resolve`] returns
//! [`Resolution::Unresolved`] and the caller decides what a miss means.
//!
//! ```text
//! load(path) ──> ModuleLoader::load_module(path)
//!                 └─ for each reference:
//!                      sibling file in the module's directory
//!                      └─ on failure: strategies, in order
//! ```

pub mod strategies;

pub use strategies::{
    default_strategies, ActiveDirectory, AlreadyLoaded, FallbackDirectories,
    SkipSatelliteResources,
};

use crate::error::ModuleLoadError;
use crate::loader::{module_file_name, LoadedModule, ModuleLoader};
use crate::probing::ProbingContext;
use lab_plugin_api::ModuleIdentity;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a resolution strategy.
#[derive(Clone)]
pub enum Resolution {
    /// The reference is bound to this module.
    Resolved(Arc<LoadedModule>),
    /// Stop searching; the reference stays unbound.
    Unresolved,
    /// No answer from this strategy; try the next one.
    Continue,
}

impl Resolution {
    /// The resolved module, if any.
    pub fn module(&self) -> Option<&Arc<LoadedModule>> {
        match self {
            Self::Resolved(module) => Some(module),
            Self::Unresolved | Self::Continue => None,
        }
    }

    /// Whether the search ended without a module.
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, Self::Resolved(_))
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(module) => f
                .debug_tuple("Resolved")
                .field(&module.identity().full_name())
                .finish(),
            Self::Unresolved => f.write_str("Unresolved"),
            Self::Continue => f.write_str("Continue"),
        }
    }
}

/// A reference that could not be bound by ordinary lookup.
pub struct Probe<'a> {
    requested: &'a str,
    context: &'a ProbingContext,
    loader: &'a dyn ModuleLoader,
}

impl<'a> Probe<'a> {
    /// Creates a probe for the module identity `requested`.
    pub fn new(requested: &'a str, context: &'a ProbingContext, loader: &'a dyn ModuleLoader) -> Self {
        Self {
            requested,
            context,
            loader,
        }
    }

    /// Requested module identity, as declared by the referencing module.
    pub fn requested(&self) -> &'a str {
        self.requested
    }

    /// Short name: the requested identity up to its first comma.
    pub fn short_name(&self) -> &'a str {
        ModuleIdentity::short_name_of(self.requested)
    }

    /// File name searched for in each probing directory.
    pub fn candidate_file(&self) -> String {
        module_file_name(self.short_name())
    }

    /// Probing context of the current composition pass.
    pub fn context(&self) -> &'a ProbingContext {
        self.context
    }

    /// Loader used for candidate files.
    pub fn loader(&self) -> &'a dyn ModuleLoader {
        self.loader
    }

    /// Attempts to load the candidate file from `directory`. Failures are
    /// logged at debug and reported as `None`.
    pub fn try_directory(&self, directory: &Path) -> Option<Arc<LoadedModule>> {
        let path = directory.join(self.candidate_file());
        match self.loader.load_module(&path) {
            Ok(module) => Some(module),
            Err(e) => {
                tracing::debug!(
                    requested = self.requested,
                    path = %path.display(),
                    error = %e,
                    "Probe failed"
                );
                None
            }
        }
    }
}

/// One step of the resolution search.
pub trait ResolutionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Attempts to resolve the probe.
    fn probe(&self, probe: &Probe<'_>) -> Resolution;
}

impl fmt::Debug for dyn ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loads modules and binds their references.
///
/// Owns the module loader and the ordered strategy list consulted for
/// references that ordinary lookup cannot satisfy.
pub struct DynamicLoader {
    loader: Arc<dyn ModuleLoader>,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl DynamicLoader {
    /// Creates a loader using [`default_strategies`].
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_strategies(loader, default_strategies())
    }

    /// Creates a loader with an explicit strategy list.
    pub fn with_strategies(
        loader: Arc<dyn ModuleLoader>,
        strategies: Vec<Box<dyn ResolutionStrategy>>,
    ) -> Self {
        Self { loader, strategies }
    }

    /// The underlying module loader.
    pub fn module_loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.loader
    }

    /// Strategies in search order.
    pub fn strategies(&self) -> &[Box<dyn ResolutionStrategy>] {
        &self.strategies
    }

    /// Replaces the strategy list.
    pub fn set_strategies(&mut self, strategies: Vec<Box<dyn ResolutionStrategy>>) {
        self.strategies = strategies;
    }

    /// Runs the strategies for `requested`, short-circuiting on the first
    /// answer. Returns [`Resolution::Unresolved`] when every strategy passes.
    pub fn resolve(&self, requested: &str, context: &ProbingContext) -> Resolution {
        let probe = Probe::new(requested, context, self.loader.as_ref());
        for strategy in &self.strategies {
            match strategy.probe(&probe) {
                Resolution::Continue => continue,
                outcome => {
                    tracing::debug!(
                        requested,
                        strategy = strategy.name(),
                        outcome = ?outcome,
                        "Resolution strategy answered"
                    );
                    return outcome;
                }
            }
        }
        tracing::debug!(requested, "No resolution strategy could resolve module");
        Resolution::Unresolved
    }

    /// Loads the module at `path` and binds its references, recursively.
    pub fn load(
        &self,
        path: &Path,
        context: &ProbingContext,
    ) -> Result<Arc<LoadedModule>, ModuleLoadError> {
        let module = self.loader.load_module(path)?;
        let mut bound = HashSet::new();
        self.bind_references(&module, context, &mut bound)?;
        Ok(module)
    }

    /// Modules loaded so far.
    pub fn loaded_modules(&self) -> Vec<Arc<LoadedModule>> {
        self.loader.loaded_modules()
    }

    fn bind_references(
        &self,
        module: &Arc<LoadedModule>,
        context: &ProbingContext,
        bound: &mut HashSet<String>,
    ) -> Result<(), ModuleLoadError> {
        if !bound.insert(module.identity().full_name()) {
            return Ok(());
        }

        for reference in module.references() {
            if bound.contains(reference) {
                continue;
            }
            let Some(dependency) = self.bind_reference(module, reference, context)? else {
                continue;
            };
            self.bind_references(&dependency, context, bound)?;
        }
        Ok(())
    }

    /// Binds one reference. `Ok(None)` means an unresolved satellite
    /// resource, which is optional.
    fn bind_reference(
        &self,
        module: &LoadedModule,
        reference: &str,
        context: &ProbingContext,
    ) -> Result<Option<Arc<LoadedModule>>, ModuleLoadError> {
        let satellite = ModuleIdentity::is_satellite_resource(reference);

        if !satellite {
            if let Some(sibling) = self.ordinary_lookup(module, reference) {
                return Ok(Some(sibling));
            }
        }

        match self.resolve(reference, context) {
            Resolution::Resolved(dependency) => Ok(Some(dependency)),
            Resolution::Unresolved | Resolution::Continue if satellite => {
                tracing::debug!(module = %module.identity(), reference, "Skipping satellite resource");
                Ok(None)
            }
            Resolution::Unresolved | Resolution::Continue => {
                Err(ModuleLoadError::UnresolvedReference {
                    module: module.identity().full_name(),
                    reference: reference.to_string(),
                })
            }
        }
    }

    /// Sibling file in the referencing module's directory.
    fn ordinary_lookup(&self, module: &LoadedModule, reference: &str) -> Option<Arc<LoadedModule>> {
        let directory = module.path().parent()?;
        let path = directory.join(module_file_name(ModuleIdentity::short_name_of(reference)));
        match self.loader.load_module(&path) {
            Ok(dependency) => Some(dependency),
            Err(e) => {
                tracing::debug!(
                    module = %module.identity(),
                    reference,
                    error = %e,
                    "Ordinary lookup failed; consulting resolution strategies"
                );
                None
            }
        }
    }
}

impl fmt::Debug for DynamicLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLoader")
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}
