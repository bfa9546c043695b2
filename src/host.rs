//! Host bootstrap.
//!
//! Wires the configured pieces together and composes the services:
//!
//! ```text
//! HostConfig ──> ModuleLoader ──> DynamicLoader ──> TypeResolver ──┐
//!                                                                  ├─> ServiceComposer
//!                                          InterfaceCatalog ───────┘
//! ```
//!
//! [`Host::compose`] registers every auto-loaded dependency in declaration
//! order, then every configured collection, into a fresh
//! [`ServiceCollection`].

use crate::composer::ServiceComposer;
use crate::config::HostConfig;
use crate::container::{RegistrationSummary, ServiceCollection, ServiceProvider};
use crate::error::HostError;
use crate::interfaces::InterfaceCatalog;
use crate::loader::{ModuleLoader, NativeModuleLoader};
use crate::probing::ProbingContext;
use crate::resolution::{DynamicLoader, Resolution};
use crate::type_resolver::TypeResolver;
use lab_plugin_api::ResolvedType;
use std::path::Path;
use std::sync::Arc;

/// A configured host, ready to compose.
#[derive(Debug)]
pub struct Host {
    config: HostConfig,
    loader: Arc<DynamicLoader>,
    composer: ServiceComposer,
}

impl Host {
    /// Creates a host loading modules from dynamic libraries.
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        Self::with_loader(config, Arc::new(NativeModuleLoader::new()))
    }

    /// Creates a host over a custom module loader, with the built-in
    /// adapter interfaces.
    pub fn with_loader(
        config: HostConfig,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Self, HostError> {
        Self::with_parts(config, loader, InterfaceCatalog::with_builtin_interfaces())
    }

    /// Creates a host over a custom module loader and interface catalog.
    pub fn with_parts(
        config: HostConfig,
        loader: Arc<dyn ModuleLoader>,
        interfaces: InterfaceCatalog,
    ) -> Result<Self, HostError> {
        config.validate().map_err(HostError::Validation)?;

        let loader = Arc::new(DynamicLoader::new(loader));
        let composer = ServiceComposer::new(TypeResolver::new(loader.clone()), interfaces);

        tracing::debug!(
            application = %config.application.name,
            dependencies = config.dependencies.len(),
            collections = config.collections.len(),
            "Host initialized"
        );
        Ok(Self {
            config,
            loader,
            composer,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The service composer.
    pub fn composer(&self) -> &ServiceComposer {
        &self.composer
    }

    /// The dynamic loader shared by every resolution.
    pub fn loader(&self) -> &Arc<DynamicLoader> {
        &self.loader
    }

    /// Registers every auto-loaded dependency, then every collection.
    ///
    /// Stops at the first failure. A collection's element must be among the
    /// auto-loaded dependencies.
    pub fn compose(&self) -> Result<Composition, HostError> {
        let span = tracing::info_span!("compose", application = %self.config.application.name);
        let _enter = span.enter();

        let mut context = self.config.probing_context();
        let mut services = ServiceCollection::new();

        let mut registered = self.composer.register_auto_dependencies(
            self.config.dependencies.iter(),
            &mut context,
            &mut services,
        )?;

        for entry in &self.config.collections {
            let element = self
                .config
                .dependency(&entry.element)
                .ok_or_else(|| HostError::UnknownDependency(entry.element.clone()))?;
            let collection = self
                .config
                .dependency(&entry.collection)
                .ok_or_else(|| HostError::UnknownDependency(entry.collection.clone()))?;

            registered.push(self.composer.register_collection_dependency(
                element,
                collection,
                &mut context,
                &mut services,
            )?);
        }

        tracing::info!(
            services = services.len(),
            modules = self.loader.loaded_modules().len(),
            "Composition complete"
        );
        Ok(Composition {
            services,
            context,
            registered,
        })
    }

    /// Runs the resolution strategies for `identity` as a module reference
    /// would, with `active_directory` as the active directory.
    pub fn probe(&self, identity: &str, active_directory: Option<&Path>) -> Resolution {
        let mut context = self.config.probing_context();
        if let Some(directory) = active_directory {
            context.set_active_directory(directory);
        }
        self.loader.resolve(identity, &context)
    }
}

/// Result of [`Host::compose`].
#[derive(Debug, Clone)]
pub struct Composition {
    services: ServiceCollection,
    context: ProbingContext,
    registered: Vec<ResolvedType>,
}

impl Composition {
    /// The registered bindings.
    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    /// Probing context as composition left it.
    pub fn context(&self) -> &ProbingContext {
        &self.context
    }

    /// Registered implementation types, in registration order.
    pub fn registered(&self) -> &[ResolvedType] {
        &self.registered
    }

    /// Flat view of every binding, in registration order.
    pub fn summaries(&self) -> Vec<RegistrationSummary> {
        self.services
            .registrations()
            .iter()
            .map(|registration| registration.summary())
            .collect()
    }

    /// Builds a provider over the composed services.
    pub fn build_provider(&self) -> ServiceProvider {
        self.services.build_provider()
    }
}
