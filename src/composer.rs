//! Service Composer.
//!
//! Turns [`DependencyDescriptor`]s from configuration into registrations:
//!
//! 1. validate the descriptor (fatal before any module is touched)
//! 2. look the interface up in the [`InterfaceCatalog`]
//! 3. resolve the implementation from the primary location, retrying once
//!    from the backup location when the primary module cannot be loaded
//! 4. register `interface -> implementation` under the declared lifetime
//!
//! Collection dependencies compose two independently configured types: a
//! generic collection implementation is closed over the implementation
//! already registered for its element interface.

use crate::container::{CompositionRoot, Lifetime};
use crate::error::{ComposeError, ComposeResult};
use crate::interfaces::InterfaceCatalog;
use crate::probing::ProbingContext;
use crate::type_resolver::TypeResolver;
use lab_plugin_api::{InterfaceType, ResolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifetime as written in configuration: a name or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LifetimeValue {
    /// Numeric code: 0 singleton, 1 scoped, 2 transient.
    Code(i64),
    /// Name, case-insensitive.
    Name(String),
}

impl LifetimeValue {
    /// Interprets the value.
    pub fn lifetime(&self) -> Result<Lifetime, String> {
        match self {
            Self::Code(code) => Lifetime::from_code(*code)
                .ok_or_else(|| format!("unrecognized lifetime value '{code}'")),
            Self::Name(name) => name.parse(),
        }
    }
}

impl Default for LifetimeValue {
    fn default() -> Self {
        Self::Name(Lifetime::Singleton.as_str().to_string())
    }
}

impl From<Lifetime> for LifetimeValue {
    fn from(lifetime: Lifetime) -> Self {
        Self::Name(lifetime.as_str().to_string())
    }
}

impl fmt::Display for LifetimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Configuration record describing an external implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Name used in diagnostics and by collection entries.
    pub name: String,
    /// Module file tried first.
    #[serde(default)]
    pub primary_location: PathBuf,
    /// Module file tried once when the primary cannot be loaded.
    #[serde(default)]
    pub backup_location: Option<PathBuf>,
    /// Short or fully-qualified name of the implementing type.
    #[serde(default)]
    pub class_name: String,
    /// Interface name, as registered in the interface catalog.
    #[serde(default)]
    pub interface_name: String,
    /// Registered by [`ServiceComposer::register_auto_dependencies`].
    #[serde(default)]
    pub auto_load: bool,
    /// Reuse policy.
    #[serde(default)]
    pub lifetime: LifetimeValue,
}

impl DependencyDescriptor {
    /// Creates a singleton descriptor without backup location.
    pub fn new(
        name: impl Into<String>,
        primary_location: impl Into<PathBuf>,
        class_name: impl Into<String>,
        interface_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_location: primary_location.into(),
            backup_location: None,
            class_name: class_name.into(),
            interface_name: interface_name.into(),
            auto_load: false,
            lifetime: LifetimeValue::default(),
        }
    }

    /// Sets the backup location.
    pub fn with_backup(mut self, backup_location: impl Into<PathBuf>) -> Self {
        self.backup_location = Some(backup_location.into());
        self
    }

    /// Sets the lifetime.
    pub fn with_lifetime(mut self, lifetime: impl Into<LifetimeValue>) -> Self {
        self.lifetime = lifetime.into();
        self
    }

    /// Marks the descriptor for automatic registration.
    pub fn auto_loaded(mut self) -> Self {
        self.auto_load = true;
        self
    }

    /// Backup location, if one is configured and non-empty.
    pub fn backup(&self) -> Option<&Path> {
        self.backup_location
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Checks the required fields and the lifetime.
    pub fn validate(&self) -> ComposeResult<Lifetime> {
        if self.primary_location.as_os_str().is_empty() {
            return Err(ComposeError::configuration(&self.name, "primary location not set"));
        }
        if self.class_name.is_empty() {
            return Err(ComposeError::configuration(&self.name, "class name not set"));
        }
        if self.interface_name.is_empty() {
            return Err(ComposeError::configuration(&self.name, "interface name not set"));
        }
        self.lifetime
            .lifetime()
            .map_err(|reason| ComposeError::configuration(&self.name, reason))
    }
}

/// Registers dynamically resolved implementations into a composition root.
#[derive(Debug, Clone)]
pub struct ServiceComposer {
    resolver: TypeResolver,
    interfaces: InterfaceCatalog,
}

impl ServiceComposer {
    /// Creates a composer.
    pub fn new(resolver: TypeResolver, interfaces: InterfaceCatalog) -> Self {
        Self {
            resolver,
            interfaces,
        }
    }

    /// The type resolver.
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// The interface catalog.
    pub fn interfaces(&self) -> &InterfaceCatalog {
        &self.interfaces
    }

    /// Resolves and registers one dependency. Returns the registered type.
    ///
    /// `context`'s active directory ends at the directory of the location the
    /// type was resolved from (or last attempted).
    pub fn register_dependency<R>(
        &self,
        descriptor: &DependencyDescriptor,
        context: &mut ProbingContext,
        root: &mut R,
    ) -> ComposeResult<ResolvedType>
    where
        R: CompositionRoot + ?Sized,
    {
        let lifetime = descriptor.validate()?;
        let interface = self.interface(&descriptor.interface_name)?;

        let concrete = self.resolve_with_backup(descriptor, &interface, context)?;

        tracing::info!(
            dependency = %descriptor.name,
            implementation = %concrete,
            module = %concrete.module(),
            "Resolved dependency"
        );
        root.register(lifetime, interface, concrete.clone());
        Ok(concrete)
    }

    /// Registers a collection closed over the implementation registered for
    /// the element's interface. Returns the closed collection type.
    ///
    /// The element dependency must be registered first.
    pub fn register_collection_dependency<R>(
        &self,
        element: &DependencyDescriptor,
        collection: &DependencyDescriptor,
        context: &mut ProbingContext,
        root: &mut R,
    ) -> ComposeResult<ResolvedType>
    where
        R: CompositionRoot + ?Sized,
    {
        element.validate()?;
        let lifetime = collection.validate()?;

        let collection_interface = self.interface(&collection.interface_name)?;
        let element_interface = self.interface(&element.interface_name)?;

        let element_type = root
            .resolve_concrete_type(element_interface.name())
            .ok_or_else(|| ComposeError::ElementNotRegistered(element_interface.name().to_string()))?;

        let resolved = self.resolve_with_backup(collection, &collection_interface, context)?;

        let definition = if resolved.is_generic_definition() {
            resolved
        } else {
            resolved
                .generic_definition()
                .ok_or_else(|| ComposeError::NotGeneric(resolved.display_name()))?
        };

        let closed = definition.close_over(std::slice::from_ref(&element_type))?;

        tracing::info!(
            collection = %collection.name,
            element = %element.name,
            implementation = %closed,
            "Composed collection dependency"
        );
        root.register(lifetime, collection_interface, closed.clone());
        Ok(closed)
    }

    /// Registers, in order, every descriptor marked `auto_load`. Stops at the
    /// first failure.
    pub fn register_auto_dependencies<'a, I, R>(
        &self,
        descriptors: I,
        context: &mut ProbingContext,
        root: &mut R,
    ) -> ComposeResult<Vec<ResolvedType>>
    where
        I: IntoIterator<Item = &'a DependencyDescriptor>,
        R: CompositionRoot + ?Sized,
    {
        descriptors
            .into_iter()
            .filter(|descriptor| descriptor.auto_load)
            .map(|descriptor| self.register_dependency(descriptor, context, root))
            .collect()
    }

    fn interface(&self, name: &str) -> ComposeResult<InterfaceType> {
        self.interfaces
            .lookup(name)
            .cloned()
            .ok_or_else(|| ComposeError::InterfaceNotFound(name.to_string()))
    }

    fn resolve_with_backup(
        &self,
        descriptor: &DependencyDescriptor,
        interface: &InterfaceType,
        context: &mut ProbingContext,
    ) -> ComposeResult<ResolvedType> {
        let primary = descriptor.primary_location.as_path();
        context.set_active_directory_from(primary);

        let error = match self.resolve_at(descriptor, primary, interface, context) {
            Ok(resolved) => return Ok(resolved),
            Err(e) if e.is_module_load() => e,
            Err(e) => return Err(e.into()),
        };

        let Some(backup) = descriptor.backup() else {
            return Err(error.into());
        };

        tracing::warn!(
            dependency = %descriptor.name,
            primary = %primary.display(),
            backup = %backup.display(),
            error = %error,
            "Primary location failed; retrying from backup"
        );
        context.set_active_directory_from(backup);
        Ok(self.resolve_at(descriptor, backup, interface, context)?)
    }

    fn resolve_at(
        &self,
        descriptor: &DependencyDescriptor,
        location: &Path,
        interface: &InterfaceType,
        context: &ProbingContext,
    ) -> Result<ResolvedType, crate::error::ResolveError> {
        self.resolver
            .resolve(context, location, &descriptor.class_name, Some(interface), &[])
    }
}
