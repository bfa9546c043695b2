//! Instance construction.
//!
//! Factories exported by plugins receive an [`Activation`]: the type arguments
//! the type was closed over (empty for non-generic types) and a
//! [`ServiceLocator`] for constructor injection.

use crate::types::ResolvedType;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased service instance.
///
/// A factory produces the concrete object erased as `Arc<T>`; an instance
/// resolved for an interface `I` holds an `Arc<I>`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Errors raised while constructing or resolving instances.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// Nothing is registered for the interface.
    #[error("No service registered for interface '{0}'")]
    NotRegistered(String),

    /// Open generic definitions have no factory to run.
    #[error("Type '{0}' is an open generic definition and cannot be constructed")]
    OpenGeneric(String),

    /// The type does not declare the interface it was activated for.
    #[error("Type '{type_name}' does not implement interface '{interface}'")]
    NotImplemented {
        /// Display name of the type.
        type_name: String,
        /// Requested interface.
        interface: String,
    },

    /// A scoped service was requested outside a scope.
    #[error("Scoped service '{0}' cannot be resolved from the root provider")]
    ScopeViolation(String),

    /// The stored instance is not an `Arc` of the requested trait object.
    #[error("Instance resolved for '{0}' does not have the requested type")]
    Downcast(String),

    /// An interface was requested while it was already being activated.
    /// Holds the chain of interfaces, e.g. `IA -> IB -> IA`.
    #[error("Circular dependency while activating: {0}")]
    Cycle(String),

    /// The type's factory returned an error.
    #[error("Factory for '{type_name}' failed: {source}")]
    Factory {
        /// Display name of the type.
        type_name: String,
        /// Error returned by the factory.
        #[source]
        source: anyhow::Error,
    },
}

/// Resolves registered services by interface name.
///
/// Implemented by the host's service scopes and passed to every factory.
pub trait ServiceLocator: Send + Sync {
    /// Resolves the instance registered for `interface`.
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError>;
}

impl dyn ServiceLocator + '_ {
    /// Resolves `interface` and downcasts it to the trait object `I`.
    pub fn resolve<I>(&self, interface: &str) -> Result<Arc<I>, ActivationError>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        downcast_instance(&self.resolve_instance(interface)?, interface)
    }
}

/// Extracts the `Arc<I>` stored in an interface instance.
pub fn downcast_instance<I>(instance: &Instance, interface: &str) -> Result<Arc<I>, ActivationError>
where
    I: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<I>>()
        .cloned()
        .ok_or_else(|| ActivationError::Downcast(interface.to_string()))
}

/// Context handed to a type's factory.
pub struct Activation<'a> {
    type_arguments: &'a [ResolvedType],
    services: &'a dyn ServiceLocator,
}

impl<'a> Activation<'a> {
    /// Creates an activation context.
    pub fn new(type_arguments: &'a [ResolvedType], services: &'a dyn ServiceLocator) -> Self {
        Self {
            type_arguments,
            services,
        }
    }

    /// Type arguments of a closed generic type, in declaration order.
    pub fn type_arguments(&self) -> &'a [ResolvedType] {
        self.type_arguments
    }

    /// Type argument at `index`.
    pub fn type_argument(&self, index: usize) -> Option<&'a ResolvedType> {
        self.type_arguments.get(index)
    }

    /// Locator for resolving dependencies.
    pub fn services(&self) -> &'a dyn ServiceLocator {
        self.services
    }
}

/// Locator that resolves nothing. Useful for activating types with no
/// dependencies outside a provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoServices;

impl ServiceLocator for NoServices {
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError> {
        Err(ActivationError::NotRegistered(interface.to_string()))
    }
}
