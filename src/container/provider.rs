//! Service provider and scopes.

use super::{Lifetime, Registration};
use dashmap::DashMap;
use lab_plugin_api::{downcast_instance, ActivationError, Instance, ServiceLocator};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct ProviderInner {
    registrations: HashMap<String, Registration>,
    singletons: DashMap<String, Instance>,
}

impl ProviderInner {
    fn registration(&self, interface: &str) -> Result<&Registration, ActivationError> {
        self.registrations
            .get(interface)
            .ok_or_else(|| ActivationError::NotRegistered(interface.to_string()))
    }

    fn singleton(
        &self,
        registration: &Registration,
        chain: &[String],
    ) -> Result<Instance, ActivationError> {
        let key = registration.interface().name();
        if let Some(instance) = self.singletons.get(key) {
            return Ok(instance.value().clone());
        }
        // Activate outside the map lock; factories may resolve other singletons.
        let instance = Site::Root(self).activate(registration, chain)?;
        Ok(self
            .singletons
            .entry(key.to_string())
            .or_insert(instance)
            .value()
            .clone())
    }
}

/// Root resolution: singletons and transients only.
impl ServiceLocator for ProviderInner {
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError> {
        Site::Root(self).resolve(interface, &[])
    }
}

/// Where a service is resolved: the root provider or a scope.
#[derive(Clone, Copy)]
enum Site<'a> {
    Root(&'a ProviderInner),
    Scope(&'a ServiceScope),
}

impl<'a> Site<'a> {
    fn inner(self) -> &'a ProviderInner {
        match self {
            Site::Root(inner) => inner,
            Site::Scope(scope) => &scope.inner,
        }
    }

    /// `chain` holds the interfaces whose factories are running, outermost first.
    fn resolve(self, interface: &str, chain: &[String]) -> Result<Instance, ActivationError> {
        if chain.iter().any(|active| active == interface) {
            let mut cycle = chain.to_vec();
            cycle.push(interface.to_string());
            return Err(ActivationError::Cycle(cycle.join(" -> ")));
        }

        let inner = self.inner();
        let registration = inner.registration(interface)?;
        match (registration.lifetime(), self) {
            (Lifetime::Singleton, _) => inner.singleton(registration, chain),
            (Lifetime::Transient, site) => site.activate(registration, chain),
            (Lifetime::Scoped, Site::Scope(scope)) => scope.scoped_instance(registration, chain),
            (Lifetime::Scoped, Site::Root(_)) => {
                Err(ActivationError::ScopeViolation(interface.to_string()))
            }
        }
    }

    fn activate(
        self,
        registration: &Registration,
        chain: &[String],
    ) -> Result<Instance, ActivationError> {
        tracing::debug!(
            interface = %registration.interface(),
            implementation = %registration.implementation(),
            "Activating service"
        );
        let mut chain = chain.to_vec();
        chain.push(registration.interface().name().to_string());
        let locator = Resolving { site: self, chain };
        registration
            .implementation()
            .activate_as(registration.interface(), &locator)
    }
}

/// Locator handed to factories. Resolves from the factory's site and
/// remembers which activations are in flight.
struct Resolving<'a> {
    site: Site<'a>,
    chain: Vec<String>,
}

impl ServiceLocator for Resolving<'_> {
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError> {
        self.site.resolve(interface, &self.chain)
    }
}

/// Constructs registered services.
///
/// Cloning is cheap; clones share the singleton cache.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Builds a provider. For repeated interfaces the last registration wins.
    pub fn new(registrations: impl IntoIterator<Item = Registration>) -> Self {
        let registrations = registrations
            .into_iter()
            .map(|registration| (registration.interface().name().to_string(), registration))
            .collect();
        Self {
            inner: Arc::new(ProviderInner {
                registrations,
                singletons: DashMap::new(),
            }),
        }
    }

    /// Creates a scope with its own scoped-instance cache.
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope {
            inner: self.inner.clone(),
            scoped: DashMap::new(),
        }
    }

    /// Effective registration for `interface`.
    pub fn registration(&self, interface: &str) -> Option<&Registration> {
        self.inner.registrations.get(interface)
    }

    /// Registered interface names, sorted.
    pub fn interfaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.registrations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves `interface` from the root and downcasts to the trait object `I`.
    ///
    /// Scoped services fail with [`ActivationError::ScopeViolation`].
    pub fn resolve<I>(&self, interface: &str) -> Result<Arc<I>, ActivationError>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        downcast_instance(&self.resolve_instance(interface)?, interface)
    }
}

impl ServiceLocator for ServiceProvider {
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError> {
        self.inner.resolve_instance(interface)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("interfaces", &self.interfaces())
            .field("singletons", &self.inner.singletons.len())
            .finish()
    }
}

/// A unit of work with its own scoped instances.
pub struct ServiceScope {
    inner: Arc<ProviderInner>,
    scoped: DashMap<String, Instance>,
}

impl ServiceScope {
    /// Resolves `interface` within this scope and downcasts to `I`.
    pub fn resolve<I>(&self, interface: &str) -> Result<Arc<I>, ActivationError>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        downcast_instance(&self.resolve_instance(interface)?, interface)
    }

    fn scoped_instance(
        &self,
        registration: &Registration,
        chain: &[String],
    ) -> Result<Instance, ActivationError> {
        let key = registration.interface().name();
        if let Some(instance) = self.scoped.get(key) {
            return Ok(instance.value().clone());
        }
        let instance = Site::Scope(self).activate(registration, chain)?;
        Ok(self
            .scoped
            .entry(key.to_string())
            .or_insert(instance)
            .value()
            .clone())
    }
}

impl ServiceLocator for ServiceScope {
    fn resolve_instance(&self, interface: &str) -> Result<Instance, ActivationError> {
        Site::Scope(self).resolve(interface, &[])
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope")
            .field("scoped", &self.scoped.len())
            .finish_non_exhaustive()
    }
}
