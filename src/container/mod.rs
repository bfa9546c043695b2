//! Composition root.
//!
//! The composer records `interface -> implementation` bindings in a
//! [`ServiceCollection`] under a [`Lifetime`]. Once composition is complete
//! the collection is turned into a [`ServiceProvider`] which constructs
//! instances on demand:
//!
//! - **Singleton**: one instance per provider, shared by every scope
//! - **Scoped**: one instance per [`ServiceScope`]; not resolvable from the root provider
//! - **Transient**: a new instance per resolution
//!
//! ```rust,ignore
//! let mut services = ServiceCollection::new();
//! services.register_singleton(sensor_interface, temperature_adapter);
//!
//! let provider = services.build_provider();
//! let sensor = provider.resolve::<dyn SensorAdapter>("ISensorAdapter")?;
//! ```

mod provider;

pub use provider::{ServiceProvider, ServiceScope};

use lab_plugin_api::{InterfaceType, ResolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reuse policy of a registered implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance per process.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// One instance per resolution.
    Transient,
}

impl Lifetime {
    /// Lifetime for a numeric configuration code: 0 singleton, 1 scoped, 2 transient.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Singleton),
            1 => Some(Self::Scoped),
            2 => Some(Self::Transient),
            _ => None,
        }
    }

    /// Numeric configuration code.
    pub fn code(self) -> u8 {
        match self {
            Self::Singleton => 0,
            Self::Scoped => 1,
            Self::Transient => 2,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        }
    }
}

impl FromStr for Lifetime {
    type Err = String;

    /// Accepts a name (case-insensitive) or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "scoped" => Ok(Self::Scoped),
            "transient" => Ok(Self::Transient),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| format!("unrecognized lifetime value '{value}'")),
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An `interface -> implementation` binding.
#[derive(Debug, Clone)]
pub struct Registration {
    interface: InterfaceType,
    implementation: ResolvedType,
    lifetime: Lifetime,
}

impl Registration {
    /// Creates a binding.
    pub fn new(interface: InterfaceType, implementation: ResolvedType, lifetime: Lifetime) -> Self {
        Self {
            interface,
            implementation,
            lifetime,
        }
    }

    /// Interface the implementation is resolved through.
    pub fn interface(&self) -> &InterfaceType {
        &self.interface
    }

    /// Concrete implementation type.
    pub fn implementation(&self) -> &ResolvedType {
        &self.implementation
    }

    /// Reuse policy.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Serializable view for reports.
    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            interface: self.interface.name().to_string(),
            implementation: self.implementation.display_name(),
            module: self.implementation.module().full_name(),
            lifetime: self.lifetime,
        }
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({}, {})",
            self.interface,
            self.implementation,
            self.lifetime,
            self.implementation.module()
        )
    }
}

/// Flat description of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    /// Interface name.
    pub interface: String,
    /// Implementation display name, including type arguments.
    pub implementation: String,
    /// Full identity of the implementing module.
    pub module: String,
    /// Reuse policy.
    pub lifetime: Lifetime,
}

/// Where interface bindings are registered and looked up.
pub trait CompositionRoot {
    /// Registers a binding with a new instance per resolution.
    fn register_transient(&mut self, interface: InterfaceType, concrete: ResolvedType);

    /// Registers a binding with one instance per scope.
    fn register_scoped(&mut self, interface: InterfaceType, concrete: ResolvedType);

    /// Registers a binding with one instance per process.
    fn register_singleton(&mut self, interface: InterfaceType, concrete: ResolvedType);

    /// Concrete type currently bound to `interface`.
    fn resolve_concrete_type(&self, interface: &str) -> Option<ResolvedType>;

    /// Registers a binding under `lifetime`.
    fn register(&mut self, lifetime: Lifetime, interface: InterfaceType, concrete: ResolvedType) {
        match lifetime {
            Lifetime::Singleton => self.register_singleton(interface, concrete),
            Lifetime::Scoped => self.register_scoped(interface, concrete),
            Lifetime::Transient => self.register_transient(interface, concrete),
        }
    }
}

/// Ordered list of bindings. The last binding for an interface wins.
#[derive(Debug, Clone, Default)]
pub struct ServiceCollection {
    registrations: Vec<Registration>,
}

impl ServiceCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// All bindings in registration order, including replaced ones.
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Effective binding for `interface`.
    pub fn registration(&self, interface: &str) -> Option<&Registration> {
        self.registrations
            .iter()
            .rev()
            .find(|registration| registration.interface.name() == interface)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Builds a provider over the effective bindings.
    pub fn build_provider(&self) -> ServiceProvider {
        ServiceProvider::new(self.registrations.iter().cloned())
    }

    fn add(&mut self, registration: Registration) {
        tracing::info!(
            interface = %registration.interface,
            implementation = %registration.implementation,
            lifetime = %registration.lifetime,
            "Registered service"
        );
        self.registrations.push(registration);
    }
}

impl CompositionRoot for ServiceCollection {
    fn register_transient(&mut self, interface: InterfaceType, concrete: ResolvedType) {
        self.add(Registration::new(interface, concrete, Lifetime::Transient));
    }

    fn register_scoped(&mut self, interface: InterfaceType, concrete: ResolvedType) {
        self.add(Registration::new(interface, concrete, Lifetime::Scoped));
    }

    fn register_singleton(&mut self, interface: InterfaceType, concrete: ResolvedType) {
        self.add(Registration::new(interface, concrete, Lifetime::Singleton));
    }

    fn resolve_concrete_type(&self, interface: &str) -> Option<ResolvedType> {
        self.registration(interface)
            .map(|registration| registration.implementation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_plugin_api::{ModuleIdentity, TypeDefinition};
    use std::sync::Arc;

    trait Marker: Send + Sync {}
    struct A;
    struct B;
    impl Marker for A {}
    impl Marker for B {}

    fn ty(definition: TypeDefinition) -> ResolvedType {
        ResolvedType::new(Arc::new(definition), Arc::new(ModuleIdentity::new("m", "1")))
    }

    fn marker() -> InterfaceType {
        InterfaceType::of::<dyn Marker>("IMarker")
    }

    #[test]
    fn lifetime_parses_names_and_codes() {
        assert_eq!("Singleton".parse::<Lifetime>(), Ok(Lifetime::Singleton));
        assert_eq!("SCOPED".parse::<Lifetime>(), Ok(Lifetime::Scoped));
        assert_eq!(" transient ".parse::<Lifetime>(), Ok(Lifetime::Transient));
        assert_eq!("0".parse::<Lifetime>(), Ok(Lifetime::Singleton));
        assert_eq!("2".parse::<Lifetime>(), Ok(Lifetime::Transient));
        assert!("3".parse::<Lifetime>().is_err());
        assert!("forever".parse::<Lifetime>().is_err());
        assert_eq!(Lifetime::from_code(1), Some(Lifetime::Scoped));
        assert_eq!(Lifetime::from_code(-1), None);
        assert_eq!(Lifetime::Transient.code(), 2);
    }

    #[test]
    fn last_registration_wins() {
        let a = ty(TypeDefinition::concrete("m", "A", |_| Ok(A))
            .implements::<dyn Marker>("IMarker", |a| a)
            .build());
        let b = ty(TypeDefinition::concrete("m", "B", |_| Ok(B))
            .implements::<dyn Marker>("IMarker", |b| b)
            .build());

        let mut services = ServiceCollection::new();
        services.register(Lifetime::Singleton, marker(), a);
        services.register(Lifetime::Transient, marker(), b.clone());

        assert_eq!(services.len(), 2);
        assert_eq!(services.resolve_concrete_type("IMarker"), Some(b));
        assert_eq!(
            services.registration("IMarker").map(Registration::lifetime),
            Some(Lifetime::Transient)
        );
        assert!(services.resolve_concrete_type("IOther").is_none());
    }

    #[test]
    fn summary_reports_module_and_lifetime() {
        let a = ty(TypeDefinition::concrete("m", "A", |_| Ok(A)).build());
        let registration = Registration::new(marker(), a, Lifetime::Scoped);
        let summary = registration.summary();
        assert_eq!(summary.implementation, "A");
        assert_eq!(summary.module, "m, version=1");
        assert_eq!(registration.to_string(), "IMarker -> A (scoped, m, version=1)");
    }
}
