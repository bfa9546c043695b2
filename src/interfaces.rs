//! Interface catalog.
//!
//! Configuration names interfaces by string. The catalog maps those names to
//! [`InterfaceType`] handles; it is the set of interfaces the host can
//! operate through. Lookups never touch a module.

use lab_plugin_api::adapter::{
    Actuator, ComponentAdapter, ComponentDescriptor, ComponentDescriptorSet, SensorAdapter,
    ACTUATOR, COMPONENT_ADAPTER, COMPONENT_DESCRIPTOR, COMPONENT_DESCRIPTOR_SET, SENSOR_ADAPTER,
};
use lab_plugin_api::InterfaceType;
use std::collections::BTreeMap;

/// Interfaces known to the host, by configuration name.
#[derive(Debug, Clone, Default)]
pub struct InterfaceCatalog {
    interfaces: BTreeMap<String, InterfaceType>,
}

impl InterfaceCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the adapter interfaces defined by `lab_plugin_api`.
    pub fn with_builtin_interfaces() -> Self {
        let mut catalog = Self::new();
        catalog.register_interface::<dyn ComponentAdapter>(COMPONENT_ADAPTER);
        catalog.register_interface::<dyn SensorAdapter>(SENSOR_ADAPTER);
        catalog.register_interface::<dyn Actuator>(ACTUATOR);
        catalog.register_interface::<dyn ComponentDescriptor>(COMPONENT_DESCRIPTOR);
        catalog.register_interface::<dyn ComponentDescriptorSet>(COMPONENT_DESCRIPTOR_SET);
        catalog
    }

    /// Adds `interface`, replacing any interface of the same name.
    pub fn register(&mut self, interface: InterfaceType) {
        self.interfaces.insert(interface.name().to_string(), interface);
    }

    /// Adds the trait object type `I` under `name`.
    pub fn register_interface<I>(&mut self, name: &str)
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.register(InterfaceType::of::<I>(name));
    }

    /// Looks up an interface by exact name.
    pub fn lookup(&self, name: &str) -> Option<&InterfaceType> {
        self.interfaces.get(name)
    }

    /// Registered interface names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Number of interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_knows_adapter_interfaces() {
        let catalog = InterfaceCatalog::with_builtin_interfaces();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.lookup(SENSOR_ADAPTER),
            Some(&InterfaceType::of::<dyn SensorAdapter>(SENSOR_ADAPTER))
        );
        assert!(catalog.lookup("isensoradapter").is_none());
        assert!(catalog.names().any(|n| n == COMPONENT_DESCRIPTOR_SET));
    }

    #[test]
    fn register_replaces_by_name() {
        trait Custom: Send + Sync {}

        let mut catalog = InterfaceCatalog::new();
        assert!(catalog.is_empty());
        catalog.register_interface::<dyn ComponentAdapter>("IThing");
        catalog.register_interface::<dyn Custom>("IThing");
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.lookup("IThing"),
            Some(&InterfaceType::of::<dyn Custom>("IThing"))
        );
    }
}
