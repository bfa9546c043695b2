//! Plugin API for labhost device adapter modules.
//!
//! Adapter modules are built independently of the host. Each module describes
//! itself with a [`ModuleDescriptor`] listing the types it exports, and a
//! dynamic library exports that descriptor through [`export_plugin!`].
//!
//! # Architecture
//!
//! ```text
//! labhost (host)
//! ├── ModuleLoader (native / builtin) ── loads ──> ModuleDescriptor   <- this crate
//! ├── TypeResolver ── finds ──> TypeDefinition ──> ResolvedType        <- this crate
//! └── ServiceComposer ── registers ──> ServiceCollection
//! ```
//!
//! # Creating a Plugin
//!
//! ```rust,ignore
//! use lab_plugin_api::prelude::*;
//!
//! fn module() -> ModuleDescriptor {
//!     ModuleDescriptor::new("omega", "1.0.0").export(
//!         TypeDefinition::concrete("omega", "TemperatureAdapter", |_| Ok(TemperatureAdapter::new()))
//!             .implements::<dyn SensorAdapter>(SENSOR_ADAPTER, |a| a)
//!             .build(),
//!     )
//! }
//!
//! export_plugin!(module);
//! ```

pub mod activation;
pub mod adapter;
pub mod identity;
pub mod interface;
pub mod module;
pub mod plugin;
pub mod types;

pub use activation::{downcast_instance, Activation, ActivationError, Instance, NoServices, ServiceLocator};
pub use identity::{ModuleIdentity, SATELLITE_RESOURCE_MARKER};
pub use interface::InterfaceType;
pub use module::ModuleDescriptor;
pub use plugin::{
    api_fingerprint, Incompatibility, PluginDeclaration, API_VERSION, CORE_VERSION,
    PLUGIN_ENTRY_SYMBOL,
};
pub use types::{ResolvedType, TypeBuilder, TypeDefinition, TypeError};

/// Prelude for plugin authors
pub mod prelude {
    pub use crate::activation::{Activation, ActivationError, ServiceLocator};
    pub use crate::adapter::{
        Actuator, AdapterState, ComponentAdapter, ComponentDescriptor, ComponentDescriptorSet,
        SensorAdapter, ACTUATOR, COMPONENT_ADAPTER, COMPONENT_DESCRIPTOR,
        COMPONENT_DESCRIPTOR_SET, SENSOR_ADAPTER,
    };
    pub use crate::export_plugin;
    pub use crate::module::ModuleDescriptor;
    pub use crate::types::{ResolvedType, TypeDefinition};
    pub use async_trait::async_trait;
}

/// Re-export async_trait for adapter authors
pub use async_trait;
