//! Example adapter module for labhost.
//!
//! Builds both as a `cdylib` (loaded by the host's native loader through
//! [`export_plugin!`]) and as an `rlib` so hosts and tests can link it in as
//! a builtin module.
//!
//! Exports:
//! - `omega::TemperatureAdapter`: simulated Omega temperature sensor (`ISensorAdapter`)
//! - `omega::ConcreteDescriptor`: component construction data (`IComponentDescriptor`)
//! - `omega::GenericDescriptorSet<T>`: descriptor set over any element type (`IComponentDescriptorSet`)

use anyhow::{anyhow, Context, Result};
use lab_plugin_api::prelude::*;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Name of the module this crate exports.
pub const MODULE_NAME: &str = "omega";

/// Namespace of the exported types.
pub const NAMESPACE: &str = "omega";

/// Module descriptor exported by this plugin.
pub fn module() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_NAME, env!("CARGO_PKG_VERSION"))
        .export(temperature_adapter_type())
        .export(concrete_descriptor_type())
        .export(descriptor_set_type())
}

export_plugin!(module);

/// `TemperatureAdapter` type definition.
pub fn temperature_adapter_type() -> TypeDefinition {
    TypeDefinition::concrete(NAMESPACE, "TemperatureAdapter", |_| {
        Ok(TemperatureAdapter::new(DEFAULT_SAMPLES))
    })
    .implements::<dyn SensorAdapter>(SENSOR_ADAPTER, |adapter| adapter)
    .implements::<dyn ComponentAdapter>(COMPONENT_ADAPTER, |adapter| adapter)
    .build()
}

/// `ConcreteDescriptor` type definition.
pub fn concrete_descriptor_type() -> TypeDefinition {
    TypeDefinition::concrete(NAMESPACE, "ConcreteDescriptor", |_| {
        Ok(ConcreteDescriptor::default())
    })
    .implements::<dyn ComponentDescriptor>(COMPONENT_DESCRIPTOR, |descriptor| descriptor)
    .build()
}

/// `GenericDescriptorSet<T>` type definition, generic over the element type.
pub fn descriptor_set_type() -> TypeDefinition {
    TypeDefinition::generic(NAMESPACE, "GenericDescriptorSet", 1, |activation| {
        let element = activation
            .type_argument(0)
            .cloned()
            .context("GenericDescriptorSet requires an element type")?;
        Ok(GenericDescriptorSet::new(element))
    })
    .implements::<dyn ComponentDescriptorSet>(COMPONENT_DESCRIPTOR_SET, |set| set)
    .build()
}

// =============================================================================
// Temperature sensor
// =============================================================================

const DEFAULT_SAMPLES: u32 = 3;
const SIMULATED_AMBIENT_C: f64 = 22.5;

#[derive(Debug)]
struct SensorState {
    state: AdapterState,
    samples: u32,
    last_reading: Option<f64>,
}

/// Simulated Omega temperature sensor.
///
/// Readings are averaged over `samples_to_average` simulated samples.
#[derive(Debug)]
pub struct TemperatureAdapter {
    inner: Mutex<SensorState>,
}

impl TemperatureAdapter {
    /// Creates an adapter averaging `samples_to_average` samples per scan.
    pub fn new(samples_to_average: u32) -> Self {
        Self {
            inner: Mutex::new(SensorState {
                state: AdapterState::Disconnected,
                samples: samples_to_average.max(1),
                last_reading: None,
            }),
        }
    }

    /// Last temperature read by [`SensorAdapter::scan`], in degrees Celsius.
    pub async fn last_reading(&self) -> Option<f64> {
        self.inner.lock().await.last_reading
    }
}

#[async_trait]
impl ComponentAdapter for TemperatureAdapter {
    async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == AdapterState::Disconnected {
            inner.state = AdapterState::Connected;
            tracing::debug!("omega sensor connected");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.lock().await.state = AdapterState::Disconnected;
        Ok(())
    }

    async fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            AdapterState::Disconnected => Err(anyhow!("omega sensor is not connected")),
            _ => {
                inner.state = AdapterState::Ready;
                Ok(())
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        self.disconnect().await
    }

    async fn read_state(&self) -> Result<AdapterState> {
        Ok(self.inner.lock().await.state)
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == AdapterState::Ready {
            inner.state = AdapterState::Stopped;
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != AdapterState::Disconnected {
            inner.state = AdapterState::Ready;
        }
        inner.last_reading = None;
        Ok(())
    }

    async fn last_error(&self) -> Option<String> {
        Some("Device not capable of reporting errors".to_string())
    }
}

#[async_trait]
impl SensorAdapter for TemperatureAdapter {
    async fn scan(&self) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if inner.state != AdapterState::Ready {
            return Err(anyhow!("omega sensor is not ready (state {:?})", inner.state));
        }
        let total: f64 = (0..inner.samples)
            .map(|i| SIMULATED_AMBIENT_C + f64::from(i % 2) * 0.5)
            .sum();
        let average = total / f64::from(inner.samples);
        inner.last_reading = Some(average);
        Ok(format!("{average:.2}"))
    }
}

// =============================================================================
// Component descriptors
// =============================================================================

#[derive(Debug, Default, Clone)]
struct DescriptorFields {
    component_id: String,
    profile_name: String,
    active: bool,
}

/// Construction data for one component.
#[derive(Debug, Default)]
pub struct ConcreteDescriptor {
    fields: RwLock<DescriptorFields>,
}

impl ComponentDescriptor for ConcreteDescriptor {
    fn component_id(&self) -> String {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .component_id
            .clone()
    }

    fn profile_name(&self) -> String {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .profile_name
            .clone()
    }

    fn assign(&self, component_id: &str, profile_name: &str) {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        fields.component_id = component_id.to_string();
        fields.profile_name = profile_name.to_string();
    }

    fn is_active(&self) -> bool {
        self.fields.read().unwrap_or_else(PoisonError::into_inner).active
    }

    fn set_active(&self, active: bool) {
        self.fields.write().unwrap_or_else(PoisonError::into_inner).active = active;
    }
}

/// Descriptor set whose element type is supplied when the generic definition
/// is closed.
pub struct GenericDescriptorSet {
    element: ResolvedType,
    items: RwLock<Vec<Arc<dyn ComponentDescriptor>>>,
}

impl GenericDescriptorSet {
    /// Creates an empty set producing elements of type `element`.
    pub fn new(element: ResolvedType) -> Self {
        Self {
            element,
            items: RwLock::new(Vec::new()),
        }
    }
}

impl ComponentDescriptorSet for GenericDescriptorSet {
    fn new_element(&self) -> Result<Arc<dyn ComponentDescriptor>> {
        let interface = lab_plugin_api::InterfaceType::of::<dyn ComponentDescriptor>(
            COMPONENT_DESCRIPTOR,
        );
        let instance = self
            .element
            .activate_as(&interface, &lab_plugin_api::NoServices)?;
        Ok(lab_plugin_api::downcast_instance::<dyn ComponentDescriptor>(
            &instance,
            COMPONENT_DESCRIPTOR,
        )?)
    }

    fn add(&self, descriptor: Arc<dyn ComponentDescriptor>) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let id = descriptor.component_id();
        if items.iter().any(|d| d.component_id() == id) {
            return false;
        }
        items.push(descriptor);
        true
    }

    fn remove(&self, component_id: &str) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|d| d.component_id() != component_id);
        items.len() != before
    }

    fn get(&self, component_id: &str) -> Option<Arc<dyn ComponentDescriptor>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.component_id() == component_id)
            .cloned()
    }

    fn component_ids(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.component_id())
            .collect()
    }

    fn element_type(&self) -> String {
        self.element.display_name()
    }
}
