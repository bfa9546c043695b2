//! Device adapter capability traits.
//!
//! Adapter modules implement these traits and export them under the interface
//! names the host registers in its catalog. The composition engine never calls
//! them; it only resolves and registers the types behind them.
//!
//! - [`ComponentAdapter`]: lifecycle surface shared by every device
//! - [`SensorAdapter`]: devices that produce a measurement (temperature, pH, barcodes)
//! - [`Actuator`]: devices with a frame of reference (motors, shakers)
//! - [`ComponentDescriptor`] / [`ComponentDescriptorSet`]: bookkeeping of
//!   configured components, composed from two independently loaded types
//!
//! Each capability trait is async, thread-safe and returns `anyhow::Result`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Interface name of [`ComponentAdapter`].
pub const COMPONENT_ADAPTER: &str = "IComponentAdapter";
/// Interface name of [`SensorAdapter`].
pub const SENSOR_ADAPTER: &str = "ISensorAdapter";
/// Interface name of [`Actuator`].
pub const ACTUATOR: &str = "IActuator";
/// Interface name of [`ComponentDescriptor`].
pub const COMPONENT_DESCRIPTOR: &str = "IComponentDescriptor";
/// Interface name of [`ComponentDescriptorSet`].
pub const COMPONENT_DESCRIPTOR_SET: &str = "IComponentDescriptorSet";

/// Observable state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// Not connected to the device.
    #[default]
    Disconnected,
    /// Connected but not initialized.
    Connected,
    /// Initialized and ready for device actions.
    Ready,
    /// Operation interrupted by `stop`.
    Stopped,
    /// Device reported an error; see [`ComponentAdapter::last_error`].
    Faulted,
}

/// Lifecycle surface shared by every device adapter.
#[async_trait]
pub trait ComponentAdapter: Send + Sync {
    /// Opens the connection to the device.
    async fn connect(&self) -> Result<()>;

    /// Closes the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Brings the device into a valid initial state.
    async fn initialize(&self) -> Result<()>;

    /// Brings the device into a valid dormant state.
    async fn shutdown(&self) -> Result<()>;

    /// Current adapter state.
    async fn read_state(&self) -> Result<AdapterState>;

    /// Interrupts the current operation.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Interrupts the device and resets it.
    async fn reset(&self) -> Result<()> {
        Ok(())
    }

    /// Last error reported by the device, if any.
    async fn last_error(&self) -> Option<String> {
        None
    }
}

/// A device that measures a parameter of interest.
#[async_trait]
pub trait SensorAdapter: ComponentAdapter {
    /// Takes one measurement, formatted by the device.
    async fn scan(&self) -> Result<String>;
}

/// A device with a frame of reference.
#[async_trait]
pub trait Actuator: ComponentAdapter {
    /// Establishes the frame of reference.
    async fn home(&self) -> Result<()>;
}

/// Construction data of one configured component.
pub trait ComponentDescriptor: Send + Sync {
    /// Component identifier, unique within a descriptor set.
    fn component_id(&self) -> String;

    /// Name of the adapter profile the component uses.
    fn profile_name(&self) -> String;

    /// Assigns identifier and profile.
    fn assign(&self, component_id: &str, profile_name: &str);

    /// Whether the component is active.
    fn is_active(&self) -> bool;

    /// Marks the component active or inactive.
    fn set_active(&self, active: bool);
}

/// Collection of component descriptors whose element type is chosen at
/// composition time.
pub trait ComponentDescriptorSet: Send + Sync {
    /// Creates a new, unassigned element of the set's element type.
    fn new_element(&self) -> Result<Arc<dyn ComponentDescriptor>>;

    /// Adds a descriptor. Returns `false` if its identifier is already present.
    fn add(&self, descriptor: Arc<dyn ComponentDescriptor>) -> bool;

    /// Removes the descriptor with `component_id`.
    fn remove(&self, component_id: &str) -> bool;

    /// Looks up a descriptor.
    fn get(&self, component_id: &str) -> Option<Arc<dyn ComponentDescriptor>>;

    /// Identifiers in insertion order.
    fn component_ids(&self) -> Vec<String>;

    /// Display name of the element type, e.g. `ConcreteDescriptor`.
    fn element_type(&self) -> String;

    /// Number of descriptors.
    fn len(&self) -> usize {
        self.component_ids().len()
    }

    /// Whether the set is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        state: Mutex<AdapterState>,
    }

    #[async_trait]
    impl ComponentAdapter for Recorder {
        async fn connect(&self) -> Result<()> {
            *self.state.lock().unwrap() = AdapterState::Connected;
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            *self.state.lock().unwrap() = AdapterState::Disconnected;
            Ok(())
        }

        async fn initialize(&self) -> Result<()> {
            *self.state.lock().unwrap() = AdapterState::Ready;
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            self.disconnect().await
        }

        async fn read_state(&self) -> Result<AdapterState> {
            Ok(*self.state.lock().unwrap())
        }
    }

    #[tokio::test]
    async fn default_lifecycle_methods_are_no_ops() {
        let adapter = Recorder::default();
        assert_eq!(adapter.read_state().await.unwrap(), AdapterState::Disconnected);

        adapter.connect().await.unwrap();
        adapter.initialize().await.unwrap();
        adapter.stop().await.unwrap();
        adapter.reset().await.unwrap();

        assert_eq!(adapter.read_state().await.unwrap(), AdapterState::Ready);
        assert_eq!(adapter.last_error().await, None);

        adapter.shutdown().await.unwrap();
        assert_eq!(adapter.read_state().await.unwrap(), AdapterState::Disconnected);
    }

    #[test]
    fn adapter_state_serializes_snake_case() {
        let json = serde_json::to_string(&AdapterState::Faulted).unwrap();
        assert_eq!(json, "\"faulted\"");
    }
}
