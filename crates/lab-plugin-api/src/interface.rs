//! Interface handles.
//!
//! An [`InterfaceType`] names a capability trait the host operates through
//! (for example `ISensorAdapter` for `dyn SensorAdapter`). Instances resolved
//! for an interface `I` are stored as `Arc<dyn Any>` holding an `Arc<I>`, so
//! the handle records the `TypeId` of `Arc<I>` to check downcasts.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handle to an interface known to the host.
#[derive(Clone)]
pub struct InterfaceType {
    name: String,
    handle_id: TypeId,
    rust_name: &'static str,
}

impl InterfaceType {
    /// Creates a handle for the trait object type `I` under a configuration name.
    ///
    /// ```rust,ignore
    /// let sensor = InterfaceType::of::<dyn SensorAdapter>("ISensorAdapter");
    /// ```
    pub fn of<I>(name: impl Into<String>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handle_id: TypeId::of::<std::sync::Arc<I>>(),
            rust_name: std::any::type_name::<I>(),
        }
    }

    /// Configuration name of the interface.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `TypeId` of the `Arc<I>` handle stored for this interface.
    pub fn handle_id(&self) -> TypeId {
        self.handle_id
    }

    /// Rust type name of the trait object, for diagnostics.
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }
}

impl PartialEq for InterfaceType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.handle_id == other.handle_id
    }
}

impl Eq for InterfaceType {}

impl Hash for InterfaceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.handle_id.hash(state);
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("rust_name", &self.rust_name)
            .finish()
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
