//! Exported types and resolved type handles.
//!
//! A module exports [`TypeDefinition`]s. Each definition has a short name, a
//! namespace, a generic arity, the interfaces it implements and a factory.
//! The host turns a definition into a [`ResolvedType`] once it has been found
//! in a loaded module, and closes generic definitions over other resolved
//! types at composition time.
//!
//! # Example
//!
//! ```rust,ignore
//! let sensor = TypeDefinition::concrete("omega", "TemperatureAdapter", |_| {
//!     Ok(TemperatureAdapter::default())
//! })
//! .implements::<dyn SensorAdapter>("ISensorAdapter", |adapter| adapter)
//! .build();
//!
//! // A generic definition receives its element type at activation time.
//! let set = TypeDefinition::generic("omega", "GenericDescriptorSet", 1, |activation| {
//!     let element = activation.type_argument(0).cloned().context("missing element")?;
//!     Ok(GenericDescriptorSet::new(element))
//! })
//! .implements::<dyn ComponentDescriptorSet>("IComponentDescriptorSet", |set| set)
//! .build();
//! ```

use crate::activation::{Activation, ActivationError, Instance, ServiceLocator};
use crate::identity::ModuleIdentity;
use crate::interface::InterfaceType;
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

type Factory = Arc<dyn Fn(&Activation<'_>) -> Result<Instance, ActivationError> + Send + Sync>;
type Cast = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

/// Errors raised when manipulating generic types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Only open generic definitions can be closed.
    #[error("Type '{0}' is not a generic type definition")]
    NotGenericDefinition(String),

    /// Wrong number of type arguments.
    #[error("Type '{type_name}' expects {expected} type argument(s), got {actual}")]
    ArityMismatch {
        /// Fully-qualified name of the definition.
        type_name: String,
        /// Arity of the definition.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },
}

/// An interface implemented by an exported type, with the coercion from the
/// concrete object to the interface handle.
struct InterfaceImpl {
    name: String,
    handle_id: TypeId,
    cast: Cast,
}

/// A type exported by a module.
pub struct TypeDefinition {
    namespace: String,
    name: String,
    arity: usize,
    interfaces: Vec<InterfaceImpl>,
    factory: Factory,
}

impl TypeDefinition {
    /// Starts a non-generic type definition.
    pub fn concrete<T, F>(
        namespace: impl Into<String>,
        name: impl Into<String>,
        factory: F,
    ) -> TypeBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Activation<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        TypeBuilder::new(namespace.into(), name.into(), 0, factory)
    }

    /// Starts a generic type definition taking `arity` type arguments.
    ///
    /// The factory only runs for closed types; the arguments are available
    /// through [`Activation::type_arguments`].
    pub fn generic<T, F>(
        namespace: impl Into<String>,
        name: impl Into<String>,
        arity: usize,
        factory: F,
    ) -> TypeBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Activation<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        TypeBuilder::new(namespace.into(), name.into(), arity, factory)
    }

    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, possibly empty.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fully-qualified name, `namespace::Name`.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    /// Number of type parameters; zero for non-generic types.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Whether the definition takes type parameters.
    pub fn is_generic(&self) -> bool {
        self.arity > 0
    }

    /// Exact, case-sensitive match against the short or fully-qualified name.
    pub fn matches_class_name(&self, class_name: &str) -> bool {
        self.name == class_name || self.full_name() == class_name
    }

    /// Names of the interfaces this type implements.
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(|i| i.name.as_str())
    }

    fn interface(&self, interface: &InterfaceType) -> Option<&InterfaceImpl> {
        self.interfaces
            .iter()
            .find(|i| i.name == interface.name() && i.handle_id == interface.handle_id())
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("full_name", &self.full_name())
            .field("arity", &self.arity)
            .field("interfaces", &self.interface_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`TypeDefinition::concrete`] and [`TypeDefinition::generic`].
pub struct TypeBuilder<T> {
    definition: TypeDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypeBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn new<F>(namespace: String, name: String, arity: usize, factory: F) -> Self
    where
        F: Fn(&Activation<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let type_name = name.clone();
        let factory: Factory = Arc::new(move |activation| {
            factory(activation)
                .map(|value| Arc::new(value) as Instance)
                .map_err(|source| ActivationError::Factory {
                    type_name: type_name.clone(),
                    source,
                })
        });

        Self {
            definition: TypeDefinition {
                namespace,
                name,
                arity,
                interfaces: Vec::new(),
                factory,
            },
            _marker: PhantomData,
        }
    }

    /// Declares that the type implements interface `I`.
    ///
    /// `coerce` is usually `|value| value`; the unsizing to `Arc<I>` happens
    /// at the closure's return.
    pub fn implements<I>(mut self, interface: impl Into<String>, coerce: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let cast: Cast = Arc::new(move |instance: Instance| {
            instance
                .downcast::<T>()
                .ok()
                .map(|concrete| Arc::new(coerce(concrete)) as Instance)
        });
        self.definition.interfaces.push(InterfaceImpl {
            name: interface.into(),
            handle_id: TypeId::of::<Arc<I>>(),
            cast,
        });
        self
    }

    /// Finishes the definition.
    pub fn build(self) -> TypeDefinition {
        self.definition
    }
}

/// A type found in a loaded module, optionally closed over type arguments.
#[derive(Clone)]
pub struct ResolvedType {
    definition: Arc<TypeDefinition>,
    module: Arc<ModuleIdentity>,
    type_arguments: Vec<ResolvedType>,
}

impl ResolvedType {
    /// Wraps a definition exported by `module`. Generic definitions stay open.
    pub fn new(definition: Arc<TypeDefinition>, module: Arc<ModuleIdentity>) -> Self {
        Self {
            definition,
            module,
            type_arguments: Vec::new(),
        }
    }

    /// The exported definition.
    pub fn definition(&self) -> &Arc<TypeDefinition> {
        &self.definition
    }

    /// Identity of the module the definition came from.
    pub fn module(&self) -> &ModuleIdentity {
        &self.module
    }

    /// Short name of the definition.
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Fully-qualified name of the definition (without type arguments).
    pub fn full_name(&self) -> String {
        self.definition.full_name()
    }

    /// Name including type arguments, e.g. `GenericDescriptorSet<ConcreteDescriptor>`.
    pub fn display_name(&self) -> String {
        if self.type_arguments.is_empty() {
            return self.name().to_string();
        }
        let args = self
            .type_arguments
            .iter()
            .map(ResolvedType::display_name)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}<{}>", self.name(), args)
    }

    /// Type arguments this type was closed over.
    pub fn type_arguments(&self) -> &[ResolvedType] {
        &self.type_arguments
    }

    /// Whether the underlying definition is generic (open or closed).
    pub fn is_generic(&self) -> bool {
        self.definition.is_generic()
    }

    /// Whether this is an open generic definition.
    pub fn is_generic_definition(&self) -> bool {
        self.is_generic() && self.type_arguments.is_empty()
    }

    /// The open definition of a generic type; `None` for non-generic types.
    pub fn generic_definition(&self) -> Option<ResolvedType> {
        self.is_generic()
            .then(|| Self::new(self.definition.clone(), self.module.clone()))
    }

    /// Closes an open generic definition over `type_arguments`.
    pub fn close_over(&self, type_arguments: &[ResolvedType]) -> Result<ResolvedType, TypeError> {
        if !self.is_generic_definition() {
            return Err(TypeError::NotGenericDefinition(self.display_name()));
        }
        if type_arguments.len() != self.definition.arity() {
            return Err(TypeError::ArityMismatch {
                type_name: self.full_name(),
                expected: self.definition.arity(),
                actual: type_arguments.len(),
            });
        }
        Ok(Self {
            definition: self.definition.clone(),
            module: self.module.clone(),
            type_arguments: type_arguments.to_vec(),
        })
    }

    /// Whether the type declares `interface`.
    pub fn implements(&self, interface: &InterfaceType) -> bool {
        self.definition.interface(interface).is_some()
    }

    /// Constructs the concrete object (erased as `Arc<T>`).
    pub fn activate(&self, services: &dyn ServiceLocator) -> Result<Instance, ActivationError> {
        if self.is_generic_definition() {
            return Err(ActivationError::OpenGeneric(self.full_name()));
        }
        (self.definition.factory)(&Activation::new(&self.type_arguments, services))
    }

    /// Constructs the object and coerces it to `interface`.
    ///
    /// The returned instance holds an `Arc<I>` for the interface's trait `I`.
    pub fn activate_as(
        &self,
        interface: &InterfaceType,
        services: &dyn ServiceLocator,
    ) -> Result<Instance, ActivationError> {
        let implementation =
            self.definition
                .interface(interface)
                .ok_or_else(|| ActivationError::NotImplemented {
                    type_name: self.display_name(),
                    interface: interface.name().to_string(),
                })?;
        let concrete = self.activate(services)?;
        (implementation.cast)(concrete).ok_or_else(|| ActivationError::NotImplemented {
            type_name: self.display_name(),
            interface: interface.name().to_string(),
        })
    }
}

impl PartialEq for ResolvedType {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.definition.full_name() == other.definition.full_name()
            && self.type_arguments == other.type_arguments
    }
}

impl Eq for ResolvedType {}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedType")
            .field("type", &self.display_name())
            .field("module", &self.module.full_name())
            .finish()
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
