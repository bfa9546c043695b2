//! # labhost
//!
//! Core library of the laboratory instrument host. Device adapters ship as
//! separately built modules; the host loads them at runtime, resolves the
//! configured implementation types, and registers them in a composition
//! root from which the rest of the application obtains its services.
//!
//! ## Crate Structure
//!
//! - **`probing`**: `ProbingContext`, the fallback directories and the active
//!   directory consulted when a module reference cannot be bound directly.
//! - **`loader`**: the `ModuleLoader` seam, with a dynamic-library loader and
//!   an in-process loader for statically linked modules.
//! - **`resolution`**: `DynamicLoader`, which binds module references and runs
//!   the ordered resolution strategies on a miss.
//! - **`type_resolver`**: finds a named type inside a loaded module.
//! - **`interfaces`**: the catalog of interfaces configuration may name.
//! - **`container`**: the composition root (`ServiceCollection`) and the
//!   `ServiceProvider` built from it.
//! - **`composer`**: `ServiceComposer`, which turns dependency descriptors into
//!   registrations, including backup locations and generic collections.
//! - **`config`**: Figment-based configuration (`HostConfig`).
//! - **`logging`**: `tracing` subscriber setup.
//! - **`host`**: bootstrap that wires everything together.
//! - **`error`**: error types for each layer.

pub mod composer;
pub mod config;
pub mod container;
pub mod error;
pub mod host;
pub mod interfaces;
pub mod loader;
pub mod logging;
pub mod probing;
pub mod resolution;
pub mod type_resolver;

pub use composer::{DependencyDescriptor, LifetimeValue, ServiceComposer};
pub use config::HostConfig;
pub use container::{
    CompositionRoot, Lifetime, Registration, ServiceCollection, ServiceProvider, ServiceScope,
};
pub use error::{ComposeError, HostError, ModuleLoadError, ResolveError};
pub use host::{Composition, Host};
pub use interfaces::InterfaceCatalog;
pub use loader::{BuiltinModuleLoader, LoadedModule, ModuleLoader, NativeModuleLoader};
pub use probing::ProbingContext;
pub use resolution::{DynamicLoader, Resolution, ResolutionStrategy};
pub use type_resolver::TypeResolver;
