//! Error types for the labhost composition engine.
//!
//! Errors are layered the way composition proceeds:
//!
//! - **`ModuleLoadError`**: a module binary is missing, corrupt, built against
//!   another plugin API (version or build), or one of its references cannot
//!   be bound. This is the
//!   only failure the composer retries against a backup location.
//! - **`ResolveError`**: the Type Resolver's errors. Wraps module-load failures
//!   and adds argument, lookup, generic-closing and assignability failures.
//! - **`ComposeError`**: the Service Composer's errors. Configuration errors
//!   are raised before any module is touched.
//! - **`HostError`**: bootstrap failures (configuration file, validation,
//!   logging, composition).
//!
//! Every variant is fatal for the composition pass that raised it; there is
//! no partial success per descriptor.

use lab_plugin_api::TypeError;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for composer results.
pub type ComposeResult<T> = std::result::Result<T, ComposeError>;

/// Failure to load a module or bind one of its references.
#[derive(Error, Debug)]
pub enum ModuleLoadError {
    /// No module file at the path.
    #[error("Module file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The dynamic library could not be opened.
    #[error("Failed to load module library {}: {reason}", .path.display())]
    Library {
        /// Library path.
        path: PathBuf,
        /// Loader message.
        reason: String,
    },

    /// The library does not export the plugin declaration.
    #[error("Module {} does not export entry point '{symbol}'", .path.display())]
    MissingEntryPoint {
        /// Library path.
        path: PathBuf,
        /// Symbol that was looked up.
        symbol: String,
    },

    /// The plugin was built against another version of the plugin API.
    #[error(
        "Module {} was built against plugin API {plugin_api} (core {plugin_core}); host expects API {host_api} (core {host_core})",
        .path.display()
    )]
    IncompatibleApi {
        /// Library path.
        path: PathBuf,
        /// Declaration layout version of the plugin.
        plugin_api: u32,
        /// API crate version of the plugin.
        plugin_core: String,
        /// Declaration layout version of the host.
        host_api: u32,
        /// API crate version of the host.
        host_core: String,
    },

    /// Same plugin API version, but a different build of the API crate.
    #[error(
        "Module {} was built against a different build of the plugin API; rebuild it together with the host",
        .path.display()
    )]
    ForeignApiBuild {
        /// Library path.
        path: PathBuf,
    },

    /// A declared reference could not be bound.
    #[error("Could not resolve module '{reference}' referenced by '{module}'")]
    UnresolvedReference {
        /// Full identity of the referencing module.
        module: String,
        /// Full identity of the missing reference.
        reference: String,
    },
}

/// Errors raised by the Type Resolver.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A required argument was empty.
    #[error("Invalid argument: {0} must not be empty")]
    InvalidArgument(&'static str),

    /// The module could not be loaded.
    #[error(transparent)]
    ModuleLoad(#[from] ModuleLoadError),

    /// The module exports no type with the requested name.
    #[error("Type '{class_name}' not found in module {}", .location.display())]
    TypeNotFound {
        /// Module path.
        location: PathBuf,
        /// Requested class name.
        class_name: String,
    },

    /// The type does not declare the requested interface.
    #[error("Type '{type_name}' is not assignable to interface '{interface}'")]
    NotAssignable {
        /// Display name of the resolved type.
        type_name: String,
        /// Requested interface.
        interface: String,
    },

    /// Closing a generic type failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ResolveError {
    /// Whether the failure happened while loading the module binary.
    ///
    /// Only these failures are retried against a backup location.
    pub fn is_module_load(&self) -> bool {
        matches!(self, Self::ModuleLoad(_))
    }
}

/// Errors raised by the Service Composer.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The descriptor is incomplete or its lifetime is not recognized.
    #[error("Unable to load dependency '{name}': {reason}")]
    Configuration {
        /// Descriptor name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The interface name is not in the interface catalog.
    #[error("Interface '{0}' is not known to the host")]
    InterfaceNotFound(String),

    /// A collection's element interface has no registration yet.
    #[error("No implementation registered for element interface '{0}'")]
    ElementNotRegistered(String),

    /// The collection type has no type parameters.
    #[error("Collection type '{0}' is not a generic type")]
    NotGeneric(String),

    /// Type resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Closing the collection type failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ComposeError {
    /// Shorthand for a configuration error on descriptor `name`.
    pub fn configuration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while bootstrapping the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// The configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The configuration parsed but is inconsistent.
    #[error("Configuration validation error: {0}")]
    Validation(String),

    /// The tracing subscriber could not be installed.
    #[error("Logging initialization failed: {0}")]
    Logging(String),

    /// A collection entry names a dependency that is not configured.
    #[error("Dependency '{0}' referenced by a collection is not configured")]
    UnknownDependency(String),

    /// Composition failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl From<figment::Error> for HostError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_module_load_failures_are_retryable() {
        let load = ResolveError::from(ModuleLoadError::NotFound(PathBuf::from("/x/omega.so")));
        assert!(load.is_module_load());
        assert!(load.to_string().contains("/x/omega.so"));

        let missing = ResolveError::TypeNotFound {
            location: PathBuf::from("/x/omega.so"),
            class_name: "Nope".into(),
        };
        assert!(!missing.is_module_load());
        assert!(!ResolveError::InvalidArgument("class name").is_module_load());

        let foreign = ResolveError::from(ModuleLoadError::ForeignApiBuild {
            path: PathBuf::from("/x/omega.so"),
        });
        assert!(foreign.is_module_load());
        assert!(foreign.to_string().contains("different build"));
    }

    #[test]
    fn configuration_error_names_dependency() {
        let err = ComposeError::configuration("TemperatureSensor", "remote path not set");
        assert_eq!(
            err.to_string(),
            "Unable to load dependency 'TemperatureSensor': remote path not set"
        );
    }
}
