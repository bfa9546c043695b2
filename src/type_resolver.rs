//! Type Resolver: finds a named type inside a module loaded at runtime.

use crate::error::ResolveError;
use crate::probing::ProbingContext;
use crate::resolution::DynamicLoader;
use lab_plugin_api::{InterfaceType, ResolvedType};
use std::path::Path;
use std::sync::Arc;

/// Resolves `(location, class name)` pairs to [`ResolvedType`]s.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    loader: Arc<DynamicLoader>,
}

impl TypeResolver {
    /// Creates a resolver loading modules through `loader`.
    pub fn new(loader: Arc<DynamicLoader>) -> Self {
        Self { loader }
    }

    /// The loader modules are loaded through.
    pub fn loader(&self) -> &Arc<DynamicLoader> {
        &self.loader
    }

    /// Loads the module at `location` and returns the first exported type
    /// whose short or fully-qualified name equals `class_name`.
    ///
    /// - A generic definition is closed over `type_arguments` when any are
    ///   given, and returned open otherwise.
    /// - With `target`, the type must declare that interface.
    ///
    /// The module's references are bound using `context`.
    pub fn resolve(
        &self,
        context: &ProbingContext,
        location: &Path,
        class_name: &str,
        target: Option<&InterfaceType>,
        type_arguments: &[ResolvedType],
    ) -> Result<ResolvedType, ResolveError> {
        if location.as_os_str().is_empty() {
            return Err(ResolveError::InvalidArgument("module location"));
        }
        if class_name.is_empty() {
            return Err(ResolveError::InvalidArgument("class name"));
        }

        let module = self.loader.load(location, context)?;

        let found = module
            .find_type(class_name)
            .ok_or_else(|| ResolveError::TypeNotFound {
                location: location.to_path_buf(),
                class_name: class_name.to_string(),
            })?;

        let resolved = if found.is_generic_definition() && !type_arguments.is_empty() {
            found.close_over(type_arguments)?
        } else {
            found.clone()
        };

        if let Some(interface) = target {
            if !resolved.implements(interface) {
                return Err(ResolveError::NotAssignable {
                    type_name: resolved.display_name(),
                    interface: interface.name().to_string(),
                });
            }
        }

        tracing::debug!(
            location = %location.display(),
            class_name,
            resolved = %resolved,
            module = %resolved.module(),
            "Resolved type"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleLoadError;
    use crate::loader::BuiltinModuleLoader;
    use lab_plugin_api::adapter::{
        ComponentDescriptor, ComponentDescriptorSet, SensorAdapter, COMPONENT_DESCRIPTOR,
        COMPONENT_DESCRIPTOR_SET, SENSOR_ADAPTER,
    };
    use std::path::PathBuf;

    const OMEGA: &str = "/plugins/omega.so";

    fn resolver() -> (Arc<BuiltinModuleLoader>, TypeResolver) {
        let builtin = Arc::new(
            BuiltinModuleLoader::new().with_module(OMEGA, lab_plugin_example::module),
        );
        let loader = Arc::new(DynamicLoader::new(builtin.clone()));
        (builtin, TypeResolver::new(loader))
    }

    #[test]
    fn rejects_empty_arguments_before_loading() {
        let (builtin, resolver) = resolver();
        let ctx = ProbingContext::default();

        assert!(matches!(
            resolver.resolve(&ctx, Path::new(""), "TemperatureAdapter", None, &[]),
            Err(ResolveError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolver.resolve(&ctx, Path::new(OMEGA), "", None, &[]),
            Err(ResolveError::InvalidArgument(_))
        ));
        assert_eq!(builtin.total_attempts(), 0);
    }

    #[test]
    fn resolves_by_short_and_full_name() {
        let (_, resolver) = resolver();
        let ctx = ProbingContext::default();
        let sensor = InterfaceType::of::<dyn SensorAdapter>(SENSOR_ADAPTER);

        let short = resolver
            .resolve(&ctx, Path::new(OMEGA), "TemperatureAdapter", Some(&sensor), &[])
            .unwrap();
        let full = resolver
            .resolve(&ctx, Path::new(OMEGA), "omega::TemperatureAdapter", None, &[])
            .unwrap();
        assert_eq!(short, full);
        assert_eq!(short.module().name, "omega");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve(&ProbingContext::default(), Path::new(OMEGA), "temperatureadapter", None, &[])
            .unwrap_err();
        assert!(matches!(err, ResolveError::TypeNotFound { .. }));
        assert!(!err.is_module_load());
    }

    #[test]
    fn missing_module_is_a_load_error() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve(
                &ProbingContext::default(),
                Path::new("/nowhere/omega.so"),
                "TemperatureAdapter",
                None,
                &[],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ModuleLoad(ModuleLoadError::NotFound(ref p)) if p == &PathBuf::from("/nowhere/omega.so")
        ));
    }

    #[test]
    fn generic_definition_is_open_without_arguments() {
        let (_, resolver) = resolver();
        let ctx = ProbingContext::default();
        let open = resolver
            .resolve(&ctx, Path::new(OMEGA), "GenericDescriptorSet", None, &[])
            .unwrap();
        assert!(open.is_generic_definition());

        let element = resolver
            .resolve(&ctx, Path::new(OMEGA), "ConcreteDescriptor", None, &[])
            .unwrap();
        let set = InterfaceType::of::<dyn ComponentDescriptorSet>(COMPONENT_DESCRIPTOR_SET);
        let closed = resolver
            .resolve(&ctx, Path::new(OMEGA), "GenericDescriptorSet", Some(&set), &[element])
            .unwrap();
        assert_eq!(closed.display_name(), "GenericDescriptorSet<ConcreteDescriptor>");
    }

    #[test]
    fn wrong_interface_is_not_assignable() {
        let (_, resolver) = resolver();
        let descriptor = InterfaceType::of::<dyn ComponentDescriptor>(COMPONENT_DESCRIPTOR);
        let err = resolver
            .resolve(
                &ProbingContext::default(),
                Path::new(OMEGA),
                "TemperatureAdapter",
                Some(&descriptor),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotAssignable { .. }));
    }
}
