//! Integration tests for loading the example adapter module as a dynamic
//! library.
//!
//! The library is the `cdylib` output of `lab-plugin-example`. Tests that need
//! it skip when it has not been built (`cargo build -p lab-plugin-example`).
//! A library built in a different dependency graph than this test links a
//! different build of the plugin API; it must then be refused as a module
//! load error, never surface as an interface mismatch.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs
)]

use lab_plugin_api::adapter::{
    ComponentAdapter, ComponentDescriptorSet, SensorAdapter, COMPONENT_DESCRIPTOR,
    COMPONENT_DESCRIPTOR_SET, SENSOR_ADAPTER,
};
use labhost::loader::module_file_name;
use labhost::{
    ComposeError, CompositionRoot, DependencyDescriptor, DynamicLoader, InterfaceCatalog,
    Lifetime, ModuleLoadError, ModuleLoader, NativeModuleLoader, ProbingContext, ResolveError,
    ServiceCollection, ServiceComposer, TypeResolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn library_file_name() -> String {
    format!(
        "{}lab_plugin_example.{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_EXTENSION
    )
}

/// Build output directory (`target/debug` or `target/release`).
fn output_dir() -> PathBuf {
    // The test binary lives in `<output>/deps`.
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
    {
        return dir;
    }
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("target");
    path.push(if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });
    path
}

/// Path to the built example library.
fn plugin_path() -> Option<PathBuf> {
    let path = output_dir().join(library_file_name());
    if path.is_file() {
        Some(path)
    } else {
        eprintln!(
            "Skipping test: plugin not found at {:?}. Run `cargo build -p lab-plugin-example` first.",
            path
        );
        None
    }
}

/// Path to the example library when it links the same plugin API build as
/// this test.
fn compatible_plugin_path() -> Option<PathBuf> {
    let path = plugin_path()?;
    match NativeModuleLoader::new().load_module(&path) {
        Ok(_) => Some(path),
        Err(ModuleLoadError::ForeignApiBuild { .. }) => {
            eprintln!(
                "Skipping test: {:?} was built against another plugin API build. Run `cargo build --workspace`.",
                path
            );
            None
        }
        Err(other) => panic!("unexpected load failure: {other}"),
    }
}

/// Copies the library into `dir` under the module's file name, `omega.<ext>`.
fn install(library: &Path, dir: &Path) -> PathBuf {
    let target = dir.join(module_file_name(lab_plugin_example::MODULE_NAME));
    std::fs::copy(library, &target).unwrap();
    target
}

fn omega_identity() -> String {
    lab_plugin_example::module().identity().full_name()
}

fn composer(native: &Arc<NativeModuleLoader>) -> ServiceComposer {
    ServiceComposer::new(
        TypeResolver::new(Arc::new(DynamicLoader::new(native.clone()))),
        InterfaceCatalog::with_builtin_interfaces(),
    )
}

#[tokio::test]
async fn library_composes_or_is_refused_as_a_load_error() {
    let Some(library) = plugin_path() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let omega = install(&library, dir.path());

    let native = Arc::new(NativeModuleLoader::new());
    let composer = composer(&native);
    let mut context = ProbingContext::default();
    let mut services = ServiceCollection::new();

    let descriptor =
        DependencyDescriptor::new("Thermometer", &omega, "TemperatureAdapter", SENSOR_ADAPTER)
            .with_lifetime(Lifetime::Singleton);

    match composer.register_dependency(&descriptor, &mut context, &mut services) {
        Ok(concrete) => {
            assert_eq!(concrete.name(), "TemperatureAdapter");
            assert_eq!(context.active_directory(), dir.path());

            let provider = services.build_provider();
            let sensor = provider.resolve::<dyn SensorAdapter>(SENSOR_ADAPTER).unwrap();
            sensor.connect().await.unwrap();
            sensor.initialize().await.unwrap();
            assert_eq!(sensor.scan().await.unwrap(), "22.67");
            sensor.shutdown().await.unwrap();
        }
        Err(ComposeError::Resolve(ResolveError::ModuleLoad(
            ModuleLoadError::ForeignApiBuild { path },
        ))) => {
            assert_eq!(path, omega.canonicalize().unwrap());
            assert!(services.is_empty());
        }
        Err(other) => panic!("expected success or a module load error, got: {other}"),
    }
}

#[test]
fn corrupt_primary_falls_back_to_library_backup() {
    let Some(library) = compatible_plugin_path() else {
        return;
    };
    let primary_dir = tempfile::tempdir().unwrap();
    let backup_dir = tempfile::tempdir().unwrap();
    let primary = primary_dir
        .path()
        .join(module_file_name(lab_plugin_example::MODULE_NAME));
    std::fs::write(&primary, b"not a shared object").unwrap();
    let backup = install(&library, backup_dir.path());

    let native = Arc::new(NativeModuleLoader::new());
    let composer = composer(&native);
    let mut context = ProbingContext::default();
    let mut services = ServiceCollection::new();

    let descriptor =
        DependencyDescriptor::new("Thermometer", &primary, "TemperatureAdapter", SENSOR_ADAPTER)
            .with_backup(&backup);
    let concrete = composer
        .register_dependency(&descriptor, &mut context, &mut services)
        .unwrap();

    assert_eq!(concrete.module().full_name(), omega_identity());
    assert_eq!(context.active_directory(), backup_dir.path());
    assert_eq!(native.library_count(), 1);
}

#[test]
fn strategies_find_the_library_in_fallback_then_active_directory() {
    let Some(library) = compatible_plugin_path() else {
        return;
    };
    let empty = tempfile::tempdir().unwrap();
    let shared = tempfile::tempdir().unwrap();
    install(&library, shared.path());

    let native = Arc::new(NativeModuleLoader::new());
    let dynamic = DynamicLoader::new(native.clone());

    let nowhere = ProbingContext::new([empty.path()]);
    assert!(dynamic.resolve(&omega_identity(), &nowhere).is_unresolved());

    let active = nowhere.clone().with_active_directory(shared.path());
    let module = dynamic
        .resolve(&omega_identity(), &active)
        .module()
        .cloned()
        .unwrap();
    assert_eq!(module.identity().full_name(), omega_identity());

    let fallback = ProbingContext::new([empty.path(), shared.path()]);
    let again = dynamic
        .resolve(&omega_identity(), &fallback)
        .module()
        .cloned()
        .unwrap();
    assert!(Arc::ptr_eq(&module, &again));
}

#[test]
fn collection_closes_over_library_element_type() {
    let Some(library) = compatible_plugin_path() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let omega = install(&library, dir.path());

    let native = Arc::new(NativeModuleLoader::new());
    let composer = composer(&native);
    let mut context = ProbingContext::default();
    let mut services = ServiceCollection::new();

    let element =
        DependencyDescriptor::new("Descriptor", &omega, "ConcreteDescriptor", COMPONENT_DESCRIPTOR);
    let collection = DependencyDescriptor::new(
        "DescriptorSet",
        &omega,
        "GenericDescriptorSet",
        COMPONENT_DESCRIPTOR_SET,
    )
    .with_lifetime(Lifetime::Scoped);

    composer
        .register_dependency(&element, &mut context, &mut services)
        .unwrap();
    let closed = composer
        .register_collection_dependency(&element, &collection, &mut context, &mut services)
        .unwrap();
    assert_eq!(closed.display_name(), "GenericDescriptorSet<ConcreteDescriptor>");
    assert!(services.resolve_concrete_type(COMPONENT_DESCRIPTOR_SET).is_some());

    let provider = services.build_provider();
    let scope = provider.create_scope();
    let set = scope
        .resolve::<dyn ComponentDescriptorSet>(COMPONENT_DESCRIPTOR_SET)
        .unwrap();
    assert_eq!(set.element_type(), "ConcreteDescriptor");
}

#[test]
fn second_copy_of_a_loaded_module_is_not_kept_open() {
    let Some(library) = compatible_plugin_path() else {
        return;
    };
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let first = install(&library, first_dir.path());
    let second = install(&library, second_dir.path());

    let native = NativeModuleLoader::new();
    let a = native.load_module(&first).unwrap();
    let b = native.load_module(&second).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(native.library_count(), 1);
    assert_eq!(native.loaded_modules().len(), 1);
    assert_eq!(b.path(), first.canonicalize().unwrap());
}
