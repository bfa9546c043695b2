//! Reference binding and the resolution strategy chain.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs
)]

use labhost::loader::module_file_name;
use labhost::resolution::Probe;
use labhost::{
    BuiltinModuleLoader, DynamicLoader, ModuleLoadError, ModuleLoader, ProbingContext, Resolution,
    ResolutionStrategy,
};
use lab_plugin_api::ModuleDescriptor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const GAMMA: &str = "gamma, version=1.0";

fn gamma() -> ModuleDescriptor {
    ModuleDescriptor::new("gamma", "1.0")
}

fn alpha() -> ModuleDescriptor {
    ModuleDescriptor::new("alpha", "1.0").reference(GAMMA)
}

fn beta() -> ModuleDescriptor {
    ModuleDescriptor::new("beta", "1.0").reference("beta.resources, version=1.0")
}

fn file(directory: &str, short_name: &str) -> PathBuf {
    Path::new(directory).join(module_file_name(short_name))
}

fn loader(builtin: &Arc<BuiltinModuleLoader>) -> DynamicLoader {
    DynamicLoader::new(builtin.clone())
}

#[test]
fn already_loaded_module_is_returned_without_a_new_load() {
    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(file("/shared", "gamma"), gamma));
    let dynamic = loader(&builtin);
    let context = ProbingContext::default();

    let loaded = dynamic.load(&file("/shared", "gamma"), &context).unwrap();
    let attempts = builtin.total_attempts();

    let resolution = dynamic.resolve(GAMMA, &context);
    assert!(Arc::ptr_eq(resolution.module().unwrap(), &loaded));
    assert_eq!(builtin.total_attempts(), attempts);
}

#[test]
fn identity_match_is_exact() {
    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(file("/shared", "gamma"), gamma));
    let dynamic = loader(&builtin);
    let context = ProbingContext::default();
    dynamic.load(&file("/shared", "gamma"), &context).unwrap();

    assert!(dynamic.resolve("gamma, version=2.0", &context).is_unresolved());
}

#[test]
fn satellite_resources_are_never_probed() {
    let builtin = Arc::new(
        BuiltinModuleLoader::new().with_module(file("/shared", "beta.resources"), gamma),
    );
    let dynamic = loader(&builtin);
    let context = ProbingContext::new(["/shared"]).with_active_directory("/shared");

    let resolution = dynamic.resolve("beta.resources, version=1.0", &context);
    assert!(matches!(resolution, Resolution::Unresolved));
    assert_eq!(builtin.total_attempts(), 0);
}

#[test]
fn fallback_directories_are_tried_in_order_before_the_active_directory() {
    let builtin = Arc::new(
        BuiltinModuleLoader::new()
            .with_module(file("/second", "gamma"), gamma)
            .with_module(file("/active", "gamma"), gamma),
    );
    let dynamic = loader(&builtin);
    let context = ProbingContext::new(["/first", "/second"]).with_active_directory("/active");

    let module = dynamic.resolve(GAMMA, &context).module().cloned().unwrap();
    assert_eq!(module.path(), file("/second", "gamma"));
    assert_eq!(builtin.attempts(&file("/first", "gamma")), 1);
    assert_eq!(builtin.attempts(&file("/active", "gamma")), 0);
}

#[test]
fn active_directory_is_the_last_resort() {
    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(file("/active", "gamma"), gamma));
    let dynamic = loader(&builtin);

    let without = ProbingContext::new(["/first"]);
    assert!(dynamic.resolve(GAMMA, &without).is_unresolved());

    let with = without.clone().with_active_directory("/active");
    let module = dynamic.resolve(GAMMA, &with).module().cloned().unwrap();
    assert_eq!(module.identity().full_name(), GAMMA);
    assert_eq!(builtin.attempts(&file("/first", "gamma")), 2);
}

#[test]
fn references_bind_to_siblings_first() {
    let builtin = Arc::new(
        BuiltinModuleLoader::new()
            .with_module(file("/plugins", "alpha"), alpha)
            .with_module(file("/plugins", "gamma"), gamma)
            .with_module(file("/shared", "gamma"), gamma),
    );
    let dynamic = loader(&builtin);
    let context = ProbingContext::new(["/shared"]);

    dynamic.load(&file("/plugins", "alpha"), &context).unwrap();
    assert_eq!(builtin.attempts(&file("/shared", "gamma")), 0);
    assert_eq!(dynamic.loaded_modules().len(), 2);
}

#[test]
fn references_fall_back_to_the_strategies() {
    let builtin = Arc::new(
        BuiltinModuleLoader::new()
            .with_module(file("/plugins", "alpha"), alpha)
            .with_module(file("/shared", "gamma"), gamma),
    );
    let dynamic = loader(&builtin);

    let err = dynamic
        .load(&file("/plugins", "alpha"), &ProbingContext::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ModuleLoadError::UnresolvedReference { ref reference, .. } if reference == GAMMA
    ));

    dynamic
        .load(&file("/plugins", "alpha"), &ProbingContext::new(["/shared"]))
        .unwrap();
    let identities: Vec<_> = dynamic
        .loaded_modules()
        .iter()
        .map(|module| module.identity().full_name())
        .collect();
    assert!(identities.contains(&GAMMA.to_string()));
}

#[test]
fn unresolved_satellite_references_are_optional() {
    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(file("/plugins", "beta"), beta));
    let dynamic = loader(&builtin);

    let module = dynamic
        .load(&file("/plugins", "beta"), &ProbingContext::default())
        .unwrap();
    assert_eq!(module.identity().name, "beta");
    assert_eq!(builtin.total_attempts(), 1);
}

#[derive(Debug)]
struct Deny;

impl ResolutionStrategy for Deny {
    fn name(&self) -> &'static str {
        "deny"
    }

    fn probe(&self, probe: &Probe<'_>) -> Resolution {
        if probe.short_name() == "gamma" {
            Resolution::Unresolved
        } else {
            Resolution::Continue
        }
    }
}

#[test]
fn custom_strategies_short_circuit() {
    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(file("/shared", "gamma"), gamma));
    let mut strategies = labhost::resolution::default_strategies();
    strategies.insert(0, Box::new(Deny));
    let dynamic = DynamicLoader::with_strategies(builtin.clone(), strategies);

    let context = ProbingContext::new(["/shared"]);
    assert!(dynamic.resolve(GAMMA, &context).is_unresolved());
    assert_eq!(builtin.total_attempts(), 0);
    assert_eq!(dynamic.strategies()[0].name(), "deny");
    assert!(builtin.loaded_modules().is_empty());
}
