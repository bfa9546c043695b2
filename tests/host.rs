//! Host bootstrap from a configuration file.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs
)]

use labhost::config::HostConfig;
use labhost::loader::module_file_name;
use labhost::{logging, BuiltinModuleLoader, Host, HostError, Lifetime};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("labhost")
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn config_text(omega: &Path) -> String {
    format!(
        r#"
[application]
name = "Bench"
log_level = "warn"
log_format = "compact"

[probing]
fallback_directories = "/opt/lab/shared;/opt/lab/vendor"

[[dependencies]]
name = "Thermometer"
primary_location = "{omega}"
class_name = "omega::TemperatureAdapter"
interface_name = "ISensorAdapter"
auto_load = true

[[dependencies]]
name = "Descriptor"
primary_location = "{omega}"
class_name = "ConcreteDescriptor"
interface_name = "IComponentDescriptor"
auto_load = true
lifetime = 2

[[dependencies]]
name = "DescriptorSet"
primary_location = "/opt/lab/missing/omega.so"
backup_location = "{omega}"
class_name = "GenericDescriptorSet"
interface_name = "IComponentDescriptorSet"
lifetime = "scoped"

[[collections]]
element = "Descriptor"
collection = "DescriptorSet"
"#,
        omega = omega.display()
    )
}

#[test]
fn composes_from_configuration_file() {
    let omega = Path::new("/opt/lab/plugins").join(module_file_name("omega"));
    let file = write_config(&config_text(&omega));

    let config = HostConfig::load_from(file.path()).unwrap();
    logging::init_from_config(&config).unwrap();

    let builtin = Arc::new(BuiltinModuleLoader::new().with_module(&omega, lab_plugin_example::module));
    let host = Host::with_loader(config, builtin.clone()).unwrap();
    let composition = host.compose().unwrap();

    let summaries = composition.summaries();
    let lifetimes: Vec<_> = summaries.iter().map(|s| s.lifetime).collect();
    assert_eq!(
        lifetimes,
        [Lifetime::Singleton, Lifetime::Transient, Lifetime::Scoped]
    );
    assert_eq!(
        summaries[2].implementation,
        "GenericDescriptorSet<ConcreteDescriptor>"
    );
    assert_eq!(composition.context().active_directory(), Path::new("/opt/lab/plugins"));
    assert_eq!(builtin.attempts(Path::new("/opt/lab/missing/omega.so")), 1);

    let json = serde_json::to_value(&summaries).unwrap();
    assert_eq!(json[0]["interface"], "ISensorAdapter");
    assert_eq!(json[1]["lifetime"], "transient");
}

#[test]
fn logging_init_is_idempotent() {
    let config = HostConfig::default();
    assert!(logging::init_from_config(&config).is_ok());
    assert!(logging::init_from_config(&config).is_ok());
}

#[test]
fn unknown_collection_member_fails_validation() {
    let file = write_config(
        r#"
[[collections]]
element = "Nope"
collection = "AlsoNope"
"#,
    );
    let config = HostConfig::load_from(file.path()).unwrap();
    assert!(matches!(
        Host::with_loader(config, Arc::new(BuiltinModuleLoader::new())),
        Err(HostError::Validation(_))
    ));
}

#[test]
fn failed_dependency_aborts_composition() {
    let omega = Path::new("/opt/lab/plugins").join(module_file_name("omega"));
    let file = write_config(&config_text(&omega));
    let config = HostConfig::load_from(file.path()).unwrap();

    let host = Host::with_loader(config, Arc::new(BuiltinModuleLoader::new())).unwrap();
    let err = host.compose().unwrap_err();
    assert!(err.to_string().contains("omega"), "{err}");
}
