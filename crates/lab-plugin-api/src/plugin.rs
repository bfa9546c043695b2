//! Plugin entry point.
//!
//! Dynamic plugins export a single static, [`PluginDeclaration`], under the
//! symbol [`PLUGIN_ENTRY_SYMBOL`]. The [`export_plugin!`](crate::export_plugin)
//! macro writes it. Before calling `register` the host checks the API version,
//! the core version and the build fingerprint. The fingerprint tells apart two
//! builds of this crate with the same version but different features or
//! compiler settings: trait objects and `TypeId`s from such builds do not
//! mix, so a plugin must be built in the same dependency graph as the host.
//!
//! ```rust,ignore
//! use lab_plugin_api::prelude::*;
//!
//! fn module() -> ModuleDescriptor {
//!     ModuleDescriptor::new("omega", env!("CARGO_PKG_VERSION"))
//!         .export(temperature_adapter())
//! }
//!
//! lab_plugin_api::export_plugin!(module);
//! ```

use crate::module::ModuleDescriptor;
use std::any::TypeId;

/// Version of the declaration layout. Bumped on any incompatible change to
/// [`PluginDeclaration`] or the types it hands out.
pub const API_VERSION: u32 = 2;

/// Version of this crate; plugins must be built against the same one the host uses.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the exported declaration symbol, nul-terminated for symbol lookup.
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"lab_plugin_declaration\0";

struct BuildMarker;

/// Identifies this particular build of the API crate.
///
/// Evaluated inside the plugin through [`PluginDeclaration::api_fingerprint`],
/// it equals the host's value only when both link the same compiled crate.
pub fn api_fingerprint() -> TypeId {
    TypeId::of::<BuildMarker>()
}

/// Declaration exported by every dynamic plugin.
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    /// [`API_VERSION`] the plugin was built with.
    pub api_version: u32,
    /// [`CORE_VERSION`] the plugin was built with.
    pub core_version: &'static str,
    /// [`api_fingerprint`] as compiled into the plugin.
    pub api_fingerprint: fn() -> TypeId,
    /// Builds the module descriptor.
    pub register: fn() -> ModuleDescriptor,
}

/// Why a declaration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    /// Different declaration layout.
    ApiVersion,
    /// Different version of this crate.
    CoreVersion,
    /// Same version, different build of this crate.
    Build,
}

impl PluginDeclaration {
    /// Declaration for `register` built against this API crate.
    pub const fn new(register: fn() -> ModuleDescriptor) -> Self {
        Self {
            api_version: API_VERSION,
            core_version: CORE_VERSION,
            api_fingerprint,
            register,
        }
    }

    /// Checks the declaration against the API crate the caller links.
    ///
    /// The API version is checked first; the remaining fields are only
    /// meaningful when the layout matches.
    pub fn check(&self) -> Result<(), Incompatibility> {
        if self.api_version != API_VERSION {
            return Err(Incompatibility::ApiVersion);
        }
        if self.core_version != CORE_VERSION {
            return Err(Incompatibility::CoreVersion);
        }
        if (self.api_fingerprint)() != api_fingerprint() {
            return Err(Incompatibility::Build);
        }
        Ok(())
    }

    /// Whether the plugin was built against this build of the API.
    pub fn is_compatible(&self) -> bool {
        self.check().is_ok()
    }
}

impl std::fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("api_version", &self.api_version)
            .field("core_version", &self.core_version)
            .finish_non_exhaustive()
    }
}

/// Exports a plugin declaration for `register: fn() -> ModuleDescriptor`.
#[macro_export]
macro_rules! export_plugin {
    ($register:path) => {
        #[doc(hidden)]
        #[allow(unsafe_code)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static lab_plugin_declaration: $crate::PluginDeclaration =
            $crate::PluginDeclaration::new($register);
    };
}
