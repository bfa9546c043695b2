//! Module identities.
//!
//! Every module (dynamic library or builtin) is identified by a short name and
//! a version. The full identity string is `"<name>, version=<version>"`, and
//! module references are written in the same form. Only the text before the
//! first comma is used to derive a file name when probing for a module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring marking satellite resource modules. These carry localized
/// resources only and are never resolved by the host.
pub const SATELLITE_RESOURCE_MARKER: &str = ".resources";

/// Name and version of a loadable module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentity {
    /// Short name, also the stem of the module's file name.
    pub name: String,
    /// Version string as declared by the module.
    pub version: String,
}

impl ModuleIdentity {
    /// Creates an identity from a name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Full identity string used for exact matching.
    pub fn full_name(&self) -> String {
        format!("{}, version={}", self.name, self.version)
    }

    /// Extracts the short name from a full identity string.
    ///
    /// Everything before the first comma, trimmed. A string without a comma is
    /// returned trimmed as-is.
    pub fn short_name_of(full_name: &str) -> &str {
        full_name
            .split_once(',')
            .map_or(full_name, |(short, _)| short)
            .trim()
    }

    /// Whether a requested identity names a satellite resource module.
    pub fn is_satellite_resource(full_name: &str) -> bool {
        full_name.contains(SATELLITE_RESOURCE_MARKER)
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, version={}", self.name, self.version)
    }
}
