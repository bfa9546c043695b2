//! Built-in resolution strategies.

use super::{Probe, Resolution, ResolutionStrategy};
use lab_plugin_api::ModuleIdentity;

/// The default search order.
pub fn default_strategies() -> Vec<Box<dyn ResolutionStrategy>> {
    vec![
        Box::new(SkipSatelliteResources),
        Box::new(AlreadyLoaded),
        Box::new(FallbackDirectories),
        Box::new(ActiveDirectory),
    ]
}

/// Ends the search for satellite resource modules without touching the
/// filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipSatelliteResources;

impl ResolutionStrategy for SkipSatelliteResources {
    fn name(&self) -> &'static str {
        "skip_satellite_resources"
    }

    fn probe(&self, probe: &Probe<'_>) -> Resolution {
        if ModuleIdentity::is_satellite_resource(probe.requested()) {
            Resolution::Unresolved
        } else {
            Resolution::Continue
        }
    }
}

/// Returns the loaded module whose full identity equals the request exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlreadyLoaded;

impl ResolutionStrategy for AlreadyLoaded {
    fn name(&self) -> &'static str {
        "already_loaded"
    }

    fn probe(&self, probe: &Probe<'_>) -> Resolution {
        probe
            .loader()
            .find_loaded(probe.requested())
            .map_or(Resolution::Continue, Resolution::Resolved)
    }
}

/// Tries `<fallback>/<short>.<ext>` for each fallback directory, in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackDirectories;

impl ResolutionStrategy for FallbackDirectories {
    fn name(&self) -> &'static str {
        "fallback_directories"
    }

    fn probe(&self, probe: &Probe<'_>) -> Resolution {
        probe
            .context()
            .fallback_directories()
            .iter()
            .find_map(|directory| probe.try_directory(directory))
            .map_or(Resolution::Continue, Resolution::Resolved)
    }
}

/// Tries `<active>/<short>.<ext>` when the context has an active directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActiveDirectory;

impl ResolutionStrategy for ActiveDirectory {
    fn name(&self) -> &'static str {
        "active_directory"
    }

    fn probe(&self, probe: &Probe<'_>) -> Resolution {
        let context = probe.context();
        if !context.has_active_directory() {
            return Resolution::Continue;
        }
        probe
            .try_directory(context.active_directory())
            .map_or(Resolution::Continue, Resolution::Resolved)
    }
}
