//! Probing context: where dependent modules are searched for.
//!
//! A context holds an ordered list of fallback directories, fixed at
//! construction, and one mutable active directory. The composer points the
//! active directory at the directory of the module it is currently resolving
//! so that modules shipped next to it can be found. There is no history: each
//! resolution attempt overwrites it.
//!
//! No validation is performed; any value is accepted, including empty ones.
//! An empty active directory disables that search branch.

use std::path::{Path, PathBuf};

/// Separator of fallback directories in a search-path string.
pub const SEARCH_PATH_SEPARATOR: char = ';';

/// Search locations for modules referenced by dynamically loaded modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbingContext {
    active_directory: PathBuf,
    fallback_directories: Vec<PathBuf>,
}

impl ProbingContext {
    /// Creates a context with `fallbacks` searched in order and no active directory.
    pub fn new<I, P>(fallbacks: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            active_directory: PathBuf::new(),
            fallback_directories: fallbacks.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a context from a `;`-separated list of directories.
    ///
    /// Empty segments are skipped.
    pub fn from_search_path(search_path: &str) -> Self {
        Self::new(
            search_path
                .split(SEARCH_PATH_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }

    /// Sets the active directory, consuming and returning the context.
    pub fn with_active_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.set_active_directory(directory);
        self
    }

    /// The active directory; empty when unset.
    pub fn active_directory(&self) -> &Path {
        &self.active_directory
    }

    /// Whether an active directory is set.
    pub fn has_active_directory(&self) -> bool {
        !self.active_directory.as_os_str().is_empty()
    }

    /// Overwrites the active directory.
    pub fn set_active_directory(&mut self, directory: impl Into<PathBuf>) {
        self.active_directory = directory.into();
    }

    /// Points the active directory at the directory containing `location`.
    ///
    /// A bare file name yields an empty active directory.
    pub fn set_active_directory_from(&mut self, location: &Path) {
        self.active_directory = location
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
    }

    /// Clears the active directory.
    pub fn clear_active_directory(&mut self) {
        self.active_directory.clear();
    }

    /// Fallback directories in search order.
    pub fn fallback_directories(&self) -> &[PathBuf] {
        &self.fallback_directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_is_split_in_order() {
        let ctx = ProbingContext::from_search_path("bin; lib;;plugins/shared");
        assert_eq!(
            ctx.fallback_directories(),
            [
                PathBuf::from("bin"),
                PathBuf::from("lib"),
                PathBuf::from("plugins/shared")
            ]
        );
        assert!(!ctx.has_active_directory());
    }

    #[test]
    fn active_directory_is_overwritten() {
        let mut ctx = ProbingContext::new(["bin"]).with_active_directory("/plugins/a");
        assert_eq!(ctx.active_directory(), Path::new("/plugins/a"));

        ctx.set_active_directory_from(Path::new("/plugins/b/omega.so"));
        assert_eq!(ctx.active_directory(), Path::new("/plugins/b"));

        ctx.set_active_directory_from(Path::new("omega.so"));
        assert!(!ctx.has_active_directory());

        ctx.set_active_directory("/plugins/c");
        ctx.clear_active_directory();
        assert_eq!(ctx.active_directory(), Path::new(""));
        assert_eq!(ctx.fallback_directories(), [PathBuf::from("bin")]);
    }
}
