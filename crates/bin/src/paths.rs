//! Default file locations.

use std::path::PathBuf;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/fairlens/`
/// - macOS: `~/Library/Caches/fairlens/`
/// - Windows: `%LOCALAPPDATA%\fairlens\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fairlens")
}

/// Where precomputed metrics for a dataset go when no output is given.
pub(crate) fn default_precomputed_path(dataset: &str) -> PathBuf {
    default_cache_dir().join(format!("{}-metrics.json", dataset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precomputed_path_is_under_cache_dir() {
        let path = default_precomputed_path("cohort");
        assert!(path.starts_with(default_cache_dir()));
        assert_eq!(path.file_name().unwrap(), "cohort-metrics.json");
    }
}
