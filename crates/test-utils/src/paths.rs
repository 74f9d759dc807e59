//! Path utilities for locating workspace files from tests.

use std::path::PathBuf;

/// Returns the workspace root directory.
///
/// This is determined by walking up from the test-utils manifest directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the directory holding the shipped preset files.
pub fn config_dir() -> PathBuf {
    workspace_root().join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_has_presets() {
        let dir = config_dir();
        assert!(dir.join("scales.json").exists());
        assert!(dir.join("sources.yaml").exists());
    }
}
