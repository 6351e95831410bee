//! Configuration file access for the conformance suites
//!
//! Property files live in a shared directory (~/.config/conformance/ by
//! default). The directory can be redirected with the
//! `CONFORMANCE_CONFIG_DIR` environment variable, which is how a lab
//! machine points the suites at a per-deployment set of files.
//!
//! Call [`init`] once before the first suite runs to bootstrap the directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "CONFORMANCE_CONFIG_DIR";

/// Initialize the conformance config directory.
///
/// Creates the directory if it doesn't exist and returns its path.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the conformance config directory
///
/// `CONFORMANCE_CONFIG_DIR` wins over the platform default.
pub fn config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|p| p.join("conformance")),
    }
}

/// Get the path to a config file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load a JSON file if it exists, `Ok(None)` otherwise.
///
/// A file that exists but fails to parse is still an error.
pub fn load_json_file_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    load_json_file(path).map(Some)
}

/// Check if a config file exists in the config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Save a value as JSON to a config file in the config directory
pub fn save_json<T: serde::Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = ensure_config_dir()?;
    save_json_file(&dir.join(filename), value)
}

/// Save a value as pretty-printed JSON to an arbitrary path
pub fn save_json_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_is_inside_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        let path = config_path("MS-ASCNTC.json").unwrap();
        assert!(path.starts_with(dir.unwrap()));
        assert!(path.ends_with("MS-ASCNTC.json"));
    }

    #[test]
    fn test_save_and_load_json_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("common.json");

        let mut props = BTreeMap::new();
        props.insert("Domain".to_string(), "contoso.com".to_string());
        props.insert("WaitTime".to_string(), "3000".to_string());
        save_json_file(&path, &props).unwrap();

        let loaded: BTreeMap<String, String> = load_json_file(&path).unwrap();
        assert_eq!(loaded, props);
    }

    #[test]
    fn test_load_json_file_if_exists_missing() {
        let temp = TempDir::new().unwrap();
        let loaded: Option<BTreeMap<String, String>> =
            load_json_file_if_exists(&temp.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_json_file_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_json_file_if_exists::<BTreeMap<String, String>>(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
