use crate::error::{Error, Result};
use crate::index::types::IndexConfig;
use ahash::RandomState;
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "ngramdex";
const CONFIG_FILE: &str = "config.json";

/// Version of the monolithic cache layout. Bump it whenever the payload
/// changes shape: the version is part of the cache file name, not its bytes.
pub const FORMAT_VERSION: u32 = 1;

impl IndexConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let Ok(config_path) = get_config_path() else {
            return Ok(Self::default());
        };
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| Error::read(path.display().to_string(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.ok_or_else(|| Error::NotFound("app data directory".to_string()))?;
    Ok(base.join(APP_NAME))
}

/// Directory holding monolithic index caches
pub fn cache_dir() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join("cache"))
}

/// Cache file for the index of `root_path`
pub fn cache_path_for(root_path: &Path) -> Result<PathBuf> {
    Ok(cache_dir()?.join(cache_file_name(root_path)))
}

/// File name embedding the format version and a hash of the root.
/// Format: `ngramdex-v{version}-{dir name}-{hash}.bin`
pub fn cache_file_name(root_path: &Path) -> String {
    let canonical = root_path
        .canonicalize()
        .unwrap_or_else(|_| root_path.to_path_buf());
    let path_str = canonical.to_string_lossy();

    let dir_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("root");

    // Sanitize directory name (remove special chars, truncate)
    let sanitized: String = dir_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(16)
        .collect();

    // Fixed seeds keep the name stable across processes
    let hash = RandomState::with_seeds(0, 0, 0, 0).hash_one(&*path_str);

    format!("{}-v{}-{}-{:016x}.bin", APP_NAME, FORMAT_VERSION, sanitized, hash)
}
