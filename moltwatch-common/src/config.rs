//! Configuration loading and data folder resolution

use crate::Result;
use std::path::{Path, PathBuf};

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (MOLTWATCH_DATA)
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(cli_arg: Option<PathBuf>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path;
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("MOLTWATCH_DATA") {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Locate the platform config file, if one exists
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("moltwatch").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/moltwatch/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("moltwatch"))
        .unwrap_or_else(|| PathBuf::from("./moltwatch_data"))
}

/// Path of the SQLite database inside the data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join("moltwatch.db")
}

/// Path of the image upload directory inside the data folder
pub fn uploads_path(data_folder: &Path) -> PathBuf {
    data_folder.join("uploads")
}

/// Create the data folder and uploads directory if missing
pub fn ensure_layout(data_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(data_folder)?;
    std::fs::create_dir_all(uploads_path(data_folder))?;
    Ok(())
}
