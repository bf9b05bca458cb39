//! Uploader configuration file.
//!
//! Stored as TOML:
//! - Linux: `~/.config/zww/uploader.toml`
//! - Windows: `%APPDATA%/zww/uploader.toml`
//!
//! A missing file is created with the defaults.

use std::path::{Path, PathBuf};

use zww_uploader::UploaderConfig;

/// Loads configuration from `path` (or the default location), writing the
/// defaults there first if the file does not exist.
pub fn load(path: Option<&Path>) -> anyhow::Result<UploaderConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    if path.exists() {
        load_from(&path)
    } else {
        let config = UploaderConfig::default();
        save_to(&config, &path)?;
        Ok(config)
    }
}

pub fn load_from(path: &Path) -> anyhow::Result<UploaderConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: UploaderConfig = toml::from_str(&content)?;
    Ok(config)
}

pub fn save_to(config: &UploaderConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    tracing::debug!(path = %path.display(), "configuration saved");
    Ok(())
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("zww").join("uploader.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("zww")
            .join("uploader.toml")
    }
}
