//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Name of the CLI config file inside the localapps directory
pub const CONFIG_FILE_NAME: &str = "cli-config.json";

/// Storage layout for the CLI
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,

    /// Explicit config file location, when overridden
    config_override: Option<PathBuf>,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            config_override: None,
        }
    }

    /// Use an explicit config file instead of `<base_dir>/cli-config.json`
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_override = Some(path.into());
        self
    }

    /// Get the CLI config file
    pub fn config_file(&self) -> File {
        match &self.config_override {
            Some(path) => File::new(path.clone()),
            None => File::new(self.base_dir.join(CONFIG_FILE_NAME)),
        }
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(config_dir.join("localapps"))
    }
}

// Platform config directory lookup, same rules as the usual user config dir
mod dirs {
    use std::env;
    use std::path::PathBuf;

    #[cfg(target_os = "windows")]
    pub fn config_dir() -> Option<PathBuf> {
        env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(target_os = "macos")]
    pub fn config_dir() -> Option<PathBuf> {
        env::var_os("HOME").map(|home| PathBuf::from(home).join("Library").join("Application Support"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub fn config_dir() -> Option<PathBuf> {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    }
}
