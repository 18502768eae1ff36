//! Scanner configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shared storage root on Android devices.
const STORAGE_ROOT: &str = "/storage/emulated/0";

/// Configuration for discovery and save operations.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct ScannerConfig {
    /// Directories probed by direct path, in order.
    #[builder(default = "default_candidate_dirs()")]
    pub candidate_dirs: Vec<PathBuf>,

    /// Directory holding materialized copies of scoped media.
    #[builder(default = "default_cache_dir()")]
    pub cache_dir: PathBuf,

    /// Directory where saved copies are written.
    #[builder(default = "default_save_dir()")]
    pub save_dir: PathBuf,

    /// File backing the durable key/value store.
    #[builder(default = "default_state_file()")]
    pub state_file: PathBuf,

    /// Prefix for saved file names (`<prefix>_<timestamp>.<ext>`).
    #[builder(default = "\"StatusBox\".to_string()")]
    pub save_prefix: String,

    /// Key under which the scoped handle is remembered.
    #[builder(default = "\"@whatsapp_status_saf_uri\".to_string()")]
    pub handle_key: String,

    /// Deepest recursion level the resolver lists.
    #[builder(default = "5")]
    pub max_resolve_depth: u32,

    /// Folder names that hold status media.
    #[builder(default = "to_strings(&[\".Statuses\", \"Statuses\"])")]
    pub target_names: Vec<String>,

    /// Folder names the resolver descends into.
    #[builder(default = "to_strings(&[\"WhatsApp\", \"Media\"])")]
    pub descend_names: Vec<String>,

    /// App container folders searched when the granted root holds no media.
    #[builder(default = "to_strings(&[\"com.whatsapp\"])")]
    pub container_names: Vec<String>,
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Known status folders: mainline app, business variant, then clones.
fn default_candidate_dirs() -> Vec<PathBuf> {
    [
        "Android/media/com.whatsapp/WhatsApp/Media/Statuses",
        "WhatsApp/Media/.Statuses",
        "Android/media/com.whatsapp.w4b/WhatsApp Business/Media/.Statuses",
        "WhatsApp Business/Media/.Statuses",
        "Android/media/com.whatsapp2/WhatsApp/Media/.Statuses",
        "Android/media/com.whatsapp.clone/WhatsApp/Media/.Statuses",
    ]
    .iter()
    .map(|rel| Path::new(STORAGE_ROOT).join(rel))
    .collect()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("statusbox")
        .join("statuses")
}

fn default_save_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("StatusBox")
}

fn default_state_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("statusbox")
        .join("state.toml")
}

impl ScannerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref prefix) = self.save_prefix {
            if prefix.is_empty() {
                return Err("Save prefix cannot be empty".to_string());
            }
            if prefix.contains(['/', '\\']) {
                return Err("Save prefix cannot contain path separators".to_string());
            }
        }
        if let Some(ref key) = self.handle_key {
            if key.is_empty() {
                return Err("Handle key cannot be empty".to_string());
            }
        }
        if let Some(ref names) = self.target_names {
            if names.is_empty() {
                return Err("At least one target folder name is required".to_string());
            }
        }
        Ok(())
    }
}

impl ScannerConfig {
    /// Create a new scanner config builder.
    pub fn builder() -> ScannerConfigBuilder {
        ScannerConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; fields absent from the file keep
    /// their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("statusbox").join("config.toml"))
    }

    /// Check whether a folder name marks the status target folder.
    pub fn is_target_name(&self, name: &str) -> bool {
        self.target_names.iter().any(|n| n == name)
    }

    /// Check whether the resolver should descend into a folder.
    pub fn is_descend_name(&self, name: &str) -> bool {
        self.descend_names.iter().any(|n| n == name)
    }

    /// Check whether a folder is a known app container.
    pub fn is_container_name(&self, name: &str) -> bool {
        self.container_names.iter().any(|n| n == name)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let builder = ScannerConfigBuilder {
            save_prefix: Some(self.save_prefix.clone()),
            handle_key: Some(self.handle_key.clone()),
            target_names: Some(self.target_names.clone()),
            ..Default::default()
        };
        builder
            .validate()
            .map_err(|message| ConfigError::Invalid { message })
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            candidate_dirs: default_candidate_dirs(),
            cache_dir: default_cache_dir(),
            save_dir: default_save_dir(),
            state_file: default_state_file(),
            save_prefix: "StatusBox".to_string(),
            handle_key: "@whatsapp_status_saf_uri".to_string(),
            max_resolve_depth: 5,
            target_names: to_strings(&[".Statuses", "Statuses"]),
            descend_names: to_strings(&["WhatsApp", "Media"]),
            container_names: to_strings(&["com.whatsapp"]),
        }
    }
}
