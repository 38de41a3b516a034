//! Host configuration (`host.toml`).
//!
//! Everything the environment dispatcher answers from host policy lives here: directories,
//! user identity, overscan and rotation handling, audio ring size, input limits and
//! preseeded core option values. Missing fields default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::abi::Language;
use crate::error::ConfigError;

/// Host configuration, organized into sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Directories served to the core
    #[serde(default)]
    pub paths: PathsConfig,
    /// User identity
    #[serde(default)]
    pub user: UserConfig,
    /// Video policy
    #[serde(default)]
    pub video: VideoConfig,
    /// Audio ring settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Input limits
    #[serde(default)]
    pub input: InputConfig,
    /// Core option values applied before the core declares its options (key -> value)
    #[serde(default)]
    pub core_options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// GET_SYSTEM_DIRECTORY (default: `<data dir>/system`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_dir: Option<PathBuf>,
    /// GET_SAVE_DIRECTORY (default: `<data dir>/saves`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
    /// GET_CORE_ASSETS_DIRECTORY (default: the content's directory, else unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_assets_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// GET_USERNAME (default: "player")
    #[serde(default = "default_username")]
    pub username: String,
    /// GET_LANGUAGE (default: english)
    #[serde(default)]
    pub language: Language,
}

/// What to do with SET_ROTATION requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Record the rotation and report it to the frame consumer
    #[default]
    Apply,
    /// Refuse SET_ROTATION so the core rotates in software
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// GET_OVERSCAN (default: false, crop overscan)
    #[serde(default)]
    pub overscan: bool,
    /// SET_ROTATION handling (default: apply)
    #[serde(default)]
    pub rotation: RotationMode,
    /// GET_TARGET_REFRESH_RATE in Hz (default: 60.0)
    #[serde(default = "default_refresh_rate")]
    pub target_refresh_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Ring capacity in stereo frames (default: 32768)
    #[serde(default = "default_ring_frames")]
    pub ring_capacity_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// GET_INPUT_MAX_USERS (default: 4, at most 16)
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    /// Answer GET_INPUT_BITMASKS (default: true)
    #[serde(default = "default_true")]
    pub bitmasks: bool,
}

fn default_username() -> String {
    "player".to_string()
}
fn default_refresh_rate() -> f32 {
    60.0
}
fn default_ring_frames() -> usize {
    32768
}
fn default_max_users() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            language: Language::default(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            overscan: false,
            rotation: RotationMode::default(),
            target_refresh_rate: default_refresh_rate(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ring_capacity_frames: default_ring_frames(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_users: default_max_users(),
            bitmasks: default_true(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "retrobridge", "retrobridge")
}

/// Platform configuration directory (`~/.config/retrobridge` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Platform data directory (`~/.local/share/retrobridge` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// `<config dir>/host.toml`
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("host.toml"))
}

impl HostConfig {
    /// Parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn system_dir(&self) -> Option<PathBuf> {
        self.paths
            .system_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("system")))
    }

    pub fn save_dir(&self) -> Option<PathBuf> {
        self.paths
            .save_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("saves")))
    }

    pub fn max_users(&self) -> u32 {
        self.input.max_users.clamp(1, 16)
    }
}
