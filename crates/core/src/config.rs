use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = "tabula";
pub const CONFIG_DIR_ENV: &str = "TABULA_CONFIG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to create configuration directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write configuration to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordSource {
    #[default]
    EnvVar,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub password_source: PasswordSource,
    #[serde(default)]
    pub keyring_service: Option<String>,
    #[serde(default)]
    pub keyring_account: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl ConnectionProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: 3306,
            user: user.into(),
            database: None,
            password_source: PasswordSource::default(),
            keyring_service: None,
            keyring_account: None,
            read_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_min_column_width")]
    pub min_column_width: usize,
    #[serde(default = "default_max_column_width")]
    pub max_column_width: usize,
    #[serde(default = "default_cell_padding")]
    pub cell_padding: usize,
    #[serde(default = "default_widen_step")]
    pub widen_step: usize,
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            min_column_width: default_min_column_width(),
            max_column_width: default_max_column_width(),
            cell_padding: default_cell_padding(),
            widen_step: default_widen_step(),
            preview_limit: default_preview_limit(),
        }
    }
}

fn default_sample_size() -> usize {
    50
}

fn default_min_column_width() -> usize {
    5
}

fn default_max_column_width() -> usize {
    40
}

fn default_cell_padding() -> usize {
    1
}

fn default_widen_step() -> usize {
    5
}

fn default_preview_limit() -> usize {
    200
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    profiles: Vec<ConnectionProfile>,
    #[serde(default)]
    grid: Option<GridSettings>,
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir).join(CONFIG_FILE_NAME));
    }

    let base = if cfg!(target_os = "windows") {
        env::var_os("APPDATA").map(PathBuf::from)
    } else {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    };

    base.map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::ConfigDirUnavailable)
}

#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
    grid: GridSettings,
}

impl FileConfigStore {
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_path(default_config_path()?)
    }

    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self {
                path,
                profiles: Vec::new(),
                grid: GridSettings::default(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let document: ConfigDocument =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        let mut store = Self {
            path,
            profiles: document.profiles,
            grid: document.grid.unwrap_or_default(),
        };
        store.normalize();
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }

    #[must_use]
    pub fn grid_settings(&self) -> GridSettings {
        self.grid
    }

    pub fn set_grid_settings(&mut self, grid: GridSettings) {
        self.grid = grid;
    }

    pub fn upsert_profile(&mut self, profile: ConnectionProfile) {
        match self
            .profiles
            .iter_mut()
            .find(|existing| existing.name == profile.name)
        {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        self.normalize();
    }

    pub fn delete_profile(&mut self, name: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|profile| profile.name != name);
        before != self.profiles.len()
    }

    pub fn persist(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let document = ConfigDocument {
            profiles: self.profiles.clone(),
            grid: Some(self.grid),
        };
        let serialized = toml::to_string_pretty(&document)?;
        fs::write(&self.path, serialized).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn normalize(&mut self) {
        let mut unique: BTreeMap<String, ConnectionProfile> = BTreeMap::new();
        for profile in self.profiles.drain(..) {
            unique.insert(profile.name.clone(), profile);
        }
        self.profiles = unique.into_values().collect();
    }
}
