use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".pls";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const SKILLS_DIR_NAME: &str = "skills";
const LOG_FILE: &str = "logs/pls.log";

pub fn default_root() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(GLOBAL_STATE_DIR))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlsPaths {
    root: PathBuf,
}

impl PlsPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_home() -> Result<Self, ConfigError> {
        Ok(Self::from_root(default_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.root.join(SKILLS_DIR_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }
}
