use super::{ConfigDocument, ConfigError};
use crate::shared::fs_atomic::write_atomically;
use std::path::{Path, PathBuf};

pub fn save_config(path: &Path, document: &ConfigDocument) -> Result<PathBuf, ConfigError> {
    let body = document
        .to_yaml_string()
        .map_err(|source| ConfigError::Encode {
            path: path.display().to_string(),
            source,
        })?;
    write_atomically(path, body.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path.to_path_buf())
}
