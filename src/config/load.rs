use super::{ConfigDocument, ConfigError};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Loads `path`; a missing file is an empty document.
pub fn load_config(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => {
            return Ok(ConfigDocument::default())
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    ConfigDocument::from_yaml_str(&raw, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_document() {
        let temp = tempdir().expect("tempdir");
        let loaded = load_config(&temp.path().join("absent.yaml")).expect("load");
        assert_eq!(loaded, ConfigDocument::default());
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.yaml");
        fs::write(&path, "just a string\n").expect("write");
        let err = load_config(&path).expect_err("scalar root");
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }
}
