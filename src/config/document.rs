use super::settings::{GeneralSettings, ServiceSettings};
use super::{ConfigError, ConfigPath};
use crate::shared::DebugLevel;
use serde_yaml::{Mapping, Value};

const SERVICE_SECTION: &str = "anthropic";
const SETTINGS_SECTION: &str = "settings";

/// The user's configuration as a YAML mapping addressed by dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
}

impl ConfigDocument {
    pub fn from_yaml_str(raw: &str, source_label: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: source_label.to_string(),
            source,
        })?;
        match value {
            Value::Null => Ok(Self::default()),
            Value::Mapping(root) => Ok(Self { root }),
            _ => Err(ConfigError::NotAMapping {
                path: source_label.to_string(),
            }),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.root)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    /// Scalar at `path` rendered as text, as it is substituted into commands.
    pub fn get_text(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(text) => Some(text.clone()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// A path is set when it holds a non-null value other than a blank string.
    pub fn contains(&self, path: &str) -> bool {
        match self.get(path) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        let parsed = ConfigPath::parse(path)?;
        let segments: Vec<&str> = parsed.segments().collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(ConfigError::InvalidPath {
                path: path.to_string(),
                reason: "path must be non-empty".to_string(),
            });
        };

        let mut current = &mut self.root;
        for segment in parents {
            let key = Value::String((*segment).to_string());
            let entry = current
                .entry(key)
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if entry.is_null() {
                *entry = Value::Mapping(Mapping::new());
            }
            current = entry
                .as_mapping_mut()
                .ok_or_else(|| ConfigError::PathConflict {
                    path: path.to_string(),
                    segment: (*segment).to_string(),
                })?;
        }
        current.insert(Value::String((*leaf).to_string()), value);
        Ok(())
    }

    pub fn service(&self) -> Result<ServiceSettings, ConfigError> {
        self.section(SERVICE_SECTION)
    }

    pub fn settings(&self) -> Result<GeneralSettings, ConfigError> {
        self.section(SETTINGS_SECTION)
    }

    /// `settings.debug`, falling back to `None` when unset or unreadable.
    pub fn debug_level(&self) -> DebugLevel {
        self.settings()
            .map(|settings| settings.debug)
            .unwrap_or_default()
    }

    fn section<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.root.get(name) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::Section {
                    section: name.to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_nested_mappings() {
        let document = ConfigDocument::from_yaml_str(
            r#"
project:
  alpha:
    repo: git@example.com:alpha.git
    replicas: 3
    public: false
"#,
            "inline",
        )
        .expect("parse");

        assert_eq!(
            document.get_text("project.alpha.repo").as_deref(),
            Some("git@example.com:alpha.git")
        );
        assert_eq!(document.get_text("project.alpha.replicas").as_deref(), Some("3"));
        assert_eq!(document.get_text("project.alpha.public").as_deref(), Some("false"));
        assert!(document.get_text("project.alpha").is_none());
        assert!(!document.contains("project.beta.repo"));
    }

    #[test]
    fn set_creates_intermediate_mappings() {
        let mut document = ConfigDocument::default();
        document
            .set("project.alpha.repo", Value::from("repo-url"))
            .expect("set");
        assert!(document.contains("project.alpha.repo"));
    }

    #[test]
    fn set_refuses_to_overwrite_scalar_parent() {
        let mut document = ConfigDocument::default();
        document.set("project", Value::from("flat")).expect("set scalar");
        let err = document
            .set("project.alpha", Value::from("nested"))
            .expect_err("scalar parent");
        assert!(matches!(err, ConfigError::PathConflict { .. }));
    }

    #[test]
    fn blank_string_counts_as_unset() {
        let mut document = ConfigDocument::default();
        document.set("anthropic.key", Value::from("  ")).expect("set");
        assert!(!document.contains("anthropic.key"));
    }
}
