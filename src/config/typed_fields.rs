use super::ConfigError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Dotted configuration path such as `project.alpha.repo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConfigPath(String);

impl ConfigPath {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ConfigError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("path must be non-empty"));
        }
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(invalid("path segments must be non-empty"));
            }
            if !segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            {
                return Err(invalid(
                    "path segments must use only ASCII letters, digits, '-' or '_'",
                ));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl std::fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigValueType {
    #[default]
    String,
    Boolean,
    Number,
}

impl ConfigValueType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(Self::String),
            "boolean" | "bool" => Some(Self::Boolean),
            "number" | "integer" | "int" | "float" => Some(Self::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Number => write!(f, "number"),
        }
    }
}

/// Converts user input into a YAML value of the declared type.
pub fn parse_config_value(
    path: &str,
    raw: &str,
    value_type: ConfigValueType,
) -> Result<Value, ConfigError> {
    let trimmed = raw.trim();
    let invalid = || ConfigError::InvalidValue {
        path: path.to_string(),
        expected: value_type.to_string(),
        raw: raw.to_string(),
    };
    match value_type {
        ConfigValueType::String => Ok(Value::String(trimmed.to_string())),
        ConfigValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "off" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ConfigValueType::Number => {
            if let Ok(integer) = trimmed.parse::<i64>() {
                return Ok(Value::from(integer));
            }
            let float = trimmed.parse::<f64>().map_err(|_| invalid())?;
            if !float.is_finite() {
                return Err(invalid());
            }
            Ok(Value::from(float))
        }
    }
}
