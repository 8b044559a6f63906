#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode yaml for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config file {path} must contain a mapping at the top level")]
    NotAMapping { path: String },
    #[error("invalid config section `{section}`: {source}")]
    Section {
        section: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("config path `{path}` crosses non-mapping value at `{segment}`")]
    PathConflict { path: String, segment: String },
    #[error("invalid {expected} value for `{path}`: `{raw}`")]
    InvalidValue {
        path: String,
        expected: String,
        raw: String,
    },
    #[error("failed to resolve home directory for config path")]
    HomeDirectoryUnavailable,
}
