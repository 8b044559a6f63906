pub mod document;
pub mod error;
pub mod load;
pub mod paths;
pub mod save;
pub mod settings;
pub mod typed_fields;

pub use document::ConfigDocument;
pub use error::ConfigError;
pub use load::load_config;
pub use paths::{default_root, PlsPaths, CONFIG_FILE_NAME, GLOBAL_STATE_DIR, SKILLS_DIR_NAME};
pub use save::save_config;
pub use settings::{
    core_config_keys, ConfigKey, GeneralSettings, ServiceSettings, DEFAULT_SERVICE_MODEL,
};
pub use typed_fields::{parse_config_value, ConfigPath, ConfigValueType};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn saved_document_loads_back_with_typed_sections() {
        let temp = tempdir().expect("tempdir");
        let paths = PlsPaths::from_root(temp.path());

        let mut document = ConfigDocument::default();
        document
            .set("anthropic.key", serde_yaml::Value::from("sk-test"))
            .expect("set key");
        document
            .set("settings.debug", serde_yaml::Value::from("info"))
            .expect("set debug");
        save_config(&paths.config_file(), &document).expect("save");

        let loaded = load_config(&paths.config_file()).expect("load");
        assert_eq!(loaded, document);
        let service = loaded.service().expect("service");
        assert_eq!(service.key.as_deref(), Some("sk-test"));
        assert_eq!(service.model, DEFAULT_SERVICE_MODEL);
        assert_eq!(
            loaded.settings().expect("settings").debug,
            crate::shared::DebugLevel::Info
        );
    }
}
