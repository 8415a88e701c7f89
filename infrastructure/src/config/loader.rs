//! Configuration file loader with multi-source merging

use super::file_config::{ConfigError, FileConfig};
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use std::path::PathBuf;

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./scholar.toml` or `./.scholar.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/scholar-debate/config.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        for filename in &["scholar.toml", ".scholar.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Built-in defaults, without reading any files
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scholar-debate").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_no_files() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.max_iterations, 3);
        assert!(config.default.is_empty());
    }

    #[test]
    fn test_explicit_path_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_iterations = 5

[default.proposer]
name = "qwen-vl-max"
api_key = "sk-test"
base_url = "https://api.example.com/v1"
temperature = 0.3
"#
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.max_iterations, 5);
        let proposer = config.default.proposer.unwrap();
        assert_eq!(proposer.name, "qwen-vl-max");
        assert_eq!(proposer.temperature, 0.3);
    }

    #[test]
    fn test_subject_table_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[subjects.math.reviewer]
name = "deepseek-chat"
api_key = "sk-r"
base_url = "https://api.deepseek.com/v1"
temperature = 0.1
"#
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&file.path().to_path_buf())).unwrap();
        let math = config.subjects.get("math").unwrap();
        assert_eq!(math.reviewer.as_ref().unwrap().name, "deepseek-chat");
    }
}
