//! Configuration loading with environment variable support

use crate::pipeline::PipelineConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error when reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Configuration validation trait
pub trait ConfigValidation {
    /// Validate configuration
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivitasConfig {
    /// Directory scanned for interview documents
    pub input_dir: PathBuf,
    /// Directory receiving annotation artifacts and the corpus report
    pub output_dir: PathBuf,
    /// Pipeline knobs
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CivitasConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("interviews"),
            output_dir: PathBuf::from("annotations"),
            pipeline: PipelineConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl CivitasConfig {
    /// Apply `CIVITAS_*` environment variable overrides for the knobs that
    /// commonly vary between runs.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("CIVITAS_INPUT_DIR") {
            self.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CIVITAS_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(value) = std::env::var("CIVITAS_BATCH_SIZE") {
            match value.parse() {
                Ok(n) => self.pipeline.batch_size = n,
                Err(_) => warn!("Ignoring unparsable CIVITAS_BATCH_SIZE: {value}"),
            }
        }
        if let Ok(value) = std::env::var("CIVITAS_WORKERS") {
            match value.parse() {
                Ok(n) => self.pipeline.worker_count = n,
                Err(_) => warn!("Ignoring unparsable CIVITAS_WORKERS: {value}"),
            }
        }
        if let Ok(value) = std::env::var("CIVITAS_BUDGET_USD") {
            match value.parse() {
                Ok(limit) => self.pipeline.budget_limit_usd = Some(limit),
                Err(_) => warn!("Ignoring unparsable CIVITAS_BUDGET_USD: {value}"),
            }
        }
    }
}

impl ConfigValidation for CivitasConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("input_dir".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("output_dir".to_string()));
        }
        self.pipeline.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log level: {other}"
                )))
            }
        }
        Ok(())
    }
}

/// Configuration loader with format detection and search paths
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: vec![PathBuf::from("."), PathBuf::from("config")],
        }
    }

    /// Add a search path
    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from a named file, detecting the format from the
    /// extension and validating the result.
    pub fn load_from_file<T>(&self, filename: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + ConfigValidation,
    {
        let config_path = self.find_config_file(filename)?;
        info!("Loading configuration from: {}", config_path.display());

        let content = std::fs::read_to_string(&config_path)?;
        let format = ConfigFormat::from_extension(&config_path)
            .ok_or_else(|| ConfigError::Validation("Unknown config file format".to_string()))?;

        let config: T = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_with_defaults<T>(&self, filename: &str, defaults: T) -> T
    where
        T: DeserializeOwned + ConfigValidation + Clone,
    {
        match self.load_from_file(filename) {
            Ok(config) => config,
            Err(e) => {
                debug!("No usable configuration file ({e}), using defaults");
                defaults
            }
        }
    }

    /// Find a configuration file in the search paths, trying the known
    /// extensions when the exact name is absent.
    fn find_config_file(&self, filename: &str) -> Result<PathBuf, ConfigError> {
        for search_path in &self.search_paths {
            let config_path = search_path.join(filename);
            if config_path.exists() {
                return Ok(config_path);
            }
        }

        let extensions = ["json", "yaml", "yml", "toml"];
        let base_name = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        for search_path in &self.search_paths {
            for ext in &extensions {
                let config_path = search_path.join(format!("{base_name}.{ext}"));
                if config_path.exists() {
                    return Ok(config_path);
                }
            }
        }

        Err(ConfigError::Validation(format!(
            "Configuration file '{filename}' not found in search paths: {:?}",
            self.search_paths
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_validates() {
        assert!(CivitasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = CivitasConfig::default();
        config.pipeline.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = CivitasConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("civitas.toml"),
            r#"
input_dir = "corpus/in"
output_dir = "corpus/out"

[pipeline]
batch_size = 6
worker_count = 2
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new().add_search_path(dir.path());
        let config: CivitasConfig = loader.load_from_file("civitas.toml").unwrap();
        assert_eq!(config.input_dir, PathBuf::from("corpus/in"));
        assert_eq!(config.pipeline.batch_size, 6);
        assert_eq!(config.pipeline.worker_count, 2);
        // Unspecified knobs keep their defaults
        assert_eq!(config.pipeline.max_retries, 3);
    }

    #[test]
    fn test_format_detection_by_extension_probing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("civitas.yaml"),
            "input_dir: a\noutput_dir: b\n",
        )
        .unwrap();

        let loader = ConfigLoader::new().add_search_path(dir.path());
        // Asking for "civitas" finds civitas.yaml
        let config: CivitasConfig = loader.load_from_file("civitas").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("b"));
    }

    #[test]
    fn test_load_with_defaults_on_missing_file() {
        let loader = ConfigLoader::new().add_search_path("/nonexistent");
        let config = loader.load_with_defaults("missing.toml", CivitasConfig::default());
        assert_eq!(config.input_dir, PathBuf::from("interviews"));
    }
}
