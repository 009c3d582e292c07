use dirs::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};
use tracing::{debug, trace};

use crate::saved_tokens::DEFAULT_TOKENS_FILE_NAME;
use crate::session::DEFAULT_SESSION_FILE_NAME;

pub const DEFAULT_APPLICATION_ID: &str = "terminus";
pub const DEFAULT_CONFIGURATION_FILE_NAME: &str = "config.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to resolve the configuration directory")]
    FailedToFindConfigurationDirectory,
    #[error("failed to load configuration data, because of: {cause}")]
    FailedToLoadData { cause: Box<dyn std::error::Error> },
    #[error("failed to write configuration data to file, because of: {cause}")]
    FailedToWriteData { cause: Box<dyn std::error::Error> },
    #[error("invalid value {value:?} for {name}")]
    InvalidPropertyValue { name: String, value: String },
}

/// Settings for reaching the platform and storing local state.
///
/// Every field has a default, so a partial YAML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    protocol: String,
    host: String,
    port: u16,
    dashboard_protocol: String,
    dashboard_host: String,
    test_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_dir: Option<PathBuf>,
    page_size: usize,
    timeout_seconds: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "terminus.pantheon.io".to_string(),
            port: 443,
            dashboard_protocol: "https".to_string(),
            dashboard_host: "dashboard.pantheon.io".to_string(),
            test_mode: false,
            cache_dir: None,
            page_size: 100,
            timeout_seconds: 60,
        }
    }
}

impl Configuration {
    pub fn get_default_configuration_file_path() -> Result<PathBuf, ConfigurationError> {
        if let Ok(config_dir_str) = std::env::var("TERMINUS_CONFIG_DIR") {
            let mut config_path = PathBuf::from(config_dir_str);
            config_path.push(DEFAULT_CONFIGURATION_FILE_NAME);
            return Ok(config_path);
        }

        match config_dir() {
            Some(mut path) => {
                path.push(DEFAULT_APPLICATION_ID);
                path.push(DEFAULT_CONFIGURATION_FILE_NAME);
                Ok(path)
            }
            None => Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }
    }

    pub fn load_default() -> Result<Configuration, ConfigurationError> {
        let path = Configuration::get_default_configuration_file_path()?;
        debug!("Loading configuration from {:?}...", path);
        Configuration::load_from_file(path)?.with_environment_overrides()
    }

    /// Load the default configuration, creating the file when none exists yet
    pub fn load_or_create_default() -> Result<Configuration, ConfigurationError> {
        let path = Configuration::get_default_configuration_file_path()?;
        debug!("Loading or creating configuration from {:?}...", path);

        let configuration = if path.exists() {
            Configuration::load_from_file(path)?
        } else {
            debug!("Configuration file not found, creating default configuration");
            let configuration = Configuration::default();
            configuration.save(&path)?;
            configuration
        };

        configuration.with_environment_overrides()
    }

    pub fn load_from_file(path: PathBuf) -> Result<Configuration, ConfigurationError> {
        let content = fs::read_to_string(&path)
            .map_err(|cause| ConfigurationError::FailedToLoadData { cause: Box::new(cause) })?;
        serde_yaml::from_str(&content)
            .map_err(|cause| ConfigurationError::FailedToLoadData { cause: Box::new(cause) })
    }

    pub fn write(&self, writer: Box<dyn Write>) -> Result<(), ConfigurationError> {
        serde_yaml::to_writer(writer, self)
            .map_err(|e| ConfigurationError::FailedToWriteData { cause: Box::new(e) })
    }

    pub fn save(&self, path: &PathBuf) -> Result<(), ConfigurationError> {
        match path.parent() {
            Some(directory) => fs::create_dir_all(directory)
                .map_err(|_| ConfigurationError::FailedToFindConfigurationDirectory)?,
            None => return Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }

        let file = File::create(path)
            .map_err(|e| ConfigurationError::FailedToWriteData { cause: Box::new(e) })?;
        self.write(Box::new(file))
    }

    /// Applies `TERMINUS_*` environment variables on top of the file values
    pub fn with_environment_overrides(self) -> Result<Configuration, ConfigurationError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Configuration, ConfigurationError> {
        if let Some(value) = lookup("TERMINUS_PROTOCOL") {
            self.protocol = value;
        }
        if let Some(value) = lookup("TERMINUS_HOST") {
            self.host = value;
        }
        if let Some(value) = lookup("TERMINUS_PORT") {
            self.port = value
                .parse()
                .map_err(|_| ConfigurationError::InvalidPropertyValue {
                    name: "TERMINUS_PORT".to_string(),
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("TERMINUS_DASHBOARD_PROTOCOL") {
            self.dashboard_protocol = value;
        }
        if let Some(value) = lookup("TERMINUS_DASHBOARD_HOST") {
            self.dashboard_host = value;
        }
        if let Some(value) = lookup("TERMINUS_TEST_MODE") {
            self.test_mode = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(value) = lookup("TERMINUS_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(value));
        }
        trace!("Effective configuration: {:?}", self);
        Ok(self)
    }

    pub fn api_base_url(&self) -> String {
        format!("{}://{}:{}/api/", self.protocol, self.host, self.port)
    }

    pub fn dashboard_protocol(&self) -> &str {
        &self.dashboard_protocol
    }

    pub fn dashboard_host(&self) -> &str {
        &self.dashboard_host
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn set_cache_dir(&mut self, cache_dir: PathBuf) {
        self.cache_dir = Some(cache_dir);
    }

    /// Directory holding saved tokens and the session
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(cache_dir) => cache_dir.clone(),
            None => home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".terminus")
                .join("cache"),
        }
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.cache_dir().join(DEFAULT_TOKENS_FILE_NAME)
    }

    pub fn session_path(&self) -> PathBuf {
        self.cache_dir().join(DEFAULT_SESSION_FILE_NAME)
    }
}
