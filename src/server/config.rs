use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::sessions::connector::DEFAULT_CONNECTOR_URL;
use crate::sessions::telegram::DEFAULT_TELEGRAM_API_URL;
use crate::sessions::waba360::DEFAULT_WABA360_API_URL;
use crate::sessions::ProviderEndpoints;
use crate::webhooks::WebhookSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub backend_url: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub dev_webhook_url: Option<String>,

    #[serde(default = "default_connector_url")]
    pub connector_url: String,

    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    #[serde(default = "default_waba360_api_url")]
    pub waba360_api_url: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_status_locale")]
    pub status_locale: String,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_webhook_max_attempts")]
    pub webhook_max_attempts: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    backend_url: Option<String>,
    environment: Option<String>,
    dev_webhook_url: Option<String>,
    connector_url: Option<String>,
    telegram_api_url: Option<String>,
    waba360_api_url: Option<String>,
    log_dir: Option<String>,
    status_locale: Option<String>,
    queue_capacity: Option<usize>,
    webhook_max_attempts: Option<u32>,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_connector_url() -> String {
    DEFAULT_CONNECTOR_URL.to_string()
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_waba360_api_url() -> String {
    DEFAULT_WABA360_API_URL.to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_status_locale() -> String {
    "pt-BR".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_webhook_max_attempts() -> u32 {
    3
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path) => Self::read_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    /// A missing file is an empty layer, not an error.
    pub fn read_file(path: &Path) -> Result<PartialServerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PartialServerConfig::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            backend_url: env_config
                .backend_url
                .or(file_config.backend_url)
                .ok_or(ConfigError::Missing("BACKEND_URL"))?,
            environment: env_config
                .environment
                .or(file_config.environment)
                .unwrap_or_else(default_environment),
            dev_webhook_url: env_config.dev_webhook_url.or(file_config.dev_webhook_url),
            connector_url: env_config
                .connector_url
                .or(file_config.connector_url)
                .unwrap_or_else(default_connector_url),
            telegram_api_url: env_config
                .telegram_api_url
                .or(file_config.telegram_api_url)
                .unwrap_or_else(default_telegram_api_url),
            waba360_api_url: env_config
                .waba360_api_url
                .or(file_config.waba360_api_url)
                .unwrap_or_else(default_waba360_api_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            status_locale: env_config
                .status_locale
                .or(file_config.status_locale)
                .unwrap_or_else(default_status_locale),
            queue_capacity: env_config
                .queue_capacity
                .or(file_config.queue_capacity)
                .unwrap_or_else(default_queue_capacity),
            webhook_max_attempts: env_config
                .webhook_max_attempts
                .or(file_config.webhook_max_attempts)
                .unwrap_or_else(default_webhook_max_attempts),
        })
    }

    pub fn webhook_settings(&self) -> WebhookSettings {
        WebhookSettings {
            backend_url: self.backend_url.clone(),
            dev_webhook_url: self.dev_webhook_url.clone(),
            environment: self.environment.clone(),
            jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn provider_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            connector_url: self.connector_url.clone(),
            telegram_api_url: self.telegram_api_url.clone(),
            waba360_api_url: self.waba360_api_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn required() -> PartialServerConfig {
        PartialServerConfig {
            database_url: Some("postgres://localhost/tickets".to_string()),
            jwt_secret: Some("secret".to_string()),
            backend_url: Some("https://api.example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = ServerConfig::merge(required(), PartialServerConfig::default()).unwrap();
        assert_eq!(config.environment, "production");
        assert_eq!(config.connector_url, "http://127.0.0.1:8090");
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
        assert_eq!(config.waba360_api_url, "https://waba.360dialog.io");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.status_locale, "pt-BR");
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.webhook_max_attempts, 3);
        assert!(config.dev_webhook_url.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let env = PartialServerConfig {
            environment: Some("dev".to_string()),
            ..required()
        };
        let file = PartialServerConfig {
            environment: Some("staging".to_string()),
            log_dir: Some("/var/log/tickets".to_string()),
            ..Default::default()
        };

        let config = ServerConfig::merge(env, file).unwrap();
        assert_eq!(config.environment, "dev");
        assert_eq!(config.log_dir, "/var/log/tickets");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let env = PartialServerConfig {
            jwt_secret: None,
            ..required()
        };
        let err = ServerConfig::merge(env, PartialServerConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend_url = \"https://file.example.com\"\nqueue_capacity = 16\ndev_webhook_url = \"https://tunnel.example.dev\""
        )
        .unwrap();

        let partial = ServerConfig::read_file(file.path()).unwrap();
        let config = ServerConfig::merge(
            PartialServerConfig {
                backend_url: None,
                ..required()
            },
            partial,
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://file.example.com");
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.dev_webhook_url.as_deref(), Some("https://tunnel.example.dev"));
    }

    #[test]
    fn missing_file_is_an_empty_layer() {
        let partial = ServerConfig::read_file(Path::new("/nonexistent/ticketbridge.toml")).unwrap();
        assert!(partial.backend_url.is_none());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_capacity = \"many\"").unwrap();

        let err = ServerConfig::read_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
