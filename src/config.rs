/// Configuration management for the innovation pipeline
use crate::admin::DEFAULT_LOG_CAPACITY;
use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

/// Where collections live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> PipelineResult<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(PipelineError::Validation(format!("Invalid store backend: {}", s))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Admin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Entries retained in the admin log
    pub log_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_directory = PathBuf::from("./data");
        Self {
            storage: StorageConfig {
                backend: StoreBackend::Sqlite,
                database: data_directory.join("pipeline.sqlite"),
                data_directory,
            },
            admin: AdminConfig {
                log_capacity: DEFAULT_LOG_CAPACITY,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PipelineResult<Self> {
        dotenv::dotenv().ok();

        let data_directory: PathBuf = env::var("PIPELINE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("PIPELINE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("pipeline.sqlite"));
        let backend = StoreBackend::from_str(
            &env::var("PIPELINE_STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string()),
        )?;

        let log_capacity = env::var("PIPELINE_ADMIN_LOG_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_LOG_CAPACITY.to_string())
            .parse()
            .map_err(|_| PipelineError::Validation("Invalid admin log capacity".to_string()))?;

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(PipelineConfig {
            storage: StorageConfig {
                backend,
                data_directory,
                database,
            },
            admin: AdminConfig { log_capacity },
            logging: LoggingConfig { level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PipelineResult<()> {
        if self.admin.log_capacity == 0 {
            return Err(PipelineError::Validation(
                "Admin log capacity must be at least 1".to_string(),
            ));
        }

        if self.storage.backend == StoreBackend::Sqlite
            && self.storage.database.as_os_str().is_empty()
        {
            return Err(PipelineError::Validation(
                "Database location cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.admin.log_capacity, 100);
        assert_eq!(config.storage.database, PathBuf::from("./data/pipeline.sqlite"));
    }

    #[test]
    fn test_zero_capacity_is_invalid() {
        let mut config = PipelineConfig::default();
        config.admin.log_capacity = 0;
        assert!(matches!(config.validate(), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let mut config = PipelineConfig::default();
        config.storage.backend = StoreBackend::Memory;
        config.storage.database = PathBuf::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(StoreBackend::from_str("SQLite").unwrap(), StoreBackend::Sqlite);
        assert_eq!(StoreBackend::from_str("memory").unwrap(), StoreBackend::Memory);
        assert!(StoreBackend::from_str("redis").is_err());
    }
}
