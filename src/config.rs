//! Process configuration read from the environment (and `.env` via dotenv)

use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Connection parameters for the target store
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: None,
            user: None,
            password: None,
            max_connections: 10,
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let port = match env_var("DB_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| PipelineError::Config(format!("DB_PORT is not a port: {}", p)))?,
            None => defaults.port,
        };
        let max_connections = match env_var("DB_MAX_CONNECTIONS") {
            Some(n) => n.parse().map_err(|_| {
                PipelineError::Config(format!("DB_MAX_CONNECTIONS is not a number: {}", n))
            })?,
            None => defaults.max_connections,
        };

        Ok(Self {
            url: env_var("DATABASE_URL"),
            host: env_var("DB_HOST").unwrap_or(defaults.host),
            port,
            database: env_var("DB_NAME"),
            user: env_var("DB_USER"),
            password: env_var("DB_PASSWORD"),
            max_connections,
        })
    }

    /// `DATABASE_URL` wins over the individual `DB_*` settings.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| PipelineError::Config(format!("invalid DATABASE_URL: {}", e)));
        }

        let database = self
            .database
            .as_deref()
            .ok_or_else(|| PipelineError::Config("DB_NAME is not set".to_string()))?;
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| PipelineError::Config("DB_USER is not set".to_string()))?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(database)
            .username(user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

/// Where the ingestion job reads its batches from
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub api_url: String,
    pub data_dir: PathBuf,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env_var("SOURCE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            data_dir: env_var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}

/// Read API bind address and the schema namespace it serves
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub schema: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env_var("API_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| PipelineError::Config(format!("API_PORT is not a port: {}", p)))?,
            None => 8000,
        };
        Ok(Self {
            host: env_var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            schema: env_var("API_SCHEMA").unwrap_or_else(|| "public".to_string()),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_requires_database_and_user() {
        let config = DbConfig::default();
        assert!(matches!(config.connect_options(), Err(PipelineError::Config(_))));

        let config = DbConfig {
            database: Some("retail".to_string()),
            user: Some("loader".to_string()),
            ..DbConfig::default()
        };
        let options = config.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("retail"));
    }

    #[test]
    fn test_url_takes_precedence() {
        let config = DbConfig {
            url: Some("postgres://u:p@db.internal:6543/warehouse".to_string()),
            ..DbConfig::default()
        };
        let options = config.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
    }
}
