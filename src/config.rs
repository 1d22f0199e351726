use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::error::StartupError;

/// File name of the SQLite database inside the storage directory.
pub const DB_NAME: &str = "bookmark.db";

/// Environment variable that overrides the storage directory.
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

#[derive(Parser, Debug, Default)]
#[command(author, version = crate::VERSION, about, long_about = None)]
pub struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// gRPC port to bind
    #[arg(long)]
    pub grpc_port: Option<String>,

    /// Host address the gRPC listener binds to
    #[arg(long)]
    pub grpc_host: Option<String>,

    /// Global log level: Debug(-1), Info(0), Warn(1), Error(2), DPanic(3), Panic(4), Fatal(5)
    #[arg(long, allow_negative_numbers = true)]
    pub log_level: Option<i8>,

    /// Directory for JSON log files; stdout only when unset
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Directory holding the SQLite database
    #[arg(long)]
    pub db_path: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub grpc_port: String,
    pub grpc_host: String,
    pub log_level: i8,
    pub log_dir: Option<String>,
    pub db_path: PathBuf,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct PartialServerConfig {
    grpc_port: Option<String>,
    grpc_host: Option<String>,
    log_level: Option<i8>,
    log_dir: Option<String>,
    db_path: Option<String>,
}

fn default_grpc_port() -> String {
    "8080".to_string()
}

fn default_grpc_host() -> String {
    "0.0.0.0".to_string()
}

fn default_db_path() -> String {
    ".".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            grpc_port: default_grpc_port(),
            grpc_host: default_grpc_host(),
            log_level: 0,
            log_dir: None,
            db_path: PathBuf::from(default_db_path()),
        }
    }
}

impl PartialServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ServerConfig {
    /// Loads `.env`, the optional config file and `DATABASE_PATH`, then layers
    /// the command line on top.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match args.config.as_deref() {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };

        Ok(Self::resolve(
            args,
            file_config,
            env::var(DATABASE_PATH_ENV).ok(),
        ))
    }

    /// Flags win over the file. The storage directory is the exception:
    /// `DATABASE_PATH` beats the flag, and the working directory is the last resort.
    pub fn resolve(
        args: &Args,
        file_config: PartialServerConfig,
        database_path_env: Option<String>,
    ) -> Self {
        let db_path = match database_path_env.filter(|value| !value.is_empty()) {
            Some(value) => value,
            None => args
                .db_path
                .clone()
                .or(file_config.db_path)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(default_db_path),
        };

        ServerConfig {
            grpc_port: args
                .grpc_port
                .clone()
                .or(file_config.grpc_port)
                .unwrap_or_else(default_grpc_port),
            grpc_host: args
                .grpc_host
                .clone()
                .or(file_config.grpc_host)
                .unwrap_or_else(default_grpc_host),
            log_level: args.log_level.or(file_config.log_level).unwrap_or(0),
            log_dir: args.log_dir.clone().or(file_config.log_dir),
            db_path: PathBuf::from(db_path),
        }
    }

    /// Parses the configured port. An empty port is rejected before anything
    /// else starts.
    pub fn port(&self) -> Result<u16, StartupError> {
        let port = self.grpc_port.trim();
        if port.is_empty() {
            return Err(StartupError::InvalidPort(self.grpc_port.clone()));
        }
        port.parse::<u16>()
            .map_err(|_| StartupError::InvalidPort(self.grpc_port.clone()))
    }

    pub fn database_file(&self) -> PathBuf {
        self.db_path.join(DB_NAME)
    }
}
