//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults that suit local development.
//!
//! ## Variables
//! - `TILL_HTTP_ADDR` - listen address (default `127.0.0.1:8743`)
//! - `TILL_DB_PATH` - SQLite file path (default under the platform data dir)
//! - `TILL_MEDIA_DIR` - item image directory (default `<data dir>/media`)
//! - `RUST_LOG` - log filtering, handled by the tracing subscriber

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub http_addr: SocketAddr,

    /// Path of the SQLite database file.
    pub database_path: PathBuf,

    /// Directory item images are stored in.
    pub media_dir: PathBuf,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let http_addr = env::var("TILL_HTTP_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8743".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TILL_HTTP_ADDR".to_string()))?;

        let database_path = match env::var("TILL_DB_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_data_dir()?.join("till.db"),
        };

        let media_dir = match env::var("TILL_MEDIA_DIR") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_data_dir()?.join("media"),
        };

        Ok(ServerConfig {
            http_addr,
            database_path,
            media_dir,
        })
    }
}

/// Resolves (and creates) the platform data directory.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.till.pos/`
/// - **Windows**: `%APPDATA%\till\pos\data\`
/// - **Linux**: `~/.local/share/till/`
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "till", "pos").ok_or(ConfigError::NoDataDir)?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine the platform data directory")]
    NoDataDir,

    #[error("Could not prepare the data directory: {0}")]
    Io(#[from] std::io::Error),
}
