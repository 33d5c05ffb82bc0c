//! Server configuration.
//!
//! Parsed from command-line arguments with environment-variable
//! fallbacks (prefix `MBT_`).

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

/// Read-only MBTiles tile server.
#[derive(Debug, Clone, Parser)]
#[command(name = "mbtilesrv", version, about)]
pub struct Config {
    /// Path to the MBTiles archive to serve.
    #[arg(env = "MBT_FILE")]
    pub file: PathBuf,

    /// Address to bind to.
    #[arg(long, env = "MBT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "MBT_PORT", default_value_t = 10998)]
    pub port: u16,

    /// Watch the archive for changes and reload it in place.
    #[arg(
        long,
        env = "MBT_AUTO_RELOAD",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub auto_reload: bool,

    /// Cache-Control max-age in seconds for tile and grid responses.
    #[arg(long, env = "MBT_CACHE_MAX_AGE", default_value_t = 3600)]
    pub cache_max_age: u32,

    /// Comma-separated list of allowed CORS origins (default: any).
    #[arg(long, env = "MBT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable debug-level logging.
    #[arg(short, long, env = "MBT_VERBOSE")]
    pub verbose: bool,

    /// Disable HTTP request tracing middleware.
    #[arg(long, env = "MBT_NO_TRACING")]
    pub no_tracing: bool,
}

impl Config {
    /// Validate settings that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if !self.file.exists() {
            return Err(format!("archive not found: {}", self.file.display()));
        }
        if let Some(origins) = &self.cors_origins {
            if origins.iter().any(|o| o.trim().is_empty()) {
                return Err("empty CORS origin in list".to_string());
            }
        }
        Ok(())
    }

    /// The socket address to bind the listener to.
    pub fn bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

// =============================================================================
// Tests
// =============================================================================
