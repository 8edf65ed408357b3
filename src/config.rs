//! Configuration management for the road tile server.
//!
//! This module provides the command line interface:
//! - Command-line arguments via clap
//! - Environment variables with `ROADTILE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use roadtile_server::config::{Cli, Command};
//!
//! // Parse from command line and environment
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.data_dir.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! All serve options can be set via environment variables with the `ROADTILE_` prefix:
//!
//! - `ROADTILE_HOST` - Server bind address (default: 0.0.0.0)
//! - `ROADTILE_PORT` - Server port (default: 3000)
//! - `ROADTILE_DATA_DIR` - Directory of `*.geojson` instance files (default: ./data)
//! - `ROADTILE_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `ROADTILE_MVT_LOCK` - Lock taken for MVT rendering: exclusive or shared
//! - `ROADTILE_STRICT_NOT_FOUND` - Answer unknown instances with 404 for both formats

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::tile::MvtLockPolicy;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default directory holding instance files.
pub const DEFAULT_DATA_DIR: &str = "./data";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Road tile server - serves routing data as GeoJSON and vector tiles.
///
/// Every `*.geojson` file in the data directory is loaded as an instance named
/// after the file. Running without a subcommand starts the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "roadtile-server")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The selected command, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the tile server (default)
    Serve(ServeConfig),

    /// Load the data directory and report what would be served
    Check(CheckConfig),
}

// =============================================================================
// Serve Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ROADTILE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ROADTILE_PORT")]
    pub port: u16,

    // =========================================================================
    // Data Configuration
    // =========================================================================
    /// Directory containing `*.geojson` instance files.
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "ROADTILE_DATA_DIR")]
    pub data_dir: PathBuf,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Lock taken on an instance while rendering MVT tiles.
    #[arg(long, value_enum, default_value_t = MvtLockPolicy::Exclusive, env = "ROADTILE_MVT_LOCK")]
    pub mvt_lock: MvtLockPolicy,

    /// Answer GeoJSON requests for unknown instances with 404 instead of an
    /// empty 204 response.
    #[arg(long, default_value_t = false, env = "ROADTILE_STRICT_NOT_FOUND")]
    pub strict_not_found: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ROADTILE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host is required. Set --host or ROADTILE_HOST".to_string());
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(
                "Data directory is required. Set --data-dir or ROADTILE_DATA_DIR".to_string(),
            );
        }

        if let Some(origins) = &self.cors_origins {
            if let Some(bad) = origins.iter().find(|o| o.parse::<http::HeaderValue>().is_err()) {
                return Err(format!("Invalid CORS origin: {:?}", bad));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Check Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Directory containing `*.geojson` instance files.
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "ROADTILE_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Only report this instance, failing if it is missing.
    #[arg(long)]
    pub instance: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
