//! Service configuration
//!
//! The configuration record is read once at startup from a JSON source and
//! treated as immutable afterward, with one exception: the allocator selector
//! writes the resolved default kind back so later introspection reflects the
//! effective choice.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Default store file when the configuration leaves `db` empty
pub const DEFAULT_DB_PATH: &str = "brickyard.db";

// =============================================================================
// Configuration Records
// =============================================================================

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Execution backend kind: "mock", "ssh", or "" (defaults to ssh)
    #[serde(default)]
    pub executor: String,

    /// Allocation backend kind: "mock", "simple", or "" (defaults to simple)
    #[serde(default)]
    pub allocator: String,

    /// Path of the metadata store file
    #[serde(default)]
    pub db: String,

    /// Transport settings for the ssh executor
    #[serde(default, rename = "sshexec")]
    pub ssh: SshConfig,

    /// Advanced override: maximum bricks per volume (0 = compiled-in default)
    #[serde(default)]
    pub brick_max_num: u32,

    /// Advanced override: maximum brick size in GB (0 = compiled-in default)
    #[serde(default)]
    pub brick_max_size_gb: u64,

    /// Advanced override: minimum brick size in GB (0 = compiled-in default)
    #[serde(default)]
    pub brick_min_size_gb: u64,
}

/// Transport sub-record for the ssh executor.
///
/// Field validation is the transport's concern, not this core's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_user")]
    pub user: String,
    #[serde(default)]
    pub keyfile: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub sudo: bool,
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            keyfile: String::new(),
            port: default_ssh_port(),
            sudo: false,
        }
    }
}

impl Config {
    /// Parse a configuration record from a JSON reader.
    ///
    /// Unreadable or malformed input is startup-fatal.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| Error::Configuration(format!("unable to read configuration: {}", e)))?;

        serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid configuration: {}", e)))
    }

    /// Effective store file path
    pub fn db_path(&self) -> &str {
        if self.db.is_empty() {
            DEFAULT_DB_PATH
        } else {
            &self.db
        }
    }
}

// =============================================================================
// Brick Limits
// =============================================================================

/// Compiled-in default: maximum bricks per volume
const BRICK_MAX_NUM: u32 = 500;
/// Compiled-in default: maximum brick size, in KB (4 TB)
const BRICK_MAX_SIZE_KB: u64 = 4 * 1024 * 1024 * 1024;
/// Compiled-in default: minimum brick size, in KB (1 GB)
const BRICK_MIN_SIZE_KB: u64 = 1024 * 1024;

/// Bounds consulted when sizing bricks for a volume.
///
/// Constructed exactly once at startup and passed into consumers; there is no
/// mutation path after construction. Sizes are held in KB, converted from the
/// human-facing GB overrides exactly once here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickLimits {
    pub max_bricks_per_volume: u32,
    pub max_brick_size_kb: u64,
    pub min_brick_size_kb: u64,
}

impl Default for BrickLimits {
    fn default() -> Self {
        Self {
            max_bricks_per_volume: BRICK_MAX_NUM,
            max_brick_size_kb: BRICK_MAX_SIZE_KB,
            min_brick_size_kb: BRICK_MIN_SIZE_KB,
        }
    }
}

impl BrickLimits {
    /// Derive effective limits from the configuration.
    ///
    /// A zero (unset) override never replaces the compiled-in default.
    pub fn from_config(config: &Config) -> Self {
        let mut limits = Self::default();

        if config.brick_max_num != 0 {
            tracing::info!("Adv: max bricks per volume set to {}", config.brick_max_num);
            limits.max_bricks_per_volume = config.brick_max_num;
        }
        if config.brick_max_size_gb != 0 {
            tracing::info!("Adv: max brick size {} GB", config.brick_max_size_gb);
            limits.max_brick_size_kb = config.brick_max_size_gb * 1024 * 1024;
        }
        if config.brick_min_size_gb != 0 {
            tracing::info!("Adv: min brick size {} GB", config.brick_min_size_gb);
            limits.min_brick_size_kb = config.brick_min_size_gb * 1024 * 1024;
        }

        limits
    }
}
