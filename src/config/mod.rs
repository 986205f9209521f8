//! Wrapper configuration
//!
//! Settings that would otherwise come from the ambient environment (search
//! path, mount point) plus the install-time flags passed to the downstream
//! tool on every hand-off.

pub mod loader;
pub mod merge;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::search_path::SearchPath;

/// Default mount point for the config drive
pub const DEFAULT_MOUNT_POINT: &str = "/mnt/config";

/// Default downstream metadata tool
pub const DEFAULT_DOWNSTREAM: &str = "glean";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WrapperConfig {
    /// Where the config drive gets mounted
    pub mount_point: PathBuf,

    /// Directories searched for every external program, in order
    pub search_path: Vec<PathBuf>,

    /// Device identification utility
    pub blkid: String,

    /// Mount utility
    pub mount: String,

    /// Downstream tool settings
    pub downstream: DownstreamConfig,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from(DEFAULT_MOUNT_POINT),
            search_path: SearchPath::default().dirs().to_vec(),
            blkid: "blkid".to_string(),
            mount: "mount".to_string(),
            downstream: DownstreamConfig::default(),
        }
    }
}

impl WrapperConfig {
    /// Parse a single YAML document, filling unspecified fields with defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// The configured search path as an allow-list
    pub fn search_path(&self) -> SearchPath {
        SearchPath::new(self.search_path.clone())
    }
}

/// Downstream tool configuration
///
/// The boolean switches mirror the choices made when the wrapper is
/// installed into an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownstreamConfig {
    /// Program name (resolved through the search path) or absolute path
    pub program: String,

    /// Pass `--use-nm` (NetworkManager keyfiles instead of legacy scripts)
    pub use_nm: bool,

    /// Pass `--no-dhcp-fallback`
    pub no_dhcp_fallback: bool,

    /// Pass `--debug`
    pub debug: bool,

    /// Extra arguments appended after the synthesized flags
    pub extra_args: Vec<String>,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_DOWNSTREAM.to_string(),
            use_nm: false,
            no_dhcp_fallback: false,
            debug: false,
            extra_args: Vec::new(),
        }
    }
}

impl DownstreamConfig {
    /// Flags carried by every delegated invocation, in order
    pub fn install_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.use_nm {
            flags.push("--use-nm".to_string());
        }
        if self.no_dhcp_fallback {
            flags.push("--no-dhcp-fallback".to_string());
        }
        if self.debug {
            flags.push("--debug".to_string());
        }
        flags.extend(self.extra_args.iter().cloned());
        flags
    }
}
