//! Error types for configdrive-rs
//!
//! Everything here is fatal: the run aborts with a non-zero exit status.
//! Mount failures are deliberately not part of this enum, see
//! [`crate::drive::MountFailure`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for configdrive-rs operations
#[derive(Error, Debug)]
pub enum ConfigDriveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Block device probe for label '{label}' failed: {message}")]
    Probe { label: String, message: String },

    #[error("Failed to create mount point {}: {source}", .path.display())]
    MountPoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Program '{program}' not found in search path {search_path}")]
    ProgramNotFound { program: String, search_path: String },

    #[error("Failed to launch '{program}': {message}")]
    Launch { program: String, message: String },
}

impl ConfigDriveError {
    /// Create a probe error
    pub fn probe(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Probe {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Create a launch error
    pub fn launch(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_names_label() {
        let err = ConfigDriveError::probe("config-2", "blkid exited with status 4");
        assert_eq!(
            err.to_string(),
            "Block device probe for label 'config-2' failed: blkid exited with status 4"
        );
    }

    #[test]
    fn test_mount_point_error_display() {
        let err = ConfigDriveError::MountPoint {
            path: PathBuf::from("/mnt/config"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("Failed to create mount point /mnt/config"));
    }
}
