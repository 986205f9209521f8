//! Config drive detection and mounting
//!
//! The locator looks for a block device labelled `config-2` (or `CONFIG-2`,
//! for filesystems that only store uppercase labels), mounts it with options
//! chosen by filesystem type, and reports what it found. A missing drive is
//! a normal outcome. A failed mount is absorbed and reported as
//! [`MountOutcome::Tolerated`].

pub mod mount;
pub mod probe;

pub use mount::{MountTable, Mounter, SystemMount};
pub use probe::{Blkid, BlockProbe};

use crate::ConfigDriveError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Volume labels identifying a config drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    #[serde(rename = "config-2")]
    Lower,
    #[serde(rename = "CONFIG-2")]
    Upper,
}

impl Label {
    /// Labels in probe order
    pub const ALL: [Label; 2] = [Label::Lower, Label::Upper];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lower => "config-2",
            Self::Upper => "CONFIG-2",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem type reported for the config drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesystemType {
    Vfat,
    Iso9660,
    /// Anything else, including an empty (unreported) type
    Other(String),
}

impl FilesystemType {
    /// Parse the value printed by the probe utility
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "vfat" => Self::Vfat,
            "iso9660" => Self::Iso9660,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Vfat => "vfat",
            Self::Iso9660 => "iso9660",
            Self::Other(s) => s,
        }
    }

    /// Mount options for this filesystem type
    pub fn mount_options(&self) -> MountOptions {
        match self {
            Self::Vfat => MountOptions {
                fs_type: Some("vfat"),
                options: "umask=0077",
            },
            Self::Iso9660 => MountOptions {
                fs_type: Some("iso9660"),
                options: "ro,mode=0700",
            },
            Self::Other(_) => MountOptions {
                fs_type: None,
                options: "rw,mode=0700",
            },
        }
    }
}

impl std::fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(s) if s.is_empty() => f.write_str("<unspecified>"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Serialize for FilesystemType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Options handed to the mount utility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
    /// Explicit filesystem type hint (`-t`), if any
    pub fs_type: Option<&'static str>,
    /// Option string (`-o`)
    pub options: &'static str,
}

impl MountOptions {
    /// Arguments preceding the device and target
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(fs_type) = self.fs_type {
            args.push("-t".to_string());
            args.push(fs_type.to_string());
        }
        args.push("-o".to_string());
        args.push(self.options.to_string());
        args
    }

    pub fn is_read_only(&self) -> bool {
        self.options.split(',').any(|o| o == "ro")
    }
}

/// Why a mount did not happen. Every variant is tolerated by the locator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MountFailure {
    #[error("{} is already mounted", .target.display())]
    AlreadyMounted { target: PathBuf },

    #[error("mount exited with {}: {stderr}", exit_description(.code))]
    Exited { code: Option<i32>, stderr: String },

    #[error("could not run mount: {message}")]
    Spawn { message: String },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

/// Result of the mount step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted,
    Tolerated(MountFailure),
}

impl MountOutcome {
    pub fn is_mounted(&self) -> bool {
        matches!(self, Self::Mounted)
    }
}

/// A located config drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveLocation {
    pub label: Label,
    pub device: PathBuf,
    pub fs_type: FilesystemType,
}

/// Outcome of the full locate-and-mount procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    NotFound,
    Found {
        location: DriveLocation,
        mount: MountOutcome,
    },
}

impl Detection {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Finds and mounts the config drive
pub struct DriveLocator<'a> {
    probe: &'a dyn BlockProbe,
    mounter: &'a dyn Mounter,
    mount_point: &'a Path,
}

impl<'a> DriveLocator<'a> {
    pub fn new(probe: &'a dyn BlockProbe, mounter: &'a dyn Mounter, mount_point: &'a Path) -> Self {
        Self {
            probe,
            mounter,
            mount_point,
        }
    }

    /// First label present on the system, in [`Label::ALL`] order
    pub async fn find_label(&self) -> Result<Option<Label>, ConfigDriveError> {
        for label in Label::ALL {
            debug!("Probing for label {}", label);
            if self.probe.has_label(label).await? {
                info!("Found config drive labelled {}", label);
                return Ok(Some(label));
            }
        }
        debug!("No config drive label present");
        Ok(None)
    }

    /// Detect the drive without touching the mount table
    pub async fn probe(&self) -> Result<Option<DriveLocation>, ConfigDriveError> {
        match self.find_label().await? {
            Some(label) => Ok(Some(self.describe(label).await?)),
            None => Ok(None),
        }
    }

    /// Detect the drive and mount it if present
    pub async fn locate(&self) -> Result<Detection, ConfigDriveError> {
        let Some(label) = self.find_label().await? else {
            return Ok(Detection::NotFound);
        };

        self.ensure_mount_point().await?;
        let location = self.describe(label).await?;
        let mount = self.mount(&location).await;

        Ok(Detection::Found { location, mount })
    }

    async fn describe(&self, label: Label) -> Result<DriveLocation, ConfigDriveError> {
        let device = self.probe.device_for(label).await?;
        let fs_type = self.probe.filesystem_type(label).await?;
        debug!("{} is {} ({})", label, device.display(), fs_type);
        Ok(DriveLocation {
            label,
            device,
            fs_type,
        })
    }

    async fn ensure_mount_point(&self) -> Result<(), ConfigDriveError> {
        fs::create_dir_all(self.mount_point)
            .await
            .map_err(|source| ConfigDriveError::MountPoint {
                path: self.mount_point.to_path_buf(),
                source,
            })
    }

    async fn mount(&self, location: &DriveLocation) -> MountOutcome {
        let options = location.fs_type.mount_options();
        match self
            .mounter
            .mount(&location.device, self.mount_point, &options)
            .await
        {
            Ok(()) => {
                info!(
                    "Mounted {} on {} ({})",
                    location.device.display(),
                    self.mount_point.display(),
                    options.options
                );
                MountOutcome::Mounted
            }
            Err(failure @ MountFailure::AlreadyMounted { .. }) => {
                debug!("Continuing without mount: {}", failure);
                MountOutcome::Tolerated(failure)
            }
            Err(failure) => {
                warn!("Continuing without mount: {}", failure);
                MountOutcome::Tolerated(failure)
            }
        }
    }
}
