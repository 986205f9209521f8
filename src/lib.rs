//! configdrive-rs library
//!
//! Boot-time wrapper that finds an attached configuration drive (an ISO9660
//! or vfat volume labelled `config-2`), mounts it, and hands control to the
//! downstream metadata tool that applies hostname, SSH keys and networking.
//!
//! # Design Principles
//!
//! - **No ambient state**: search path, mount point and downstream flags are
//!   explicit configuration
//! - **Absence is normal**: a missing drive or an already-mounted drive
//!   never fails the run
//! - **Hand-off is terminal**: planning returns a [`Handoff`] value that only
//!   `main` executes

pub mod config;
pub mod dispatch;
pub mod drive;
pub mod mock;
pub mod search_path;
pub mod stages;
pub mod system;

mod error;

pub use dispatch::Handoff;
pub use error::ConfigDriveError;
pub use system::System;

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use drive::{FilesystemType, Label};

/// Entry-point variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Early boot - runs once before network devices are enumerable
    /// Handles: mount, SSH keys, hostname; skips networking
    Early,
    /// General - runs per network interface event or standalone
    /// Handles: mount, SSH keys, hostname, the invocation's interface
    General,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Early => write!(f, "early"),
            Variant::General => write!(f, "general"),
        }
    }
}

/// Detect, mount and plan the hand-off for `variant`
pub async fn plan_variant(
    variant: Variant,
    system: &System,
    forwarded: &[String],
) -> Result<Handoff, ConfigDriveError> {
    match variant {
        Variant::Early => stages::early::run(system, forwarded).await,
        Variant::General => stages::general::run(system, forwarded).await,
    }
}

/// Run `variant` to completion and return the process exit status
///
/// On the early path with a drive present this does not return unless the
/// process could not be replaced.
pub async fn run_variant(
    variant: Variant,
    system: &System,
    forwarded: &[String],
) -> Result<u8, ConfigDriveError> {
    info!("Starting {} run", variant);
    let handoff = plan_variant(variant, system, forwarded).await?;
    dispatch::execute(&handoff, system.launcher()).await
}

/// What `detect` found, printed as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveReport {
    pub found: bool,
    pub label: Option<Label>,
    pub device: Option<PathBuf>,
    pub fs_type: Option<FilesystemType>,
    pub mount_point: PathBuf,
}

/// Probe for the config drive without mounting it
pub async fn detect(system: &System) -> Result<DriveReport, ConfigDriveError> {
    let location = system.locator().probe().await?;
    let mount_point = system.config().mount_point.clone();

    Ok(match location {
        Some(location) => DriveReport {
            found: true,
            label: Some(location.label),
            device: Some(location.device),
            fs_type: Some(location.fs_type),
            mount_point,
        },
        None => DriveReport {
            found: false,
            label: None,
            device: None,
            fs_type: None,
            mount_point,
        },
    })
}
