//! Early-boot variant - runs once before network devices exist
//!
//! Responsibilities:
//! - Mount the config drive if one is attached
//! - Have the downstream tool install SSH keys and the hostname
//! - Leave networking to the per-interface runs that follow
//!
//! With no drive attached nothing is launched at all.

use crate::dispatch::{self, Handoff};
use crate::system::System;
use crate::{ConfigDriveError, Variant};
use tracing::info;

/// Run the early-boot detection and plan the hand-off
pub async fn run(system: &System, forwarded: &[String]) -> Result<Handoff, ConfigDriveError> {
    info!("Early stage: looking for config drive");

    let detection = system.locator().locate().await?;
    if !detection.is_found() {
        info!("Early stage: no config drive, leaving configuration to later runs");
    }

    Ok(dispatch::plan(
        Variant::Early,
        &detection,
        &system.config().downstream,
        forwarded,
    ))
}
