//! General variant - runs per network device event or standalone

use crate::dispatch::{self, Handoff};
use crate::system::System;
use crate::{ConfigDriveError, Variant};
use tracing::info;

/// Run detection and plan the hand-off for one invocation
pub async fn run(system: &System, forwarded: &[String]) -> Result<Handoff, ConfigDriveError> {
    info!("General stage: target {:?}", forwarded);

    let detection = system.locator().locate().await?;
    if !detection.is_found() {
        info!("General stage: no config drive, downstream tool falls back on its own");
    }

    Ok(dispatch::plan(
        Variant::General,
        &detection,
        &system.config().downstream,
        forwarded,
    ))
}
