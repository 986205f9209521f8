//! The host a run operates on
//!
//! Bundles the configuration with the backends used to probe, mount and
//! launch, so stages never reach for ambient process state.

use crate::config::WrapperConfig;
use crate::dispatch::{Launcher, SystemLauncher};
use crate::drive::{Blkid, BlockProbe, DriveLocator, Mounter, SystemMount};

pub struct System {
    config: WrapperConfig,
    probe: Box<dyn BlockProbe>,
    mounter: Box<dyn Mounter>,
    launcher: Box<dyn Launcher>,
}

impl System {
    /// Real backends, all restricted to the configured search path
    pub fn from_config(config: WrapperConfig) -> Self {
        let search_path = config.search_path();
        Self {
            probe: Box::new(Blkid::new(config.blkid.clone(), search_path.clone())),
            mounter: Box::new(SystemMount::new(config.mount.clone(), search_path.clone())),
            launcher: Box::new(SystemLauncher::new(search_path)),
            config,
        }
    }

    /// Custom backends (useful for testing)
    pub fn with_backends(
        config: WrapperConfig,
        probe: Box<dyn BlockProbe>,
        mounter: Box<dyn Mounter>,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            config,
            probe,
            mounter,
            launcher,
        }
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn locator(&self) -> DriveLocator<'_> {
        DriveLocator::new(
            self.probe.as_ref(),
            self.mounter.as_ref(),
            &self.config.mount_point,
        )
    }

    pub fn launcher(&self) -> &dyn Launcher {
        self.launcher.as_ref()
    }
}
