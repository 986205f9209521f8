//! Hand-off to the downstream metadata tool
//!
//! Planning is pure: the locator's result and the caller's arguments become a
//! [`Handoff`]. Executing the hand-off is the last thing a run does, see
//! [`execute`].

pub mod launcher;

pub use launcher::{Launcher, SystemLauncher};

use crate::config::DownstreamConfig;
use crate::drive::Detection;
use crate::{ConfigDriveError, Variant};
use tracing::info;

/// Ask the downstream tool to install SSH keys
pub const FLAG_SSH: &str = "--ssh";
/// Ask the downstream tool to set the hostname
pub const FLAG_HOSTNAME: &str = "--hostname";
/// Tell the downstream tool to leave network configuration alone
pub const FLAG_SKIP_NETWORK: &str = "--skip-network";

/// How the downstream tool is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Replace the current process; does not return on success
    Replace,
    /// Run as a child and wait for it
    Spawn,
}

/// A fully built downstream command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path, resolved at launch time
    pub program: String,
    pub args: Vec<String>,
    pub mode: LaunchMode,
}

/// Terminal action of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    Delegate(Invocation),
    /// Nothing to do, exit successfully
    Skip,
}

/// Build the hand-off for `variant`
///
/// Arguments are ordered: drive flags, install-time flags, forwarded
/// arguments.
pub fn plan(
    variant: Variant,
    detection: &Detection,
    downstream: &DownstreamConfig,
    forwarded: &[String],
) -> Handoff {
    let found = detection.is_found();

    let (drive_flags, mode) = match (variant, found) {
        (Variant::Early, false) => return Handoff::Skip,
        (Variant::Early, true) => (
            vec![FLAG_SSH, FLAG_HOSTNAME, FLAG_SKIP_NETWORK],
            LaunchMode::Replace,
        ),
        (Variant::General, true) => (vec![FLAG_SSH, FLAG_HOSTNAME], LaunchMode::Spawn),
        (Variant::General, false) => (Vec::new(), LaunchMode::Spawn),
    };

    let mut args: Vec<String> = drive_flags.iter().map(|f| f.to_string()).collect();
    args.extend(downstream.install_flags());
    args.extend(forwarded.iter().cloned());

    Handoff::Delegate(Invocation {
        program: downstream.program.clone(),
        args,
        mode,
    })
}

/// Carry out the hand-off and return the exit status for this process
pub async fn execute(handoff: &Handoff, launcher: &dyn Launcher) -> Result<u8, ConfigDriveError> {
    match handoff {
        Handoff::Skip => {
            info!("No config drive, nothing to hand off");
            Ok(0)
        }
        Handoff::Delegate(invocation) => {
            info!("Handing off to {} {:?}", invocation.program, invocation.args);
            launcher.launch(invocation).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{DriveLocation, FilesystemType, Label, MountOutcome};
    use std::path::PathBuf;

    fn found() -> Detection {
        Detection::Found {
            location: DriveLocation {
                label: Label::Lower,
                device: PathBuf::from("/dev/sr0"),
                fs_type: FilesystemType::Iso9660,
            },
            mount: MountOutcome::Mounted,
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn delegated(handoff: Handoff) -> Invocation {
        match handoff {
            Handoff::Delegate(invocation) => invocation,
            Handoff::Skip => panic!("Expected Delegate handoff"),
        }
    }

    #[test]
    fn test_general_found() {
        let invocation = delegated(plan(
            Variant::General,
            &found(),
            &DownstreamConfig::default(),
            &args(&["eth0"]),
        ));
        assert_eq!(invocation.program, "glean");
        assert_eq!(invocation.args, args(&["--ssh", "--hostname", "eth0"]));
        assert_eq!(invocation.mode, LaunchMode::Spawn);
    }

    #[test]
    fn test_general_not_found_forwards_only() {
        let forwarded = args(&["--interface", "eth1", "--debug"]);
        let invocation = delegated(plan(
            Variant::General,
            &Detection::NotFound,
            &DownstreamConfig::default(),
            &forwarded,
        ));
        assert_eq!(invocation.args, forwarded);
        assert_eq!(invocation.mode, LaunchMode::Spawn);
    }

    #[test]
    fn test_early_found_replaces_process() {
        let invocation = delegated(plan(
            Variant::Early,
            &found(),
            &DownstreamConfig::default(),
            &args(&["--debug"]),
        ));
        assert_eq!(
            invocation.args,
            args(&["--ssh", "--hostname", "--skip-network", "--debug"])
        );
        assert_eq!(invocation.mode, LaunchMode::Replace);
    }

    #[test]
    fn test_early_not_found_skips() {
        let handoff = plan(
            Variant::Early,
            &Detection::NotFound,
            &DownstreamConfig::default(),
            &args(&["eth0"]),
        );
        assert_eq!(handoff, Handoff::Skip);
    }

    #[test]
    fn test_tolerated_mount_still_counts_as_found() {
        let detection = Detection::Found {
            location: DriveLocation {
                label: Label::Upper,
                device: PathBuf::from("/dev/vdb"),
                fs_type: FilesystemType::Vfat,
            },
            mount: MountOutcome::Tolerated(crate::drive::MountFailure::AlreadyMounted {
                target: PathBuf::from("/mnt/config"),
            }),
        };
        let invocation = delegated(plan(
            Variant::General,
            &detection,
            &DownstreamConfig::default(),
            &[],
        ));
        assert_eq!(invocation.args, args(&["--ssh", "--hostname"]));
    }

    #[test]
    fn test_install_flags_between_drive_flags_and_forwarded() {
        let downstream = DownstreamConfig {
            program: "/usr/local/bin/glean".to_string(),
            use_nm: true,
            no_dhcp_fallback: true,
            ..Default::default()
        };
        let invocation = delegated(plan(Variant::General, &found(), &downstream, &args(&["eth0"])));
        assert_eq!(invocation.program, "/usr/local/bin/glean");
        assert_eq!(
            invocation.args,
            args(&["--ssh", "--hostname", "--use-nm", "--no-dhcp-fallback", "eth0"])
        );
    }
}
