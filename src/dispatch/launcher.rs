//! Starting the downstream tool

use async_trait::async_trait;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::ExitStatus;
use tracing::debug;

use super::{Invocation, LaunchMode};
use crate::ConfigDriveError;
use crate::search_path::SearchPath;

/// Starts a downstream invocation
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launch `invocation` and return the exit status to propagate
    ///
    /// With [`LaunchMode::Replace`] a real launcher only returns on failure.
    async fn launch(&self, invocation: &Invocation) -> Result<u8, ConfigDriveError>;
}

/// [`Launcher`] that runs the program on this system
pub struct SystemLauncher {
    search_path: SearchPath,
}

impl SystemLauncher {
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new(SearchPath::default())
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation) -> Result<u8, ConfigDriveError> {
        match invocation.mode {
            LaunchMode::Replace => {
                let mut cmd = self.search_path.std_command(&invocation.program)?;
                cmd.args(&invocation.args);
                debug!("Replacing process with {:?}", cmd);
                let err = cmd.exec();
                Err(ConfigDriveError::launch(&invocation.program, err.to_string()))
            }
            LaunchMode::Spawn => {
                let mut cmd = self.search_path.command(&invocation.program)?;
                cmd.args(&invocation.args);
                debug!("Spawning {:?}", cmd);
                let status = cmd
                    .status()
                    .await
                    .map_err(|e| ConfigDriveError::launch(&invocation.program, e.to_string()))?;
                debug!("{} finished with {}", invocation.program, status);
                Ok(exit_code(status))
            }
        }
    }
}

/// Shell convention: the child's code, or 128 + signal number
pub fn exit_code(status: ExitStatus) -> u8 {
    match (status.code(), status.signal()) {
        (Some(code), _) => (code & 0xff) as u8,
        (None, Some(signal)) => (128 + signal).clamp(0, 255) as u8,
        (None, None) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_from_status() {
        // Raw wait status: exit code lives in the second byte
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }

    #[test]
    fn test_exit_code_from_signal() {
        // SIGKILL
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }

    #[tokio::test]
    async fn test_missing_program_is_fatal() {
        let launcher = SystemLauncher::new(SearchPath::new(vec![PathBuf::from("/nonexistent")]));
        let invocation = Invocation {
            program: "glean".to_string(),
            args: vec!["--ssh".to_string()],
            mode: LaunchMode::Replace,
        };
        let result = launcher.launch(&invocation).await;
        assert!(matches!(
            result,
            Err(ConfigDriveError::ProgramNotFound { .. })
        ));
    }
}
