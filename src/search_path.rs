//! Restricted program search path
//!
//! Every external program (blkid, mount, the downstream tool) is resolved
//! against an explicit allow-list of directories, and child processes get
//! `PATH` set to that same list whatever the caller's environment holds.

use crate::ConfigDriveError;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Directories searched when no configuration overrides them
pub const DEFAULT_SEARCH_PATH: &[&str] = &["/usr/local/bin", "/bin", "/sbin", "/usr/bin", "/usr/sbin"];

/// Ordered allow-list of executable locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PATH.iter().map(PathBuf::from).collect())
    }
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Value for the `PATH` variable of child processes
    pub fn to_env_value(&self) -> String {
        self.dirs
            .iter()
            .map(|d| d.to_string_lossy())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Resolve a program name to an executable path
    ///
    /// Names containing `/` are taken as paths and only checked for being
    /// executable.
    pub fn resolve(&self, program: &str) -> Result<PathBuf, ConfigDriveError> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            if is_executable(&path) {
                return Ok(path);
            }
        } else if let Some(found) = self
            .dirs
            .iter()
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
        {
            return Ok(found);
        }

        Err(ConfigDriveError::ProgramNotFound {
            program: program.to_string(),
            search_path: self.to_env_value(),
        })
    }

    /// Build an async command for `program` with the restricted `PATH`
    pub fn command(&self, program: &str) -> Result<tokio::process::Command, ConfigDriveError> {
        let mut cmd = tokio::process::Command::new(self.resolve(program)?);
        cmd.env("PATH", self.to_env_value());
        Ok(cmd)
    }

    /// Blocking variant of [`SearchPath::command`], needed for process replacement
    pub fn std_command(&self, program: &str) -> Result<std::process::Command, ConfigDriveError> {
        let mut cmd = std::process::Command::new(self.resolve(program)?);
        cmd.env("PATH", self.to_env_value());
        Ok(cmd)
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
