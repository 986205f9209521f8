//! Mock backends for testing
//!
//! In-memory stand-ins for [`BlockProbe`], [`Mounter`] and [`Launcher`], so
//! the locator and dispatcher can be exercised without block devices or root.
//!
//! # Example
//! ```
//! use configdrive_rs::drive::{FilesystemType, Label};
//! use configdrive_rs::mock::MockProbe;
//!
//! let probe = MockProbe::new().with_drive(Label::Upper, "/dev/sr0", FilesystemType::Iso9660);
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::ConfigDriveError;
use crate::dispatch::{Invocation, Launcher};
use crate::drive::{BlockProbe, FilesystemType, Label, MountFailure, MountOptions, Mounter};

/// Mock block device index
///
/// Clones share the recorded queries.
#[derive(Clone, Default)]
pub struct MockProbe {
    drives: HashMap<Label, (PathBuf, FilesystemType)>,
    probe_error: Option<String>,
    queries: Arc<Mutex<Vec<Label>>>,
}

impl MockProbe {
    /// Create a probe that sees no labelled devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device carrying `label`
    pub fn with_drive(mut self, label: Label, device: impl AsRef<Path>, fs_type: FilesystemType) -> Self {
        self.drives
            .insert(label, (device.as_ref().to_path_buf(), fs_type));
        self
    }

    /// Make every query fail as if the probe utility crashed
    pub fn with_probe_error(mut self, error: &str) -> Self {
        self.probe_error = Some(error.to_string());
        self
    }

    /// Labels passed to `has_label`, in order
    pub fn queried_labels(&self) -> Vec<Label> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn check(&self, label: Label) -> Result<(), ConfigDriveError> {
        match &self.probe_error {
            Some(error) => Err(ConfigDriveError::probe(label.as_str(), error.clone())),
            None => Ok(()),
        }
    }

    fn lookup(&self, label: Label) -> Result<&(PathBuf, FilesystemType), ConfigDriveError> {
        self.drives
            .get(&label)
            .ok_or_else(|| ConfigDriveError::probe(label.as_str(), "no such label"))
    }
}

#[async_trait]
impl BlockProbe for MockProbe {
    async fn has_label(&self, label: Label) -> Result<bool, ConfigDriveError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(label);
        }
        self.check(label)?;
        Ok(self.drives.contains_key(&label))
    }

    async fn device_for(&self, label: Label) -> Result<PathBuf, ConfigDriveError> {
        self.check(label)?;
        Ok(self.lookup(label)?.0.clone())
    }

    async fn filesystem_type(&self, label: Label) -> Result<FilesystemType, ConfigDriveError> {
        self.check(label)?;
        Ok(self.lookup(label)?.1.clone())
    }
}

/// A recorded mount call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCall {
    pub device: PathBuf,
    pub target: PathBuf,
    pub options: MountOptions,
}

/// Mock mounter that records calls
///
/// Clones share the recorded calls.
#[derive(Clone, Default)]
pub struct MockMounter {
    failure: Option<MountFailure>,
    calls: Arc<Mutex<Vec<MountCall>>>,
}

impl MockMounter {
    /// Create a mounter whose mounts always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every mount with `failure`
    pub fn with_failure(mut self, failure: MountFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn calls(&self) -> Vec<MountCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mounter for MockMounter {
    async fn mount(
        &self,
        device: &Path,
        target: &Path,
        options: &MountOptions,
    ) -> Result<(), MountFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MountCall {
                device: device.to_path_buf(),
                target: target.to_path_buf(),
                options: *options,
            });
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

/// Launcher that records invocations instead of running them
///
/// Clones share the recorded invocations.
#[derive(Clone)]
pub struct RecordingLauncher {
    exit_code: u8,
    launched: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::with_exit_code(0)
    }

    /// Report `exit_code` for every launch
    pub fn with_exit_code(exit_code: u8) -> Self {
        Self {
            exit_code,
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn launched(&self) -> Vec<Invocation> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, invocation: &Invocation) -> Result<u8, ConfigDriveError> {
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(invocation.clone());
        }
        Ok(self.exit_code)
    }
}
