//! Mounting the config drive
//!
//! The mount itself is delegated to the mount utility. When it fails the
//! kernel mount table is checked so an already-mounted drive (a second
//! invocation racing the first, or a re-run after boot) can be told apart
//! from a real failure in the logs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

use super::{MountFailure, MountOptions};
use crate::search_path::SearchPath;

/// Mount table of the current process
pub const PROC_MOUNTS: &str = "/proc/self/mounts";

/// Something that can mount a block device
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount `device` on `target`; every failure is reported, never raised
    async fn mount(
        &self,
        device: &Path,
        target: &Path,
        options: &MountOptions,
    ) -> Result<(), MountFailure>;
}

/// [`Mounter`] backed by the mount utility
pub struct SystemMount {
    program: String,
    search_path: SearchPath,
    mount_table: PathBuf,
}

impl SystemMount {
    pub fn new(program: impl Into<String>, search_path: SearchPath) -> Self {
        Self {
            program: program.into(),
            search_path,
            mount_table: PathBuf::from(PROC_MOUNTS),
        }
    }

    /// Read mounts from a different table (useful for testing)
    pub fn with_mount_table(mut self, path: impl AsRef<Path>) -> Self {
        self.mount_table = path.as_ref().to_path_buf();
        self
    }

    async fn already_mounted(&self, target: &Path) -> bool {
        match MountTable::load(&self.mount_table).await {
            Ok(table) => table.has_target(target),
            Err(e) => {
                debug!("Could not read {}: {}", self.mount_table.display(), e);
                false
            }
        }
    }
}

impl Default for SystemMount {
    fn default() -> Self {
        Self::new("mount", SearchPath::default())
    }
}

#[async_trait]
impl Mounter for SystemMount {
    async fn mount(
        &self,
        device: &Path,
        target: &Path,
        options: &MountOptions,
    ) -> Result<(), MountFailure> {
        let mut cmd = self
            .search_path
            .command(&self.program)
            .map_err(|e| MountFailure::Spawn {
                message: e.to_string(),
            })?;
        cmd.args(options.to_args()).arg(device).arg(target);
        trace!("Running {:?}", cmd);

        let output = cmd.output().await.map_err(|e| MountFailure::Spawn {
            message: e.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        if self.already_mounted(target).await {
            return Err(MountFailure::AlreadyMounted {
                target: target.to_path_buf(),
            });
        }

        Err(MountFailure::Exited {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub target: PathBuf,
    pub fs_type: String,
    pub options: String,
}

/// Parsed `/proc/self/mounts`
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path).await?))
    }

    /// Parse mount table text; malformed lines are skipped
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                Some(MountEntry {
                    source: unescape(fields.next()?),
                    target: PathBuf::from(unescape(fields.next()?)),
                    fs_type: fields.next()?.to_string(),
                    options: fields.next()?.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn has_target(&self, target: &Path) -> bool {
        self.entries.iter().any(|e| e.target == target)
    }
}

/// Decode the octal escapes (`\040` and friends) the kernel uses for
/// whitespace and backslashes
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
