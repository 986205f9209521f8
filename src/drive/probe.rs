//! Block device probing
//!
//! Label and filesystem type lookups go through `blkid`, the same utility
//! udev and initramfs scripts use.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::trace;

use super::{FilesystemType, Label};
use crate::ConfigDriveError;
use crate::search_path::SearchPath;

/// blkid exit status when no device matches the search token
const BLKID_NOT_FOUND: i32 = 2;

/// Source of block device metadata
#[async_trait]
pub trait BlockProbe: Send + Sync {
    /// Whether any block device carries `label`
    async fn has_label(&self, label: Label) -> Result<bool, ConfigDriveError>;

    /// Device node for `label`
    async fn device_for(&self, label: Label) -> Result<PathBuf, ConfigDriveError>;

    /// Filesystem type reported for `label`
    async fn filesystem_type(&self, label: Label) -> Result<FilesystemType, ConfigDriveError>;
}

/// [`BlockProbe`] backed by the blkid utility
pub struct Blkid {
    program: String,
    search_path: SearchPath,
}

impl Blkid {
    pub fn new(program: impl Into<String>, search_path: SearchPath) -> Self {
        Self {
            program: program.into(),
            search_path,
        }
    }

    async fn run(&self, label: Label, args: &[String]) -> Result<(Option<i32>, String), ConfigDriveError> {
        trace!("Running {} {:?}", self.program, args);
        let output = self
            .search_path
            .command(&self.program)?
            .args(args)
            .output()
            .await
            .map_err(|e| ConfigDriveError::probe(label.as_str(), e.to_string()))?;

        Ok((
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }

    fn label_token(label: Label) -> String {
        format!("LABEL={}", label)
    }
}

impl Default for Blkid {
    fn default() -> Self {
        Self::new("blkid", SearchPath::default())
    }
}

fn unexpected_status(label: Label, args: &[String], code: Option<i32>) -> ConfigDriveError {
    let status = code.map_or_else(|| "a signal".to_string(), |c| format!("status {}", c));
    ConfigDriveError::probe(
        label.as_str(),
        format!("blkid {} exited with {}", args.join(" "), status),
    )
}

#[async_trait]
impl BlockProbe for Blkid {
    async fn has_label(&self, label: Label) -> Result<bool, ConfigDriveError> {
        let args = vec!["-t".to_string(), Self::label_token(label)];
        match self.run(label, &args).await? {
            (Some(0), _) => Ok(true),
            (Some(BLKID_NOT_FOUND), _) => Ok(false),
            (code, _) => Err(unexpected_status(label, &args, code)),
        }
    }

    async fn device_for(&self, label: Label) -> Result<PathBuf, ConfigDriveError> {
        let args = vec!["-L".to_string(), label.as_str().to_string()];
        let (code, stdout) = self.run(label, &args).await?;
        if code != Some(0) {
            return Err(unexpected_status(label, &args, code));
        }

        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigDriveError::probe(label.as_str(), "blkid printed no device"))
    }

    async fn filesystem_type(&self, label: Label) -> Result<FilesystemType, ConfigDriveError> {
        let args = vec![
            "-t".to_string(),
            Self::label_token(label),
            "-s".to_string(),
            "TYPE".to_string(),
            "-o".to_string(),
            "value".to_string(),
        ];
        let (code, stdout) = self.run(label, &args).await?;
        if code != Some(0) {
            return Err(unexpected_status(label, &args, code));
        }

        Ok(FilesystemType::parse(stdout.lines().next().unwrap_or("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_token() {
        assert_eq!(Blkid::label_token(Label::Lower), "LABEL=config-2");
        assert_eq!(Blkid::label_token(Label::Upper), "LABEL=CONFIG-2");
    }

    #[test]
    fn test_unexpected_status_message() {
        let args = vec!["-L".to_string(), "config-2".to_string()];
        let err = unexpected_status(Label::Lower, &args, Some(4));
        assert_eq!(
            err.to_string(),
            "Block device probe for label 'config-2' failed: blkid -L config-2 exited with status 4"
        );
    }

    #[tokio::test]
    async fn test_missing_blkid_is_fatal() {
        let blkid = Blkid::new("blkid", SearchPath::new(vec![PathBuf::from("/nonexistent")]));
        let result = blkid.has_label(Label::Lower).await;
        assert!(matches!(
            result,
            Err(ConfigDriveError::ProgramNotFound { .. })
        ));
    }
}
