//! Set-file device: writes configuration lines to a local file.
//!
//! Used when `fake_create_set_file` is configured. Lines loaded into the
//! candidate are appended to the file on commit; nothing reaches a device.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::device::{CommitReport, Device};
use crate::error::{Result, SessionError};

/// Device that appends committed lines to a file.
#[derive(Debug)]
pub struct SetFileDevice {
    path: PathBuf,
    candidate: Vec<String>,
}

impl SetFileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            candidate: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::SetFile {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl Device for SetFileDevice {
    async fn command(&mut self, _cmd: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn config_lock(&mut self) -> Result<()> {
        Ok(())
    }

    async fn config_set(&mut self, lines: &[String]) -> Result<()> {
        self.candidate.extend_from_slice(lines);
        Ok(())
    }

    async fn config_clear(&mut self) -> Result<()> {
        self.candidate.clear();
        Ok(())
    }

    async fn config_unlock(&mut self) -> Result<()> {
        Ok(())
    }

    async fn commit(&mut self, comment: &str) -> Result<CommitReport> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut text = String::new();
        for line in self.candidate.drain(..) {
            text.push_str(&line);
            text.push('\n');
        }
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        debug!("{} written to {}", comment, self.path.display());
        Ok(CommitReport::default())
    }

    fn has_netconf(&self) -> bool {
        false
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
