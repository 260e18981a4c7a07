//! Device session and configuration transactions.
//!
//! A [`Session`] owns one connection to the device and tracks where it is in
//! the configuration transaction protocol:
//!
//! ```text
//! Idle ──config_lock──► Locked ──config_set──► Modified
//!  ▲                      │                       │
//!  │                      └──────commit_conf──────┤──► Committed ─┐
//!  │                                              └─config_clear─► RolledBack
//!  └─────────────────────────config_unlock────────────────────────┘
//! ```
//!
//! Write paths go through [`ConfigTransaction`], an RAII guard that holds
//! `&mut Session` so nothing else can talk to the device mid-transaction:
//! - `commit()`/`abort()` consume the guard, ensuring single use
//! - a failed commit clears the candidate and releases the lock before
//!   the error is returned

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::device::{CommitReport, Device};
use crate::error::{Result, SessionError};
use crate::setline::show_config_relative;
use crate::transport::SshTransport;

/// Where a session is in the configuration transaction protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Locked,
    Modified,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Idle => "idle",
            TransactionState::Locked => "locked",
            TransactionState::Modified => "modified",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        }
    }

    fn holds_lock(&self) -> bool {
        !matches!(self, TransactionState::Idle)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializes snapshot reads against one device.
///
/// One per [`Client`](super::Client); every session of that client shares it.
#[derive(Debug, Clone, Default)]
pub struct DeviceMutex {
    inner: Arc<Mutex<()>>,
}

/// Held while a snapshot read is in progress.
pub type DeviceGuard = OwnedMutexGuard<()>;

impl DeviceMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    pub async fn acquire(&self) -> DeviceGuard {
        self.inner.clone().lock_owned().await
    }
}

/// Facts gathered from `show version` when the session opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInformation {
    pub host_name: String,
    pub hardware_model: String,
    pub os_name: String,
    pub os_version: String,
}

impl SystemInformation {
    /// Parse `show version` output.
    ///
    /// Cluster members print one block per node; the first value wins.
    pub fn from_show_version(output: &str) -> Self {
        let mut info = SystemInformation {
            os_name: "junos".to_string(),
            ..Default::default()
        };

        for line in output.lines().map(str::trim) {
            if let Some(v) = line.strip_prefix("Hostname:") {
                if info.host_name.is_empty() {
                    info.host_name = v.trim().to_string();
                }
            } else if let Some(v) = line.strip_prefix("Model:") {
                if info.hardware_model.is_empty() {
                    info.hardware_model = v.trim().to_string();
                }
            } else if let Some(v) = line.strip_prefix("Junos:") {
                if info.os_version.is_empty() {
                    info.os_version = v.trim().to_string();
                }
            } else if line.starts_with("JUNOS") && info.os_version.is_empty() {
                // Older releases: "JUNOS Software Release [12.1X46-D40.2]"
                if let (Some(start), Some(end)) = (line.find('['), line.rfind(']')) {
                    if start < end {
                        info.os_version = line[start + 1..end].to_string();
                    }
                }
            }
        }

        info
    }
}

/// One connection to a Junos device.
pub struct Session {
    device: Box<dyn Device>,
    transport: Option<SshTransport>,
    mutex: DeviceMutex,
    state: TransactionState,
    info: SystemInformation,
}

impl Session {
    /// Wrap an opened device and gather its system information.
    pub async fn open(
        mut device: Box<dyn Device>,
        transport: Option<SshTransport>,
        mutex: DeviceMutex,
    ) -> Result<Self> {
        let version = device.command("show version").await?;
        let info = SystemInformation::from_show_version(&version);
        debug!(
            "session opened on {} ({} {})",
            info.host_name, info.hardware_model, info.os_version
        );

        Ok(Self {
            device,
            transport,
            mutex,
            state: TransactionState::Idle,
            info,
        })
    }

    pub fn system_information(&self) -> &SystemInformation {
        &self.info
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The client mutex for snapshot reads.
    pub fn mutex(&self) -> &DeviceMutex {
        &self.mutex
    }

    /// Whether security features (zones, IKE, IPsec) exist on this device.
    pub fn check_compatibility_security(&self) -> bool {
        let model = self.info.hardware_model.to_lowercase();
        model.starts_with("srx") || model.starts_with("vsrx")
    }

    pub fn has_netconf(&self) -> bool {
        self.device.has_netconf()
    }

    /// Run an operational command.
    pub async fn command(&mut self, cmd: &str) -> Result<String> {
        self.device.command(cmd).await
    }

    /// `show configuration <path> | display set relative`.
    pub async fn show_config(&mut self, path: &str) -> Result<String> {
        self.device.command(&show_config_relative(path)).await
    }

    pub async fn config_lock(&mut self) -> Result<()> {
        if self.state != TransactionState::Idle {
            return Err(self.invalid("lock configuration"));
        }
        self.device.config_lock().await?;
        debug!("configuration locked");
        self.state = TransactionState::Locked;
        Ok(())
    }

    pub async fn config_set(&mut self, lines: &[String]) -> Result<()> {
        if !matches!(
            self.state,
            TransactionState::Locked | TransactionState::Modified
        ) {
            return Err(self.invalid("set configuration"));
        }
        self.device.config_set(lines).await?;
        self.state = TransactionState::Modified;
        Ok(())
    }

    pub async fn commit_conf(&mut self, comment: &str) -> Result<CommitReport> {
        if !matches!(
            self.state,
            TransactionState::Locked | TransactionState::Modified
        ) {
            return Err(self.invalid("commit"));
        }
        let report = self.device.commit(comment).await?;
        for warning in &report.warnings {
            warn!("commit '{}': {}", comment, warning);
        }
        debug!("configuration committed: {}", comment);
        self.state = TransactionState::Committed;
        Ok(report)
    }

    pub async fn config_clear(&mut self) -> Result<()> {
        if !self.state.holds_lock() {
            return Err(self.invalid("clear configuration"));
        }
        self.device.config_clear().await?;
        debug!("candidate configuration cleared");
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    pub async fn config_unlock(&mut self) -> Result<()> {
        if !self.state.holds_lock() {
            return Ok(());
        }
        self.device.config_unlock().await?;
        debug!("configuration unlocked");
        self.state = TransactionState::Idle;
        Ok(())
    }

    /// Lock the configuration and start a transaction.
    pub async fn begin(&mut self) -> Result<ConfigTransaction<'_>> {
        self.config_lock().await?;
        Ok(ConfigTransaction {
            session: self,
            consumed: false,
        })
    }

    /// Close the device connection.
    pub async fn close(mut self) -> Result<()> {
        if self.state.holds_lock() {
            warn!("closing session while configuration is {}", self.state);
            self.config_unlock().await?;
        }
        self.device.close().await?;
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    fn invalid(&self, operation: &'static str) -> crate::error::Error {
        SessionError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
        .into()
    }
}

/// RAII guard for a locked configuration.
pub struct ConfigTransaction<'a> {
    session: &'a mut Session,
    consumed: bool,
}

impl ConfigTransaction<'_> {
    /// The underlying session, for checks that query the device mid-transaction.
    pub fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Load lines into the candidate configuration.
    pub async fn set(&mut self, lines: &[String]) -> Result<()> {
        self.session.config_set(lines).await
    }

    /// Commit and unlock.
    ///
    /// On commit failure the candidate is cleared and the lock released
    /// before the commit error is returned.
    pub async fn commit(mut self, comment: &str) -> Result<CommitReport> {
        let report = self.commit_locked(comment).await?;
        self.unlock().await?;
        Ok(report)
    }

    /// Commit but keep the lock, so the committed configuration can be
    /// checked before [`unlock`](Self::unlock).
    ///
    /// On failure the candidate is cleared and the lock released; the
    /// guard then only needs to be dropped.
    pub async fn commit_locked(&mut self, comment: &str) -> Result<CommitReport> {
        match self.session.commit_conf(comment).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.consumed = true;
                self.rollback().await;
                Err(err)
            }
        }
    }

    /// Release the lock after [`commit_locked`](Self::commit_locked).
    pub async fn unlock(mut self) -> Result<()> {
        self.consumed = true;
        self.session.config_unlock().await
    }

    /// Discard changes and unlock.
    pub async fn abort(mut self) -> Result<()> {
        self.consumed = true;
        self.session.config_clear().await?;
        self.session.config_unlock().await
    }

    /// Best-effort clear and unlock after a failure that is already being reported.
    async fn rollback(&mut self) {
        if let Err(e) = self.session.config_clear().await {
            warn!("failed to clear candidate configuration: {}", e);
        }
        if let Err(e) = self.session.config_unlock().await {
            warn!("failed to unlock configuration: {}", e);
        }
    }
}

impl Drop for ConfigTransaction<'_> {
    fn drop(&mut self) {
        if !self.consumed {
            warn!("ConfigTransaction dropped without commit/abort, configuration still locked");
        }
    }
}
