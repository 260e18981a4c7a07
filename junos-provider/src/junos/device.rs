//! The device seam: what a session needs from a Junos connection.

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// `warning:` lines the device printed while committing.
    pub warnings: Vec<String>,
}

/// A connection able to run Junos commands and edit the candidate configuration.
///
/// Implementations translate each call to the transport's wire format. They
/// do not track transaction state; [`Session`](super::Session) does.
#[async_trait]
pub trait Device: Send {
    /// Run an operational command (e.g. `show configuration ... | display set relative`).
    async fn command(&mut self, cmd: &str) -> Result<String>;

    /// Take the exclusive configuration lock.
    async fn config_lock(&mut self) -> Result<()>;

    /// Load `set`/`delete` lines into the candidate configuration.
    async fn config_set(&mut self, lines: &[String]) -> Result<()>;

    /// Discard uncommitted candidate changes.
    async fn config_clear(&mut self) -> Result<()>;

    /// Release the configuration lock.
    async fn config_unlock(&mut self) -> Result<()>;

    /// Commit the candidate configuration with a log comment.
    async fn commit(&mut self, comment: &str) -> Result<CommitReport>;

    /// Whether this connection speaks NETCONF.
    fn has_netconf(&self) -> bool;

    /// Terminate the connection.
    async fn close(&mut self) -> Result<()>;
}
