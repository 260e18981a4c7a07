//! Junos device access.
//!
//! - [`Device`]: the command/lock/set/commit surface a session drives
//! - [`CliDevice`]: Junos CLI over an interactive SSH shell
//! - [`SetFileDevice`]: writes lines to a local file instead of a device
//! - [`Session`] / [`ConfigTransaction`]: the configuration transaction protocol
//! - [`Client`]: provider-wide connection settings and the shared [`DeviceMutex`]

mod cli;
mod client;
mod device;
#[cfg(test)]
pub(crate) mod fake;
mod session;
mod setfile;

pub use cli::CliDevice;
pub use client::{Client, ClientBuilder, FakeSetFile};
pub use device::{CommitReport, Device};
pub use session::{
    ConfigTransaction, DeviceGuard, DeviceMutex, Session, SystemInformation, TransactionState,
};
pub use setfile::SetFileDevice;
