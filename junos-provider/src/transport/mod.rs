//! SSH transport layer wrapping russh.
//!
//! Connects and authenticates to the Junos device and opens the PTY shell
//! channel whose byte stream feeds the CLI driver.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{ShellStream, SshTransport};
