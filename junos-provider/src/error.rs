//! Error types for junos-provider.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for junos-provider operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device session and configuration transaction errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Provider configuration errors
    #[error("Provider configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A resource attribute could not be turned into configuration lines
    #[error("{0}")]
    Path(#[from] PathError),

    /// A resource precondition does not hold (already exists, missing dependency)
    #[error("{0}")]
    Check(String),

    /// Device output could not be turned back into resource data
    #[error("Failed to parse '{line}': {message}")]
    Parse { line: String, message: String },

    /// Terraform state could not be decoded or encoded
    #[error("State error: {0}")]
    State(#[from] serde_json::Error),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key is not present in known_hosts (strict checking)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts file could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (prompt matching on the CLI stream).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt was not seen within the timeout
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Stream reached EOF while waiting for the prompt
    #[error("Channel closed")]
    Closed,

    /// Read or write on the stream failed
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session and configuration transaction errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The exclusive configuration lock is held by someone else
    #[error("Failed to lock configuration database: {message}")]
    LockFailed { message: String },

    /// The device rejected a configuration line
    #[error("Failed to set configuration line '{line}': {message}")]
    ConfigSet { line: String, message: String },

    /// The device rejected the candidate configuration
    #[error("Commit failed: {message}")]
    Commit { message: String },

    /// The device returned an error for an operational command
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Transaction operation called from the wrong state
    #[error("Invalid transaction state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The set file used in fake mode could not be written
    #[error("Failed to write set file {path}: {source}")]
    SetFile {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Provider configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting has no value from the config block nor the environment
    #[error("Missing required setting '{field}' (or environment variable {env})")]
    Missing {
        field: &'static str,
        env: &'static str,
    },

    /// A setting has a value that cannot be used
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    /// The provider block could not be decoded
    #[error("Failed to decode provider configuration: {0}")]
    Decode(#[from] serde_json::Error),
}

/// An error attributed to a schema attribute path (e.g. `family.inet_range`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct PathError {
    /// Dotted attribute path within the resource schema.
    pub path: String,
    /// Human readable message.
    pub message: String,
}

impl PathError {
    /// Create a new path error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using junos-provider's Error.
pub type Result<T> = std::result::Result<T, Error>;
