//! Client: how to reach the device, and the sessions opened to it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use secrecy::SecretString;

use super::cli::CliDevice;
use super::session::{DeviceMutex, Session};
use super::setfile::SetFileDevice;
use crate::error::{ConfigError, Result};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport};

/// Where create/update/delete lines go instead of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSetFile {
    pub path: PathBuf,
    pub update_also: bool,
    pub delete_also: bool,
}

enum Connector {
    Ssh(SshConfig),
    #[cfg(test)]
    Fake(super::fake::FakeDevice),
}

/// Provider-wide handle on one Junos device.
///
/// Each resource operation opens its own [`Session`]; sessions of the same
/// client share one [`DeviceMutex`].
pub struct Client {
    connector: Connector,
    command_timeout: Duration,
    fake_set_file: Option<FakeSetFile>,
    mutex: DeviceMutex,
}

impl Client {
    /// Open a CLI session on the device.
    pub async fn start_session(&self) -> Result<Session> {
        match &self.connector {
            Connector::Ssh(ssh) => {
                let transport = SshTransport::connect(ssh).await?;
                let stream = transport.open_shell().await?;
                let device = CliDevice::open(stream, self.command_timeout).await?;
                debug!("cli session started on {}", ssh.socket_addr());
                Session::open(Box::new(device), Some(transport), self.mutex.clone()).await
            }
            #[cfg(test)]
            Connector::Fake(device) => {
                Session::open(Box::new(device.clone()), None, self.mutex.clone()).await
            }
        }
    }

    /// Open a session writing to the fake set file.
    ///
    /// Returns `None` when no set file is configured.
    pub async fn start_set_file_session(&self) -> Result<Option<Session>> {
        let Some(fake) = &self.fake_set_file else {
            return Ok(None);
        };
        let device = SetFileDevice::new(&fake.path);
        Session::open(Box::new(device), None, self.mutex.clone())
            .await
            .map(Some)
    }

    pub fn fake_create_set_file(&self) -> Option<&Path> {
        self.fake_set_file.as_ref().map(|f| f.path.as_path())
    }

    pub fn fake_update_also(&self) -> bool {
        self.fake_set_file.as_ref().is_some_and(|f| f.update_also)
    }

    pub fn fake_delete_also(&self) -> bool {
        self.fake_set_file.as_ref().is_some_and(|f| f.delete_also)
    }

    pub fn mutex(&self) -> &DeviceMutex {
        &self.mutex
    }

    #[cfg(test)]
    pub(crate) fn fake(device: super::fake::FakeDevice, fake_set_file: Option<FakeSetFile>) -> Self {
        Self {
            connector: Connector::Fake(device),
            command_timeout: Duration::from_secs(5),
            fake_set_file,
            mutex: DeviceMutex::new(),
        }
    }
}

/// Builder for a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use junos_provider::junos::ClientBuilder;
///
/// # async fn example() -> Result<(), junos_provider::Error> {
/// let client = ClientBuilder::new("192.0.2.1")
///     .username("terraform")
///     .password("secret")
///     .build()?;
/// let session = client.start_session().await?;
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    host: String,
    port: u16,
    username: String,
    auth: Option<AuthMethod>,
    timeout: Duration,
    command_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    fake_set_file: Option<FakeSetFile>,
}

impl ClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: "netconf".to_string(),
            auth: None,
            timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            fake_set_file: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = Some(AuthMethod::Password(SecretString::from(password.into())));
        self
    }

    pub fn private_key_file(
        mut self,
        path: impl Into<PathBuf>,
        passphrase: Option<String>,
    ) -> Self {
        self.auth = Some(AuthMethod::PrivateKeyFile {
            path: path.into(),
            passphrase: passphrase.map(SecretString::from),
        });
        self
    }

    pub fn private_key_pem(mut self, pem: impl Into<String>, passphrase: Option<String>) -> Self {
        self.auth = Some(AuthMethod::PrivateKeyPem {
            pem: SecretString::from(pem.into()),
            passphrase: passphrase.map(SecretString::from),
        });
        self
    }

    /// Timeout to establish the SSH connection.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout waiting for the prompt after each command.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn fake_set_file(mut self, fake: FakeSetFile) -> Self {
        self.fake_set_file = Some(fake);
        self
    }

    pub fn build(self) -> Result<Client> {
        let auth = self.auth.ok_or(ConfigError::Missing {
            field: "password, sshkey_pem or sshkey_file",
            env: "JUNOS_PASSWORD",
        })?;

        let ssh = SshConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            auth,
            timeout: self.timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok(Client {
            connector: Connector::Ssh(ssh),
            command_timeout: self.command_timeout,
            fake_set_file: self.fake_set_file,
            mutex: DeviceMutex::new(),
        })
    }
}
