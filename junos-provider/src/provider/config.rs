//! Provider block configuration.
//!
//! Every field may be omitted in the provider block and picked up from the
//! environment instead:
//!
//! | field | environment |
//! |---|---|
//! | `ip` | `JUNOS_HOST` |
//! | `port` | `JUNOS_PORT` |
//! | `username` | `JUNOS_USERNAME` |
//! | `password` | `JUNOS_PASSWORD` |
//! | `sshkey_pem` | `JUNOS_SSH_KEY_PEM` |
//! | `sshkey_file` | `JUNOS_SSH_KEY_FILE` |
//! | `keypass` | `JUNOS_KEYPASS` |
//! | `ssh_timeout_to_establish` | `JUNOS_SSH_TIMEOUT_TO_ESTABLISH` |
//! | `command_timeout` | `JUNOS_COMMAND_TIMEOUT` |
//! | `ssh_known_hosts_file` | `JUNOS_SSH_KNOWN_HOSTS_FILE` |
//! | `ssh_host_key_check` | `JUNOS_SSH_HOST_KEY_CHECK` |
//! | `fake_create_set_file` | `JUNOS_FAKECREATE_SETFILE` |
//! | `fake_update_also` | `JUNOS_FAKEUPDATE_ALSO` |
//! | `fake_delete_also` | `JUNOS_FAKEDELETE_ALSO` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::junos::{Client, ClientBuilder, FakeSetFile};
use crate::transport::HostKeyVerification;

const DEFAULT_PORT: u16 = 22;
const DEFAULT_USERNAME: &str = "netconf";
const DEFAULT_SSH_TIMEOUT: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT: u64 = 60;

/// The provider block as decoded from Terraform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sshkey_pem: Option<String>,
    pub sshkey_file: Option<String>,
    pub keypass: Option<String>,
    pub ssh_timeout_to_establish: Option<u64>,
    pub command_timeout: Option<u64>,
    pub ssh_known_hosts_file: Option<String>,
    pub ssh_host_key_check: Option<String>,
    pub fake_create_set_file: Option<String>,
    pub fake_update_also: Option<bool>,
    pub fake_delete_also: Option<bool>,
}

impl ProviderConfig {
    /// Decode the provider block.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(ConfigError::Decode)
            .map_err(Into::into)
    }

    /// Fill unset fields from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|name| std::env::var(name).ok())
    }

    /// Fill unset fields from `lookup` (an environment).
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|v| !v.is_empty());

        fill(&mut self.ip, || env("JUNOS_HOST"));
        fill(&mut self.username, || env("JUNOS_USERNAME"));
        fill(&mut self.password, || env("JUNOS_PASSWORD"));
        fill(&mut self.sshkey_pem, || env("JUNOS_SSH_KEY_PEM"));
        fill(&mut self.sshkey_file, || env("JUNOS_SSH_KEY_FILE"));
        fill(&mut self.keypass, || env("JUNOS_KEYPASS"));
        fill(&mut self.ssh_known_hosts_file, || {
            env("JUNOS_SSH_KNOWN_HOSTS_FILE")
        });
        fill(&mut self.ssh_host_key_check, || env("JUNOS_SSH_HOST_KEY_CHECK"));
        fill(&mut self.fake_create_set_file, || {
            env("JUNOS_FAKECREATE_SETFILE")
        });

        if self.port.is_none() {
            self.port = parse_env(env("JUNOS_PORT"), "port")?;
        }
        if self.ssh_timeout_to_establish.is_none() {
            self.ssh_timeout_to_establish = parse_env(
                env("JUNOS_SSH_TIMEOUT_TO_ESTABLISH"),
                "ssh_timeout_to_establish",
            )?;
        }
        if self.command_timeout.is_none() {
            self.command_timeout = parse_env(env("JUNOS_COMMAND_TIMEOUT"), "command_timeout")?;
        }
        if self.fake_update_also.is_none() {
            self.fake_update_also = parse_bool(env("JUNOS_FAKEUPDATE_ALSO"), "fake_update_also")?;
        }
        if self.fake_delete_also.is_none() {
            self.fake_delete_also = parse_bool(env("JUNOS_FAKEDELETE_ALSO"), "fake_delete_also")?;
        }

        Ok(self)
    }

    /// Check the resolved settings and build a [`Client`].
    pub fn into_client(self) -> Result<Client> {
        let ip = self.ip.ok_or(ConfigError::Missing {
            field: "ip",
            env: "JUNOS_HOST",
        })?;

        let update_also = self.fake_update_also.unwrap_or(false);
        let delete_also = self.fake_delete_also.unwrap_or(false);
        if self.fake_create_set_file.is_none() && (update_also || delete_also) {
            return Err(ConfigError::Invalid {
                field: "fake_update_also",
                message: "fake_update_also and fake_delete_also need fake_create_set_file"
                    .to_string(),
            }
            .into());
        }

        let ssh_timeout = self.ssh_timeout_to_establish.unwrap_or(DEFAULT_SSH_TIMEOUT);
        let command_timeout = self.command_timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT);
        for (field, secs) in [
            ("ssh_timeout_to_establish", ssh_timeout),
            ("command_timeout", command_timeout),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be at least 1 second".to_string(),
                }
                .into());
            }
        }

        let mut builder = ClientBuilder::new(&ip)
            .port(self.port.unwrap_or(DEFAULT_PORT))
            .username(
                self.username
                    .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            )
            .timeout(Duration::from_secs(ssh_timeout))
            .command_timeout(Duration::from_secs(command_timeout));

        builder = match (self.password, self.sshkey_pem, self.sshkey_file) {
            (Some(password), None, None) => builder.password(password),
            (None, Some(pem), None) => builder.private_key_pem(pem, self.keypass),
            (None, None, Some(file)) => builder.private_key_file(expand_home(&file), self.keypass),
            (None, None, None) => {
                return Err(ConfigError::Missing {
                    field: "password, sshkey_pem or sshkey_file",
                    env: "JUNOS_PASSWORD",
                }
                .into());
            }
            _ => {
                return Err(ConfigError::Invalid {
                    field: "password",
                    message: "only one of password, sshkey_pem and sshkey_file can be set"
                        .to_string(),
                }
                .into());
            }
        };

        if let Some(mode) = &self.ssh_host_key_check {
            builder = builder.host_key_verification(HostKeyVerification::from_str(mode)?);
        }
        if let Some(path) = &self.ssh_known_hosts_file {
            builder = builder.known_hosts_path(expand_home(path));
        }
        if let Some(path) = self.fake_create_set_file {
            debug!("fake mode: configuration lines go to {}", path);
            builder = builder.fake_set_file(FakeSetFile {
                path: PathBuf::from(path),
                update_also,
                delete_also,
            });
        }

        builder.build()
    }
}

fn fill<F>(slot: &mut Option<String>, from_env: F)
where
    F: FnOnce() -> Option<String>,
{
    if slot.is_none() {
        *slot = from_env();
    }
}

fn parse_env<T: FromStr>(value: Option<String>, field: &'static str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
            ConfigError::Invalid {
                field,
                message: format!("'{raw}': {e}"),
            }
            .into()
        }),
    }
}

fn parse_bool(value: Option<String>, field: &'static str) -> Result<Option<bool>> {
    match value.as_deref().map(str::trim) {
        None => Ok(None),
        Some("true" | "1" | "t" | "T" | "TRUE" | "True") => Ok(Some(true)),
        Some("false" | "0" | "f" | "F" | "FALSE" | "False") => Ok(Some(false)),
        Some(other) => Err(ConfigError::Invalid {
            field,
            message: format!("'{other}' is not a boolean"),
        }
        .into()),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
