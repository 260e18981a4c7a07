//! `junos_system_login_user`: `system login user <name>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssh_key::{Algorithm, PublicKey};

use super::{flag, parse_output};
use crate::diag::Diagnostics;
use crate::error::{PathError, Result};
use crate::junos::Session;
use crate::lifecycle::{PrivateState, Resource, ResourceData};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::setline::{ConfigItem, SetLines, quote};

const ENCRYPTED_PASSWORD: &str = "encrypted_password";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginUserAuthentication {
    pub encrypted_password: Option<String>,
    pub no_public_keys: Option<bool>,
    pub ssh_public_keys: Option<Vec<String>>,
    pub plain_text_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginUserData {
    pub id: Option<String>,
    pub name: String,
    pub class: String,
    pub uid: Option<i64>,
    pub full_name: Option<String>,
    pub cli_prompt: Option<String>,
    pub authentication: Option<LoginUserAuthentication>,
}

/// Keyword Junos uses for a public key of this algorithm.
fn key_keyword(key: &str) -> std::result::Result<&'static str, String> {
    let parsed = PublicKey::from_openssh(key).map_err(|e| e.to_string())?;
    match parsed.algorithm() {
        Algorithm::Rsa { .. } => Ok("ssh-rsa"),
        Algorithm::Ecdsa { .. } => Ok("ssh-ecdsa"),
        Algorithm::Ed25519 => Ok("ssh-ed25519"),
        Algorithm::Dsa => Ok("ssh-dsa"),
        other => Err(format!("unsupported key type {}", other.as_str())),
    }
}

impl LoginUserData {
    /// Parse `show configuration system login user <name> | display set relative`.
    pub fn from_output(name: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            name: name.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("class") => self.class = item.take_value()?,
            Some("uid") => self.uid = Some(item.take_int()?),
            Some("full-name") => self.full_name = Some(item.take_value()?),
            Some("cli") => {
                if item.strip(&["prompt"]) {
                    self.cli_prompt = Some(item.take_value()?);
                }
            }
            Some("authentication") => {
                let auth = self.authentication.get_or_insert_with(Default::default);
                match item.next_segment().as_deref() {
                    Some("encrypted-password") => {
                        auth.encrypted_password = Some(item.take_value()?)
                    }
                    Some("no-public-keys") => auth.no_public_keys = Some(true),
                    Some("ssh-rsa" | "ssh-ecdsa" | "ssh-ed25519" | "ssh-dsa") => {
                        let key = item.take_value()?;
                        auth.ssh_public_keys.get_or_insert_with(Vec::new).push(key);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl ResourceData for LoginUserData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        let mut lines = SetLines::new(format!("set system login user {}", self.name));
        lines.push(format!("class {}", self.class));
        if let Some(uid) = self.uid {
            lines.push(format!("uid {uid}"));
        }
        if let Some(v) = &self.full_name {
            lines.push_value("full-name", v);
        }
        if let Some(v) = &self.cli_prompt {
            lines.push_value("cli prompt", v);
        }
        if let Some(auth) = &self.authentication {
            let mut auth_lines = lines.child("authentication");
            if auth.encrypted_password.is_some() && auth.plain_text_password.is_some() {
                return Err(PathError::new(
                    "authentication.plain_text_password",
                    "conflicts with encrypted_password",
                )
                .into());
            }
            if let Some(v) = &auth.encrypted_password {
                auth_lines.push_value("encrypted-password", v);
            }
            if flag(auth.no_public_keys) {
                auth_lines.push("no-public-keys");
            }
            for key in auth.ssh_public_keys.iter().flatten() {
                let keyword = key_keyword(key)
                    .map_err(|e| PathError::new("authentication.ssh_public_keys", e))?;
                auth_lines.push(format!("{keyword} {}", quote(key)));
            }
            if let Some(v) = &auth.plain_text_password {
                auth_lines.push_value("plain-text-password-value", v);
            }
            lines.extend(auth_lines.into_lines());
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!("delete system login user {}", self.name)]
    }
}

/// The `junos_system_login_user` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoginUser;

#[async_trait]
impl Resource for SystemLoginUser {
    type Data = LoginUserData;

    fn type_name(&self) -> &'static str {
        "junos_system_login_user"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            0,
            Block::new("Configure a system login user.")
                .attribute("id", Attribute::id())
                .attribute(
                    "name",
                    Attribute::string()
                        .required()
                        .description("The name of system login user.")
                        .validator(Validator::LengthBetween(1, 64)),
                )
                .attribute(
                    "class",
                    Attribute::string()
                        .required()
                        .description("Login class.")
                        .validator(Validator::LengthBetween(1, 64)),
                )
                .attribute(
                    "uid",
                    Attribute::int64()
                        .computed()
                        .description("User identifier (uid).")
                        .validator(Validator::Int64Between(100, 64000)),
                )
                .attribute(
                    "full_name",
                    Attribute::string().description("Full name."),
                )
                .attribute(
                    "cli_prompt",
                    Attribute::string().description("Cli prompt name for this user."),
                )
                .block(
                    "authentication",
                    NestedBlock::single(
                        Block::new("Authentication method.")
                            .attribute(
                                "encrypted_password",
                                Attribute::string()
                                    .computed()
                                    .description("Encrypted password string.")
                                    .validator(Validator::LengthBetween(1, 128))
                                    .validator(Validator::ConflictsWith(&["plain_text_password"])),
                            )
                            .attribute(
                                "no_public_keys",
                                Attribute::bool()
                                    .description("Disables ssh public key based authentication."),
                            )
                            .attribute(
                                "ssh_public_keys",
                                Attribute::set_string()
                                    .description("Secure shell (ssh) public key string.")
                                    .validator(Validator::SshPublicKey),
                            )
                            .attribute(
                                "plain_text_password",
                                Attribute::string()
                                    .sensitive()
                                    .description("Plain text password (device encrypts it).")
                                    .validator(Validator::ConflictsWith(&["encrypted_password"])),
                            ),
                    ),
                ),
        )
    }

    fn id_of(&self, data: &LoginUserData) -> String {
        data.name.clone()
    }

    fn validate_config(&self, data: &LoginUserData, diags: &mut Diagnostics) {
        let Some(auth) = &data.authentication else {
            return;
        };
        if auth.encrypted_password.is_some() && auth.plain_text_password.is_some() {
            diags.add_attribute_error(
                "authentication.plain_text_password",
                "Conflicting Configuration Arguments",
                "only one of encrypted_password or plain_text_password can be set",
            );
        }
    }

    async fn read_data(&self, session: &mut Session, id: &str) -> Result<Option<LoginUserData>> {
        let output = session
            .show_config(&format!("system login user {id}"))
            .await?;
        LoginUserData::from_output(id, &output)
    }

    /// Remember the encrypted form the device produced, to detect a
    /// password changed outside Terraform.
    fn private_state(&self, fresh: &LoginUserData) -> PrivateState {
        let encrypted = fresh
            .authentication
            .as_ref()
            .and_then(|a| a.encrypted_password.clone());
        let mut private = PrivateState::new();
        private.insert(
            ENCRYPTED_PASSWORD.to_string(),
            encrypted.map(Value::String).unwrap_or(Value::Null),
        );
        private
    }

    fn reconcile_read(&self, fresh: &mut LoginUserData, prior: &LoginUserData, private: &PrivateState) {
        let Some(prior_auth) = &prior.authentication else {
            return;
        };
        if prior_auth.plain_text_password.is_none() {
            return;
        }
        let fresh_encrypted = fresh
            .authentication
            .as_ref()
            .and_then(|a| a.encrypted_password.clone())
            .map(Value::String)
            .unwrap_or(Value::Null);
        if private.get(ENCRYPTED_PASSWORD) != Some(&fresh_encrypted) {
            return;
        }
        let auth = fresh.authentication.get_or_insert_with(Default::default);
        auth.plain_text_password = prior_auth.plain_text_password.clone();
        auth.encrypted_password = prior_auth.encrypted_password.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::junos::Client;
    use crate::junos::fake::FakeDevice;
    use crate::lifecycle::{CONFIG_SET_ERROR, resource_create, resource_read};

    const ED25519: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl user@example";

    fn user() -> LoginUserData {
        LoginUserData {
            name: "bob".to_string(),
            class: "super-user".to_string(),
            uid: Some(2001),
            full_name: Some("Bob Smith".to_string()),
            authentication: Some(LoginUserAuthentication {
                ssh_public_keys: Some(vec![ED25519.to_string()]),
                plain_text_password: Some("s3cret".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_lines() {
        assert_eq!(
            user().set().unwrap(),
            vec![
                "set system login user bob class super-user".to_string(),
                "set system login user bob uid 2001".to_string(),
                "set system login user bob full-name \"Bob Smith\"".to_string(),
                format!("set system login user bob authentication ssh-ed25519 \"{ED25519}\""),
                "set system login user bob authentication plain-text-password-value s3cret".to_string(),
            ]
        );
    }

    #[test]
    fn test_bad_public_key_is_attributed() {
        let mut data = user();
        data.authentication = Some(LoginUserAuthentication {
            ssh_public_keys: Some(vec!["ssh-ed25519 not-base64".to_string()]),
            ..Default::default()
        });
        let err = data.set().unwrap_err();
        assert!(
            matches!(err, Error::Path(PathError { ref path, .. }) if path == "authentication.ssh_public_keys")
        );
    }

    #[test]
    fn test_read_authentication() {
        let output = format!(
            "set class read-only\nset cli prompt \"bob> \"\nset authentication encrypted-password \"$6$abc\"\nset authentication ssh-ed25519 \"{ED25519}\"\n"
        );
        let data = LoginUserData::from_output("bob", &output).unwrap().unwrap();
        assert_eq!(data.class, "read-only");
        assert_eq!(data.cli_prompt.as_deref(), Some("bob> "));
        let auth = data.authentication.unwrap();
        assert_eq!(auth.encrypted_password.as_deref(), Some("$6$abc"));
        assert_eq!(auth.ssh_public_keys, Some(vec![ED25519.to_string()]));
    }

    #[test]
    fn test_reconcile_keeps_plain_text_until_changed() {
        let prior = user();
        let fresh_with = |encrypted: &str| LoginUserData {
            name: "bob".to_string(),
            class: "super-user".to_string(),
            authentication: Some(LoginUserAuthentication {
                encrypted_password: Some(encrypted.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let private = SystemLoginUser.private_state(&fresh_with("$6$one"));

        let mut unchanged = fresh_with("$6$one");
        SystemLoginUser.reconcile_read(&mut unchanged, &prior, &private);
        let auth = unchanged.authentication.unwrap();
        assert_eq!(auth.plain_text_password.as_deref(), Some("s3cret"));
        assert_eq!(auth.encrypted_password, None);

        let mut changed = fresh_with("$6$two");
        SystemLoginUser.reconcile_read(&mut changed, &prior, &private);
        let auth = changed.authentication.unwrap();
        assert_eq!(auth.plain_text_password, None);
        assert_eq!(auth.encrypted_password.as_deref(), Some("$6$two"));
    }

    #[tokio::test]
    async fn test_create_and_read_keep_plain_text() {
        let device = FakeDevice::new("ex4300");
        let client = Client::fake(device, None);
        let mut diags = Diagnostics::new();

        let created = resource_create(&SystemLoginUser, &client, user(), &mut diags)
            .await
            .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        let read = resource_read(&SystemLoginUser, &client, &created.state, &created.private, &mut diags)
            .await
            .unwrap();
        assert_eq!(read.state, created.state);
    }

    #[tokio::test]
    async fn test_device_rejection_points_at_attribute() {
        let device = FakeDevice::new("ex4300");
        device.reject_lines_containing("full-name");
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        assert!(
            resource_create(&SystemLoginUser, &client, user(), &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, CONFIG_SET_ERROR);
        assert_eq!(diag.path.as_deref(), Some("full_name"));
        assert!(!device.is_locked());
    }
}
