//! `junos_security_ike_policy`: `security ike policy <name>`.
//!
//! The device shows `pre-shared-key ascii-text` obfuscated as `$9$...`;
//! reads decode it so the state holds the configured text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::parse_output;
use crate::diag::Diagnostics;
use crate::error::{Error, PathError, Result};
use crate::junos::Session;
use crate::lifecycle::{Resource, ResourceData, check_not_exists};
use crate::schema::{Attribute, Block, Schema, Validator};
use crate::setline::{ConfigItem, SetLines, decode_secret};

const PROPOSAL_SETS: &[&str] = &[
    "basic",
    "compatible",
    "standard",
    "prime-128",
    "prime-256",
    "suiteb-gcm-128",
    "suiteb-gcm-256",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IkePolicyData {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub mode: Option<String>,
    pub proposals: Option<Vec<String>>,
    pub proposal_set: Option<String>,
    pub pre_shared_key_text: Option<String>,
    pub pre_shared_key_hexa: Option<String>,
    pub reauth_frequency: Option<i64>,
}

impl IkePolicyData {
    /// Parse `show configuration security ike policy <name> | display set relative`.
    pub fn from_output(name: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            name: name.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("description") => self.description = Some(item.take_value()?),
            Some("mode") => self.mode = Some(item.take_value()?),
            Some("proposals") => {
                let proposal = item.take_value()?;
                self.proposals.get_or_insert_with(Vec::new).push(proposal);
            }
            Some("proposal-set") => self.proposal_set = Some(item.take_value()?),
            Some("reauth-frequency") => self.reauth_frequency = Some(item.take_int()?),
            Some("pre-shared-key") => match item.next_segment().as_deref() {
                Some("ascii-text") => {
                    let value = item.take_value()?;
                    let text = decode_secret(&value).map_err(|e| item.error(e))?;
                    self.pre_shared_key_text = Some(text);
                }
                Some("hexadecimal") => {
                    let value = item.take_value()?;
                    let hexa = decode_secret(&value).map_err(|e| item.error(e))?;
                    self.pre_shared_key_hexa = Some(hexa);
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn check_conflicts(&self) -> std::result::Result<(), PathError> {
        if self.pre_shared_key_text.is_some() && self.pre_shared_key_hexa.is_some() {
            return Err(PathError::new(
                "pre_shared_key_text",
                "only one of pre_shared_key_text or pre_shared_key_hexa can be set",
            ));
        }
        if self.proposals.as_ref().is_some_and(|p| !p.is_empty()) && self.proposal_set.is_some() {
            return Err(PathError::new(
                "proposals",
                "only one of proposals or proposal_set can be set",
            ));
        }
        Ok(())
    }
}

impl ResourceData for IkePolicyData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        self.check_conflicts()?;

        let mut lines = SetLines::new(format!("set security ike policy {}", self.name));
        if let Some(v) = &self.description {
            lines.push_value("description", v);
        }
        if let Some(v) = &self.mode {
            lines.push(format!("mode {v}"));
        }
        for proposal in self.proposals.iter().flatten() {
            lines.push(format!("proposals {proposal}"));
        }
        if let Some(v) = &self.proposal_set {
            lines.push(format!("proposal-set {v}"));
        }
        if let Some(v) = &self.pre_shared_key_text {
            lines.push_value("pre-shared-key ascii-text", v);
        }
        if let Some(v) = &self.pre_shared_key_hexa {
            lines.push(format!("pre-shared-key hexadecimal {v}"));
        }
        if let Some(v) = self.reauth_frequency {
            lines.push(format!("reauth-frequency {v}"));
        }
        if lines.is_empty() {
            lines.bare();
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!("delete security ike policy {}", self.name)]
    }
}

/// The `junos_security_ike_policy` resource. Needs an SRX-class device.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityIkePolicy;

#[async_trait]
impl Resource for SecurityIkePolicy {
    type Data = IkePolicyData;

    fn type_name(&self) -> &'static str {
        "junos_security_ike_policy"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            0,
            Block::new("Provides a security ike policy resource.")
                .attribute("id", Attribute::id())
                .attribute(
                    "name",
                    Attribute::string()
                        .required()
                        .description("The name of security ike policy.")
                        .validator(Validator::LengthBetween(1, 32))
                        .validator(Validator::Regex {
                            pattern: r"^[0-9A-Za-z_\-\.]+$",
                            message: "must only contain letters, digits, '_', '-' and '.'",
                        }),
                )
                .attribute(
                    "description",
                    Attribute::string()
                        .description("Text description of IKE policy.")
                        .validator(Validator::LengthBetween(1, 80)),
                )
                .attribute(
                    "mode",
                    Attribute::string()
                        .description("IKE mode for Phase 1.")
                        .validator(Validator::OneOf(&["main", "aggressive"])),
                )
                .attribute(
                    "proposals",
                    Attribute::list_string()
                        .description("IKE proposals list.")
                        .validator(Validator::ConflictsWith(&["proposal_set"])),
                )
                .attribute(
                    "proposal_set",
                    Attribute::string()
                        .description("Types of default IKE proposal-set.")
                        .validator(Validator::OneOf(PROPOSAL_SETS))
                        .validator(Validator::ConflictsWith(&["proposals"])),
                )
                .attribute(
                    "pre_shared_key_text",
                    Attribute::string()
                        .sensitive()
                        .description("Preshared key with format as text.")
                        .validator(Validator::ConflictsWith(&["pre_shared_key_hexa"])),
                )
                .attribute(
                    "pre_shared_key_hexa",
                    Attribute::string()
                        .sensitive()
                        .description("Preshared key with format as hexadecimal.")
                        .validator(Validator::Regex {
                            pattern: r"^[0-9a-fA-F]+$",
                            message: "must be hexadecimal",
                        })
                        .validator(Validator::ConflictsWith(&["pre_shared_key_text"])),
                )
                .attribute(
                    "reauth_frequency",
                    Attribute::int64()
                        .description("Re-auth Peer after reauth-frequency times hard lifetime.")
                        .validator(Validator::Int64Between(1, 100)),
                ),
        )
    }

    fn id_of(&self, data: &IkePolicyData) -> String {
        data.name.clone()
    }

    fn validate_config(&self, data: &IkePolicyData, diags: &mut Diagnostics) {
        if let Err(err) = data.check_conflicts() {
            diags.add_attribute_error(err.path, "Conflicting Configuration Arguments", err.message);
        }
    }

    async fn read_data(&self, session: &mut Session, id: &str) -> Result<Option<IkePolicyData>> {
        let output = session
            .show_config(&format!("security ike policy {id}"))
            .await?;
        IkePolicyData::from_output(id, &output)
    }

    async fn pre_check_create(&self, session: &mut Session, plan: &IkePolicyData) -> Result<()> {
        if !session.check_compatibility_security() {
            return Err(Error::Check(format!(
                "resource {} not compatible with Junos device {}",
                self.type_name(),
                session.system_information().hardware_model
            )));
        }
        check_not_exists(self, session, &plan.name).await
    }
}
