//! `junos_lldpmed_interface`: `protocols lldp-med interface <name>`.
//!
//! Junos spells the coordinate keyword `lattitude`. Lines are emitted with
//! that spelling and both spellings are accepted on read.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{flag, parse_output};
use crate::error::{PathError, Result};
use crate::junos::Session;
use crate::lifecycle::{Resource, ResourceData};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::setline::{ConfigItem, SetLines};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CivicCaType {
    pub ca_type: i64,
    pub ca_value: Option<String>,
}

impl CivicCaType {
    fn identifier_key(&self) -> i64 {
        self.ca_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LldpMedLocation {
    pub civic_based_country_code: Option<String>,
    pub civic_based_what: Option<i64>,
    pub civic_based_ca_type: Vec<CivicCaType>,
    pub co_ordinate_latitude: Option<i64>,
    pub co_ordinate_longitude: Option<i64>,
    pub elin: Option<String>,
}

impl LldpMedLocation {
    pub fn is_empty(&self) -> bool {
        self.civic_based_country_code.is_none()
            && self.civic_based_what.is_none()
            && self.civic_based_ca_type.is_empty()
            && self.co_ordinate_latitude.is_none()
            && self.co_ordinate_longitude.is_none()
            && self.elin.is_none()
    }

    fn set(&self, lines: &mut SetLines) -> Result<()> {
        if self.is_empty() {
            return Err(PathError::new(
                "location",
                "at least one of civic_based_*, co_ordinate_* or elin must be set",
            )
            .into());
        }

        let mut civic = lines.child("civic-based");
        if let Some(v) = &self.civic_based_country_code {
            civic.push(format!("country-code {v}"));
        }
        if let Some(v) = self.civic_based_what {
            civic.push(format!("what {v}"));
        }
        let mut seen = HashSet::new();
        for ca in &self.civic_based_ca_type {
            if !seen.insert(ca.identifier_key()) {
                return Err(PathError::new(
                    "location.civic_based_ca_type",
                    format!("multiple blocks with the same ca_type {}", ca.ca_type),
                )
                .into());
            }
            match &ca.ca_value {
                Some(value) => civic.push_value(&format!("ca-type {} ca-value", ca.ca_type), value),
                None => civic.push(format!("ca-type {}", ca.ca_type)),
            }
        }
        lines.extend(civic.into_lines());

        let mut coordinate = lines.child("co-ordinate");
        if let Some(v) = self.co_ordinate_latitude {
            coordinate.push(format!("lattitude {v}"));
        }
        if let Some(v) = self.co_ordinate_longitude {
            coordinate.push(format!("longitude {v}"));
        }
        lines.extend(coordinate.into_lines());

        if let Some(v) = &self.elin {
            lines.push_value("elin", v);
        }
        Ok(())
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("civic-based") => match item.next_segment().as_deref() {
                Some("country-code") => self.civic_based_country_code = Some(item.take_value()?),
                Some("what") => self.civic_based_what = Some(item.take_int()?),
                Some("ca-type") => {
                    let raw = item.next_segment().unwrap_or_default();
                    let ca_type = raw
                        .parse::<i64>()
                        .map_err(|e| item.error(format!("'{raw}' is not an integer: {e}")))?;
                    let value = if item.strip(&["ca-value"]) {
                        Some(item.take_value()?)
                    } else {
                        None
                    };
                    match self.civic_based_ca_type.iter_mut().find(|c| c.ca_type == ca_type) {
                        Some(existing) => {
                            if value.is_some() {
                                existing.ca_value = value;
                            }
                        }
                        None => self.civic_based_ca_type.push(CivicCaType {
                            ca_type,
                            ca_value: value,
                        }),
                    }
                }
                _ => {}
            },
            Some("co-ordinate") => match item.next_segment().as_deref() {
                Some("lattitude" | "latitude") => self.co_ordinate_latitude = Some(item.take_int()?),
                Some("longitude") => self.co_ordinate_longitude = Some(item.take_int()?),
                _ => {}
            },
            Some("elin") => self.elin = Some(item.take_value()?),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LldpMedInterfaceData {
    pub id: Option<String>,
    pub name: String,
    pub disable: Option<bool>,
    pub location: Option<LldpMedLocation>,
}

impl LldpMedInterfaceData {
    /// Parse `show configuration protocols lldp-med interface <name> | display set relative`.
    pub fn from_output(name: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            name: name.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("disable") => self.disable = Some(true),
            Some("location") => self
                .location
                .get_or_insert_with(Default::default)
                .parse_line(item)?,
            _ => {}
        }
        Ok(())
    }
}

impl ResourceData for LldpMedInterfaceData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        let mut lines = SetLines::new(format!("set protocols lldp-med interface {}", self.name));
        lines.bare();
        if flag(self.disable) {
            lines.push("disable");
        }
        if let Some(location) = &self.location {
            let mut location_lines = lines.child("location");
            location.set(&mut location_lines)?;
            lines.extend(location_lines.into_lines());
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!("delete protocols lldp-med interface {}", self.name)]
    }
}

/// The `junos_lldpmed_interface` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct LldpMedInterface;

#[async_trait]
impl Resource for LldpMedInterface {
    type Data = LldpMedInterfaceData;

    fn type_name(&self) -> &'static str {
        "junos_lldpmed_interface"
    }

    fn schema(&self) -> Schema {
        let location = Block::new("Define location.")
            .attribute(
                "civic_based_country_code",
                Attribute::string()
                    .description("Two-letter country code.")
                    .validator(Validator::Regex {
                        pattern: r"^[A-Z]{2}$",
                        message: "must be two uppercase letters",
                    }),
            )
            .attribute(
                "civic_based_what",
                Attribute::int64()
                    .description("Type of address.")
                    .validator(Validator::Int64Between(0, 2))
                    .validator(Validator::AlsoRequires(&["civic_based_country_code"])),
            )
            .attribute(
                "co_ordinate_latitude",
                Attribute::int64()
                    .description("Latitude value.")
                    .validator(Validator::Int64Between(0, 360)),
            )
            .attribute(
                "co_ordinate_longitude",
                Attribute::int64()
                    .description("Longitude value.")
                    .validator(Validator::Int64Between(0, 360)),
            )
            .attribute(
                "elin",
                Attribute::string()
                    .description("Emergency line identification (ELIN) string.")
                    .validator(Validator::LengthBetween(1, 25)),
            )
            .block(
                "civic_based_ca_type",
                NestedBlock::list(
                    Block::new("CA type.")
                        .attribute(
                            "ca_type",
                            Attribute::int64()
                                .required()
                                .description("Address element type.")
                                .validator(Validator::Int64Between(0, 255)),
                        )
                        .attribute(
                            "ca_value",
                            Attribute::string()
                                .description("Address element value.")
                                .validator(Validator::LengthBetween(1, 250)),
                        ),
                ),
            )
            .at_least_one_of(&[
                "civic_based_country_code",
                "civic_based_what",
                "civic_based_ca_type",
                "co_ordinate_latitude",
                "co_ordinate_longitude",
                "elin",
            ]);

        Schema::new(
            0,
            Block::new("Configure LLDP-MED on an interface.")
                .attribute("id", Attribute::id())
                .attribute(
                    "name",
                    Attribute::string()
                        .required()
                        .description("Interface name or `all`.")
                        .validator(Validator::LengthBetween(1, 64)),
                )
                .attribute(
                    "disable",
                    Attribute::bool().description("Disable LLDP-MED on interface."),
                )
                .block("location", NestedBlock::single(location)),
        )
    }

    fn id_of(&self, data: &LldpMedInterfaceData) -> String {
        data.name.clone()
    }

    async fn read_data(
        &self,
        session: &mut Session,
        id: &str,
    ) -> Result<Option<LldpMedInterfaceData>> {
        let output = session
            .show_config(&format!("protocols lldp-med interface {id}"))
            .await?;
        LldpMedInterfaceData::from_output(id, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::error::Error;
    use crate::junos::Client;
    use crate::junos::fake::FakeDevice;
    use crate::lifecycle::{PrivateState, resource_create, resource_read};

    fn interface() -> LldpMedInterfaceData {
        LldpMedInterfaceData {
            name: "ge-0/0/3".to_string(),
            location: Some(LldpMedLocation {
                civic_based_country_code: Some("FR".to_string()),
                civic_based_ca_type: vec![CivicCaType {
                    ca_type: 1,
                    ca_value: Some("Ile de France".to_string()),
                }],
                co_ordinate_latitude: Some(48),
                co_ordinate_longitude: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_latitude_emitted_with_device_spelling() {
        let lines = interface().set().unwrap();
        assert!(lines.contains(
            &"set protocols lldp-med interface ge-0/0/3 location co-ordinate lattitude 48".to_string()
        ));
        assert!(lines.contains(
            &"set protocols lldp-med interface ge-0/0/3 location civic-based ca-type 1 ca-value \"Ile de France\""
                .to_string()
        ));
    }

    #[test]
    fn test_latitude_read_with_either_spelling() {
        for keyword in ["lattitude", "latitude"] {
            let output = format!("set location co-ordinate {keyword} 48\n");
            let data = LldpMedInterfaceData::from_output("ge-0/0/3", &output)
                .unwrap()
                .unwrap();
            assert_eq!(data.location.unwrap().co_ordinate_latitude, Some(48));
        }
    }

    #[test]
    fn test_empty_location_and_duplicate_ca_type() {
        let mut data = interface();
        data.location = Some(LldpMedLocation::default());
        assert!(matches!(
            data.set().unwrap_err(),
            Error::Path(PathError { ref path, .. }) if path == "location"
        ));

        let mut data = interface();
        if let Some(location) = data.location.as_mut() {
            location.civic_based_ca_type.push(CivicCaType {
                ca_type: 1,
                ca_value: None,
            });
        }
        assert!(matches!(
            data.set().unwrap_err(),
            Error::Path(PathError { ref path, .. }) if path == "location.civic_based_ca_type"
        ));
    }

    #[test]
    fn test_read_ca_type_lines_merge() {
        let output = "set\nset disable\nset location civic-based ca-type 3\nset location civic-based ca-type 3 ca-value Paris\n";
        let data = LldpMedInterfaceData::from_output("ge-0/0/3", output)
            .unwrap()
            .unwrap();
        assert_eq!(data.disable, Some(true));
        assert_eq!(
            data.location.unwrap().civic_based_ca_type,
            vec![CivicCaType {
                ca_type: 3,
                ca_value: Some("Paris".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_round_trip() {
        let client = Client::fake(FakeDevice::new("ex4300"), None);
        let mut diags = Diagnostics::new();
        let created = resource_create(&LldpMedInterface, &client, interface(), &mut diags)
            .await
            .unwrap();
        let read = resource_read(
            &LldpMedInterface,
            &client,
            &created.state,
            &PrivateState::new(),
            &mut diags,
        )
        .await
        .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(read.state, created.state);
    }
}
