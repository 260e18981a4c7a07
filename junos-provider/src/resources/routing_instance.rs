//! `junos_routing_instance`: `routing-instances <name>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::checks::DEFAULT_ROUTING_INSTANCE;
use super::parse_output;
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::junos::Session;
use crate::lifecycle::{Resource, ResourceData};
use crate::schema::{Attribute, Block, Schema, Validator};
use crate::setline::{ConfigItem, SetLines};

const INSTANCE_TYPES: &[&str] = &[
    "evpn",
    "evpn-vpws",
    "forwarding",
    "l2backhaul-vpn",
    "l2vpn",
    "layer2-control",
    "mac-vrf",
    "mpls-forwarding",
    "mpls-internet-multicast",
    "no-forwarding",
    "virtual-router",
    "virtual-switch",
    "vpls",
    "vrf",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingInstanceData {
    pub id: Option<String>,
    pub name: String,
    pub instance_type: Option<String>,
    pub description: Option<String>,
    pub route_distinguisher: Option<String>,
    pub vrf_target: Option<String>,
}

impl RoutingInstanceData {
    /// Parse `show configuration routing-instances <name> | display set relative`.
    pub fn from_output(name: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            name: name.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("instance-type") => self.instance_type = Some(item.take_value()?),
            Some("description") => self.description = Some(item.take_value()?),
            Some("route-distinguisher") => self.route_distinguisher = Some(item.take_value()?),
            // `vrf-target import|export ...` are not managed here.
            Some("vrf-target") if item.peek().is_some_and(|s| s.starts_with("target:")) => {
                self.vrf_target = Some(item.take_value()?)
            }
            _ => {}
        }
        Ok(())
    }
}

impl ResourceData for RoutingInstanceData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        let mut lines = SetLines::new(format!("set routing-instances {}", self.name));
        lines.bare();
        if let Some(v) = &self.instance_type {
            lines.push(format!("instance-type {v}"));
        }
        if let Some(v) = &self.description {
            lines.push_value("description", v);
        }
        if let Some(v) = &self.route_distinguisher {
            lines.push(format!("route-distinguisher {v}"));
        }
        if let Some(v) = &self.vrf_target {
            lines.push(format!("vrf-target {v}"));
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!("delete routing-instances {}", self.name)]
    }

    fn del_opts(&self) -> Vec<String> {
        let prefix = format!("delete routing-instances {}", self.name);
        ["instance-type", "description", "route-distinguisher", "vrf-target"]
            .iter()
            .map(|opt| format!("{prefix} {opt}"))
            .collect()
    }
}

/// The `junos_routing_instance` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingInstance;

#[async_trait]
impl Resource for RoutingInstance {
    type Data = RoutingInstanceData;

    fn type_name(&self) -> &'static str {
        "junos_routing_instance"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            0,
            Block::new("Provides a routing instance.")
                .attribute("id", Attribute::id())
                .attribute(
                    "name",
                    Attribute::string()
                        .required()
                        .description("The name of routing instance.")
                        .validator(Validator::LengthBetween(1, 63))
                        .validator(Validator::Regex {
                            pattern: r"^[0-9A-Za-z_\-\.]+$",
                            message: "must only contain letters, digits, '_', '-' and '.'",
                        }),
                )
                .attribute(
                    "instance_type",
                    Attribute::string()
                        .description("Type of routing instance.")
                        .validator(Validator::OneOf(INSTANCE_TYPES)),
                )
                .attribute(
                    "description",
                    Attribute::string()
                        .description("Text description of routing instance.")
                        .validator(Validator::LengthBetween(1, 900)),
                )
                .attribute(
                    "route_distinguisher",
                    Attribute::string()
                        .description("Route distinguisher for this instance.")
                        .validator(Validator::Regex {
                            pattern: r"^(\d|\.)+L?:\d+$",
                            message: "must be in the format 'x:y'",
                        }),
                )
                .attribute(
                    "vrf_target",
                    Attribute::string()
                        .description("Target community to use in import and export.")
                        .validator(Validator::Regex {
                            pattern: r"^target:(\d|\.)+L?:\d+$",
                            message: "must be in the format 'target:x:y'",
                        }),
                ),
        )
    }

    fn id_of(&self, data: &RoutingInstanceData) -> String {
        data.name.clone()
    }

    fn validate_config(&self, data: &RoutingInstanceData, diags: &mut Diagnostics) {
        if data.name == DEFAULT_ROUTING_INSTANCE {
            diags.add_attribute_error(
                "name",
                "Bad Name",
                "default is the master instance and can't be managed",
            );
        }
    }

    async fn read_data(
        &self,
        session: &mut Session,
        id: &str,
    ) -> Result<Option<RoutingInstanceData>> {
        let output = session
            .show_config(&format!("routing-instances {id}"))
            .await?;
        RoutingInstanceData::from_output(id, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junos::Client;
    use crate::junos::fake::FakeDevice;
    use crate::lifecycle::{PrivateState, resource_create, resource_read, resource_update};

    fn vrf() -> RoutingInstanceData {
        RoutingInstanceData {
            name: "cust-a".to_string(),
            instance_type: Some("vrf".to_string()),
            description: Some("Customer A".to_string()),
            route_distinguisher: Some("65000:100".to_string()),
            vrf_target: Some("target:65000:100".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_quotes_description() {
        let lines = vrf().set().unwrap();
        assert_eq!(lines[0], "set routing-instances cust-a");
        assert!(lines.contains(&"set routing-instances cust-a description \"Customer A\"".to_string()));
    }

    #[test]
    fn test_read_ignores_unmanaged_lines() {
        let data = RoutingInstanceData::from_output(
            "cust-a",
            "set instance-type vrf\nset interface ge-0/0/1.0\nset vrf-target import target:1:1\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(data.instance_type.as_deref(), Some("vrf"));
        assert_eq!(data.vrf_target, None);
    }

    #[test]
    fn test_default_name_rejected() {
        let mut diags = Diagnostics::new();
        let data = RoutingInstanceData {
            name: "default".to_string(),
            ..Default::default()
        };
        RoutingInstance.validate_config(&data, &mut diags);
        assert_eq!(diags.errors().next().unwrap().path.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn test_round_trip_and_update() {
        let device = FakeDevice::new("mx960");
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        let created = resource_create(&RoutingInstance, &client, vrf(), &mut diags)
            .await
            .unwrap();
        let read = resource_read(
            &RoutingInstance,
            &client,
            &created.state,
            &PrivateState::new(),
            &mut diags,
        )
        .await
        .unwrap();
        assert_eq!(read.state, created.state);

        let mut next = created.state.clone();
        next.description = None;
        resource_update(&RoutingInstance, &client, next, &created.state, &mut diags)
            .await
            .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert!(!device.running().iter().any(|l| l.contains("description")));
        assert!(device.running().contains(&"set routing-instances cust-a".to_string()));
    }
}
