//! `junos_access_address_assignment_pool`:
//! `[routing-instances <ri>] access address-assignment pool <name>`.
//!
//! Schema version 1 turned the `family` and `dhcp_attributes` lists of
//! version 0 into single blocks; [`upgrade_v0`] migrates old state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checks::{DEFAULT_ROUTING_INSTANCE, check_routing_instance_exists};
use super::{flag, parse_output};
use crate::diag::Diagnostics;
use crate::error::{Error, PathError, Result};
use crate::junos::Session;
use crate::lifecycle::{Resource, ResourceData, check_not_exists};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::setline::{ConfigItem, ID_SEPARATOR, SetLines};

const INET: &str = "inet";
const INVALID_FAMILY: &str = "Invalid Family Configuration";
const INET6: &str = "inet6";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolRange {
    pub name: String,
    pub low: Option<String>,
    pub high: Option<String>,
    /// inet6 ranges only.
    pub prefix_length: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolHost {
    pub name: String,
    pub hardware_address: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpAttributes {
    pub boot_file: Option<String>,
    pub boot_server: Option<String>,
    pub domain_name: Option<String>,
    pub grace_period: Option<i64>,
    pub maximum_lease_time: Option<i64>,
    pub name_server: Option<Vec<String>>,
    pub router: Option<Vec<String>>,
    pub propagate_settings: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolFamily {
    #[serde(rename = "type")]
    pub type_: String,
    /// `network` for inet, `prefix` for inet6.
    pub network: Option<String>,
    pub excluded_address: Option<Vec<String>>,
    pub excluded_range: Vec<PoolRange>,
    pub host: Vec<PoolHost>,
    pub inet_range: Vec<PoolRange>,
    pub inet6_range: Vec<PoolRange>,
    pub dhcp_attributes: Option<DhcpAttributes>,
    pub xauth_attributes_primary_dns: Option<String>,
    pub xauth_attributes_primary_wins: Option<String>,
    pub xauth_attributes_secondary_dns: Option<String>,
    pub xauth_attributes_secondary_wins: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolData {
    pub id: Option<String>,
    pub name: String,
    pub routing_instance: String,
    pub active_drain: Option<bool>,
    pub hold_down: Option<bool>,
    pub link: Option<String>,
    pub family: Option<PoolFamily>,
}

impl Default for PoolData {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            routing_instance: DEFAULT_ROUTING_INSTANCE.to_string(),
            active_drain: None,
            hold_down: None,
            link: None,
            family: None,
        }
    }
}

fn range_entry<'a>(ranges: &'a mut Vec<PoolRange>, name: String) -> &'a mut PoolRange {
    match ranges.iter().position(|r| r.name == name) {
        Some(i) => &mut ranges[i],
        None => {
            ranges.push(PoolRange {
                name,
                ..Default::default()
            });
            let last = ranges.len() - 1;
            &mut ranges[last]
        }
    }
}

fn set_range(lines: &mut SetLines, keyword: &str, range: &PoolRange) {
    let mut range_lines = lines.child(format!("{keyword} {}", range.name));
    if let Some(v) = &range.low {
        range_lines.push(format!("low {v}"));
    }
    if let Some(v) = &range.high {
        range_lines.push(format!("high {v}"));
    }
    if let Some(v) = range.prefix_length {
        range_lines.push(format!("prefix-length {v}"));
    }
    lines.extend(range_lines.into_lines());
}

fn parse_range(item: &mut ConfigItem, range: &mut PoolRange) -> Result<()> {
    match item.next_segment().as_deref() {
        Some("low") => range.low = Some(item.take_value()?),
        Some("high") => range.high = Some(item.take_value()?),
        Some("prefix-length") => range.prefix_length = Some(item.take_int()?),
        _ => {}
    }
    Ok(())
}

impl DhcpAttributes {
    /// No option set: the block would leave nothing on the device.
    fn is_empty(&self) -> bool {
        self.boot_file.is_none()
            && self.boot_server.is_none()
            && self.domain_name.is_none()
            && self.grace_period.is_none()
            && self.maximum_lease_time.is_none()
            && self.name_server.iter().flatten().next().is_none()
            && self.router.iter().flatten().next().is_none()
            && self.propagate_settings.is_none()
    }

    fn set(&self, lines: &mut SetLines) {
        if let Some(v) = &self.boot_file {
            lines.push_value("boot-file", v);
        }
        if let Some(v) = &self.boot_server {
            lines.push(format!("boot-server {v}"));
        }
        if let Some(v) = &self.domain_name {
            lines.push_value("domain-name", v);
        }
        if let Some(v) = self.grace_period {
            lines.push(format!("grace-period {v}"));
        }
        if let Some(v) = self.maximum_lease_time {
            lines.push(format!("maximum-lease-time {v}"));
        }
        for v in self.name_server.iter().flatten() {
            lines.push(format!("name-server {v}"));
        }
        for v in self.router.iter().flatten() {
            lines.push(format!("router {v}"));
        }
        if let Some(v) = &self.propagate_settings {
            lines.push_value("propagate-settings", v);
        }
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("boot-file") => self.boot_file = Some(item.take_value()?),
            Some("boot-server") => self.boot_server = Some(item.take_value()?),
            Some("domain-name") => self.domain_name = Some(item.take_value()?),
            Some("grace-period") => self.grace_period = Some(item.take_int()?),
            Some("maximum-lease-time") => self.maximum_lease_time = Some(item.take_int()?),
            Some("name-server") => {
                let v = item.take_value()?;
                self.name_server.get_or_insert_with(Vec::new).push(v);
            }
            Some("router") => {
                let v = item.take_value()?;
                self.router.get_or_insert_with(Vec::new).push(v);
            }
            Some("propagate-settings") => self.propagate_settings = Some(item.take_value()?),
            _ => {}
        }
        Ok(())
    }
}

impl PoolFamily {
    fn is_inet(&self) -> bool {
        self.type_ == INET
    }

    /// Blocks and attributes configured for the other family, and empty blocks.
    fn check_blocks(&self) -> std::result::Result<(), PathError> {
        if self.dhcp_attributes.as_ref().is_some_and(DhcpAttributes::is_empty) {
            return Err(PathError::new(
                "family.dhcp_attributes",
                "dhcp_attributes block is empty",
            ));
        }
        let wrong = |name: &str| {
            PathError::new(
                format!("family.{name}"),
                format!("{name} cannot be configured when type = {}", self.type_),
            )
        };
        match self.type_.as_str() {
            INET => {
                if !self.inet6_range.is_empty() {
                    return Err(wrong("inet6_range"));
                }
            }
            INET6 => {
                if !self.inet_range.is_empty() {
                    return Err(wrong("inet_range"));
                }
                if !self.host.is_empty() {
                    return Err(wrong("host"));
                }
                let xauth = [
                    ("xauth_attributes_primary_dns", &self.xauth_attributes_primary_dns),
                    ("xauth_attributes_primary_wins", &self.xauth_attributes_primary_wins),
                    ("xauth_attributes_secondary_dns", &self.xauth_attributes_secondary_dns),
                    ("xauth_attributes_secondary_wins", &self.xauth_attributes_secondary_wins),
                ];
                if let Some((name, _)) = xauth.iter().find(|(_, v)| v.is_some()) {
                    return Err(wrong(*name));
                }
            }
            other => {
                return Err(PathError::new(
                    "family.type",
                    format!("unknown family type '{other}'"),
                ));
            }
        }
        Ok(())
    }

    fn set(&self, lines: &mut SetLines) -> Result<()> {
        self.check_blocks()?;

        let mut family = lines.child(format!("family {}", self.type_));
        family.bare();
        if let Some(v) = &self.network {
            let keyword = if self.is_inet() { "network" } else { "prefix" };
            family.push(format!("{keyword} {v}"));
        }
        for v in self.excluded_address.iter().flatten() {
            family.push(format!("excluded-address {v}"));
        }
        for range in &self.excluded_range {
            set_range(&mut family, "excluded-range", range);
        }
        for host in &self.host {
            let mut host_lines = family.child(format!("host {}", host.name));
            if let Some(v) = &host.hardware_address {
                host_lines.push(format!("hardware-address {v}"));
            }
            if let Some(v) = &host.ip_address {
                host_lines.push(format!("ip-address {v}"));
            }
            family.extend(host_lines.into_lines());
        }
        for range in self.inet_range.iter().chain(&self.inet6_range) {
            set_range(&mut family, "range", range);
        }
        if let Some(dhcp) = &self.dhcp_attributes {
            let mut dhcp_lines = family.child("dhcp-attributes");
            dhcp.set(&mut dhcp_lines);
            family.extend(dhcp_lines.into_lines());
        }
        let xauth = [
            ("primary-dns", &self.xauth_attributes_primary_dns),
            ("primary-wins", &self.xauth_attributes_primary_wins),
            ("secondary-dns", &self.xauth_attributes_secondary_dns),
            ("secondary-wins", &self.xauth_attributes_secondary_wins),
        ];
        for (keyword, value) in xauth {
            if let Some(v) = value {
                family.push(format!("xauth-attributes {keyword} {v}"));
            }
        }

        lines.extend(family.into_lines());
        Ok(())
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("network" | "prefix") => self.network = Some(item.take_value()?),
            Some("excluded-address") => {
                let v = item.take_value()?;
                self.excluded_address.get_or_insert_with(Vec::new).push(v);
            }
            Some("excluded-range") => {
                let name = item.next_segment().unwrap_or_default();
                parse_range(item, range_entry(&mut self.excluded_range, name))?;
            }
            Some("range") => {
                let name = item.next_segment().unwrap_or_default();
                let ranges = if self.is_inet() {
                    &mut self.inet_range
                } else {
                    &mut self.inet6_range
                };
                parse_range(item, range_entry(ranges, name))?;
            }
            Some("host") => {
                let name = item.next_segment().unwrap_or_default();
                let host = match self.host.iter().position(|h| h.name == name) {
                    Some(i) => &mut self.host[i],
                    None => {
                        self.host.push(PoolHost {
                            name,
                            ..Default::default()
                        });
                        let last = self.host.len() - 1;
                        &mut self.host[last]
                    }
                };
                match item.next_segment().as_deref() {
                    Some("hardware-address") => host.hardware_address = Some(item.take_value()?),
                    Some("ip-address") => host.ip_address = Some(item.take_value()?),
                    _ => {}
                }
            }
            Some("dhcp-attributes") => self
                .dhcp_attributes
                .get_or_insert_with(Default::default)
                .parse_line(item)?,
            Some("xauth-attributes") => match item.next_segment().as_deref() {
                Some("primary-dns") => self.xauth_attributes_primary_dns = Some(item.take_value()?),
                Some("primary-wins") => {
                    self.xauth_attributes_primary_wins = Some(item.take_value()?)
                }
                Some("secondary-dns") => {
                    self.xauth_attributes_secondary_dns = Some(item.take_value()?)
                }
                Some("secondary-wins") => {
                    self.xauth_attributes_secondary_wins = Some(item.take_value()?)
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }
}

impl PoolData {
    /// Configuration path of a pool, without the `set`/`delete` verb.
    fn path(name: &str, routing_instance: &str) -> String {
        if routing_instance == DEFAULT_ROUTING_INSTANCE {
            format!("access address-assignment pool {name}")
        } else {
            format!("routing-instances {routing_instance} access address-assignment pool {name}")
        }
    }

    /// Parse `show configuration <pool path> | display set relative`.
    pub fn from_output(name: &str, routing_instance: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            name: name.to_string(),
            routing_instance: routing_instance.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("active-drain") => self.active_drain = Some(true),
            Some("hold-down") => self.hold_down = Some(true),
            Some("link") => self.link = Some(item.take_value()?),
            Some("family") => {
                let type_ = item.next_segment().unwrap_or_default();
                let family = self.family.get_or_insert_with(|| PoolFamily {
                    type_,
                    ..Default::default()
                });
                family.parse_line(item)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl ResourceData for PoolData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        let mut lines = SetLines::new(format!(
            "set {}",
            Self::path(&self.name, &self.routing_instance)
        ));
        lines.bare();
        if flag(self.active_drain) {
            lines.push("active-drain");
        }
        if flag(self.hold_down) {
            lines.push("hold-down");
        }
        if let Some(v) = &self.link {
            lines.push(format!("link {v}"));
        }
        if let Some(family) = &self.family {
            family.set(&mut lines)?;
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!(
            "delete {}",
            Self::path(&self.name, &self.routing_instance)
        )]
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolFamilyV0 {
    #[serde(rename = "type")]
    type_: String,
    network: Option<String>,
    excluded_address: Option<Vec<String>>,
    excluded_range: Vec<PoolRange>,
    host: Vec<PoolHost>,
    inet_range: Vec<PoolRange>,
    inet6_range: Vec<PoolRange>,
    dhcp_attributes: Vec<DhcpAttributes>,
    xauth_attributes_primary_dns: Option<String>,
    xauth_attributes_primary_wins: Option<String>,
    xauth_attributes_secondary_dns: Option<String>,
    xauth_attributes_secondary_wins: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolDataV0 {
    id: Option<String>,
    name: String,
    routing_instance: Option<String>,
    active_drain: bool,
    hold_down: bool,
    link: Option<String>,
    family: Vec<PoolFamilyV0>,
}

impl From<PoolFamilyV0> for PoolFamily {
    fn from(v0: PoolFamilyV0) -> Self {
        Self {
            type_: v0.type_,
            network: v0.network,
            excluded_address: v0.excluded_address,
            excluded_range: v0.excluded_range,
            host: v0.host,
            inet_range: v0.inet_range,
            inet6_range: v0.inet6_range,
            dhcp_attributes: v0.dhcp_attributes.into_iter().next(),
            xauth_attributes_primary_dns: v0.xauth_attributes_primary_dns,
            xauth_attributes_primary_wins: v0.xauth_attributes_primary_wins,
            xauth_attributes_secondary_dns: v0.xauth_attributes_secondary_dns,
            xauth_attributes_secondary_wins: v0.xauth_attributes_secondary_wins,
        }
    }
}

impl From<PoolDataV0> for PoolData {
    fn from(v0: PoolDataV0) -> Self {
        Self {
            id: v0.id,
            name: v0.name,
            routing_instance: v0
                .routing_instance
                .unwrap_or_else(|| DEFAULT_ROUTING_INSTANCE.to_string()),
            active_drain: v0.active_drain.then_some(true),
            hold_down: v0.hold_down.then_some(true),
            link: v0.link,
            family: v0.family.into_iter().next().map(PoolFamily::from),
        }
    }
}

/// Migrate version 0 state (list blocks, plain booleans) to version 1.
pub fn upgrade_v0(raw: Value) -> Result<Value> {
    let v0: PoolDataV0 = serde_json::from_value(raw)?;
    Ok(serde_json::to_value(PoolData::from(v0))?)
}

/// The `junos_access_address_assignment_pool` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessAddressAssignmentPool;

impl AccessAddressAssignmentPool {
    async fn check_routing_instance(session: &mut Session, data: &PoolData) -> Result<()> {
        if !check_routing_instance_exists(session, &data.routing_instance).await? {
            return Err(Error::Check(format!(
                "routing instance {} doesn't exist",
                data.routing_instance
            )));
        }
        Ok(())
    }

    fn range_block(description: &str, with_prefix_length: bool) -> NestedBlock {
        let mut block = Block::new(description)
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .description("Range name.")
                    .validator(Validator::LengthBetween(1, 63)),
            )
            .attribute(
                "low",
                Attribute::string()
                    .required()
                    .description("Lower limit of address range."),
            )
            .attribute(
                "high",
                Attribute::string()
                    .required()
                    .description("Upper limit of address range."),
            );
        if with_prefix_length {
            block = block.attribute(
                "prefix_length",
                Attribute::int64()
                    .description("Prefix length to assign.")
                    .validator(Validator::Int64Between(1, 128)),
            );
        }
        NestedBlock::list(block)
    }

    fn family_block() -> Block {
        let xauth = |description: &'static str| {
            Attribute::string()
                .description(description)
                .validator(Validator::CidrNetwork)
        };

        Block::new("Address family.")
            .attribute(
                "type",
                Attribute::string()
                    .required()
                    .description("Type of family.")
                    .validator(Validator::OneOf(&[INET, INET6])),
            )
            .attribute(
                "network",
                Attribute::string()
                    .required()
                    .description("Network address of pool (prefix for inet6).")
                    .validator(Validator::CidrNetwork),
            )
            .attribute(
                "excluded_address",
                Attribute::set_string()
                    .description("Excluded Addresses.")
                    .validator(Validator::IpAddress),
            )
            .attribute("xauth_attributes_primary_dns", xauth("Specify the primary-dns IP address."))
            .attribute("xauth_attributes_primary_wins", xauth("Specify the primary-wins IP address."))
            .attribute(
                "xauth_attributes_secondary_dns",
                xauth("Specify the secondary-dns IP address."),
            )
            .attribute(
                "xauth_attributes_secondary_wins",
                xauth("Specify the secondary-wins IP address."),
            )
            .block("excluded_range", Self::range_block("Excluded address range.", false))
            .block(
                "host",
                NestedBlock::list(
                    Block::new("Hostname for static reservations.")
                        .attribute("name", Attribute::string().required().description("Hostname."))
                        .attribute(
                            "hardware_address",
                            Attribute::string()
                                .required()
                                .description("Hardware address.")
                                .validator(Validator::Regex {
                                    pattern: r"^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$",
                                    message: "must be a MAC address",
                                }),
                        )
                        .attribute(
                            "ip_address",
                            Attribute::string()
                                .required()
                                .description("Reserved address.")
                                .validator(Validator::Ipv4Address),
                        ),
                ),
            )
            .block("inet_range", Self::range_block("Address range (inet).", false))
            .block("inet6_range", Self::range_block("Address range (inet6).", true))
            .block(
                "dhcp_attributes",
                NestedBlock::single(
                    Block::new("DHCP options and match criteria.")
                        .attribute("boot_file", Attribute::string().description("Boot filename advertised to clients."))
                        .attribute(
                            "boot_server",
                            Attribute::string().description("Boot server advertised to clients."),
                        )
                        .attribute(
                            "domain_name",
                            Attribute::string().description("Domain name advertised to clients."),
                        )
                        .attribute(
                            "grace_period",
                            Attribute::int64()
                                .description("Grace period for leases (seconds).")
                                .validator(Validator::Int64Between(0, 4294967295)),
                        )
                        .attribute(
                            "maximum_lease_time",
                            Attribute::int64()
                                .description("Maximum lease time advertised to clients (seconds).")
                                .validator(Validator::Int64Between(0, 4294967295)),
                        )
                        .attribute(
                            "name_server",
                            Attribute::list_string()
                                .description("IP addresses of domain name servers.")
                                .validator(Validator::IpAddress),
                        )
                        .attribute(
                            "router",
                            Attribute::list_string()
                                .description("IP addresses of routers.")
                                .validator(Validator::IpAddress),
                        )
                        .attribute(
                            "propagate_settings",
                            Attribute::string()
                                .description("Interface name for propagating TCP/IP settings to pool."),
                        ),
                ),
            )
    }
}

#[async_trait]
impl Resource for AccessAddressAssignmentPool {
    type Data = PoolData;

    fn type_name(&self) -> &'static str {
        "junos_access_address_assignment_pool"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            1,
            Block::new("Provides an address assignment pool.")
                .attribute("id", Attribute::id())
                .attribute(
                    "name",
                    Attribute::string()
                        .required()
                        .description("Address pool name.")
                        .validator(Validator::LengthBetween(1, 63)),
                )
                .attribute(
                    "routing_instance",
                    Attribute::string()
                        .computed()
                        .description("Routing instance for pool (default `default`).")
                        .validator(Validator::LengthBetween(1, 63)),
                )
                .attribute(
                    "active_drain",
                    Attribute::bool().description("Notify client of pool active drain mode."),
                )
                .attribute(
                    "hold_down",
                    Attribute::bool().description("Place pool in passive mode."),
                )
                .attribute(
                    "link",
                    Attribute::string().description("Address pool link name."),
                )
                .block("family", NestedBlock::single(Self::family_block())),
        )
    }

    fn id_format(&self) -> &'static str {
        "<name>_-_<routing_instance>"
    }

    fn id_of(&self, data: &PoolData) -> String {
        format!("{}{ID_SEPARATOR}{}", data.name, data.routing_instance)
    }

    fn validate_config(&self, data: &PoolData, diags: &mut Diagnostics) {
        if let Some(Err(err)) = data.family.as_ref().map(PoolFamily::check_blocks) {
            diags.add_attribute_error(err.path, INVALID_FAMILY, err.message);
        }
    }

    async fn read_data(&self, session: &mut Session, id: &str) -> Result<Option<PoolData>> {
        let Some((name, routing_instance)) = id.split_once(ID_SEPARATOR) else {
            return Err(Error::Check(format!(
                "missing element(s) in id with separator {ID_SEPARATOR:?}"
            )));
        };
        let output = session
            .show_config(&PoolData::path(name, routing_instance))
            .await?;
        PoolData::from_output(name, routing_instance, &output)
    }

    async fn pre_check_create(&self, session: &mut Session, plan: &PoolData) -> Result<()> {
        Self::check_routing_instance(session, plan).await?;
        check_not_exists(self, session, &self.id_of(plan)).await
    }

    async fn pre_check_update(
        &self,
        session: &mut Session,
        plan: &PoolData,
        _state: &PoolData,
    ) -> Result<()> {
        Self::check_routing_instance(session, plan).await
    }

    fn upgrade_state(&self, version: i64, raw: Value) -> Result<Value> {
        match version {
            0 => upgrade_v0(raw),
            1 => Ok(raw),
            other => Err(Error::Check(format!(
                "no state upgrade from version {other} for {}",
                self.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::diag::Diagnostics;
    use crate::junos::Client;
    use crate::junos::fake::FakeDevice;
    use crate::lifecycle::{
        CONFIG_SET_ERROR, PrivateState, READ_ERROR, resource_create, resource_import, resource_read,
        upgrade_state,
    };

    fn inet_pool() -> PoolData {
        PoolData {
            name: "p1".to_string(),
            family: Some(PoolFamily {
                type_: INET.to_string(),
                network: Some("192.0.2.0/24".to_string()),
                inet_range: vec![PoolRange {
                    name: "r1".to_string(),
                    low: Some("192.0.2.10".to_string()),
                    high: Some("192.0.2.20".to_string()),
                    prefix_length: None,
                }],
                dhcp_attributes: Some(DhcpAttributes {
                    name_server: Some(vec!["192.0.2.53".to_string(), "192.0.2.54".to_string()]),
                    maximum_lease_time: Some(3600),
                    ..Default::default()
                }),
                xauth_attributes_primary_dns: Some("192.0.2.53/32".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_lines_inet() {
        assert_eq!(
            inet_pool().set().unwrap(),
            vec![
                "set access address-assignment pool p1",
                "set access address-assignment pool p1 family inet",
                "set access address-assignment pool p1 family inet network 192.0.2.0/24",
                "set access address-assignment pool p1 family inet range r1 low 192.0.2.10",
                "set access address-assignment pool p1 family inet range r1 high 192.0.2.20",
                "set access address-assignment pool p1 family inet dhcp-attributes maximum-lease-time 3600",
                "set access address-assignment pool p1 family inet dhcp-attributes name-server 192.0.2.53",
                "set access address-assignment pool p1 family inet dhcp-attributes name-server 192.0.2.54",
                "set access address-assignment pool p1 family inet xauth-attributes primary-dns 192.0.2.53/32",
            ]
        );
    }

    #[test]
    fn test_inet_range_refused_for_inet6() {
        let mut pool = inet_pool();
        if let Some(family) = pool.family.as_mut() {
            family.type_ = INET6.to_string();
            family.xauth_attributes_primary_dns = None;
        }
        let err = pool.set().unwrap_err();
        assert!(matches!(
            err,
            Error::Path(PathError { ref path, .. }) if path == "family.inet_range"
        ));
    }

    #[test]
    fn test_inet6_uses_prefix_keyword() {
        let pool = PoolData {
            name: "p6".to_string(),
            routing_instance: "cust-a".to_string(),
            family: Some(PoolFamily {
                type_: INET6.to_string(),
                network: Some("2001:db8::/64".to_string()),
                inet6_range: vec![PoolRange {
                    name: "r1".to_string(),
                    low: Some("2001:db8::10/128".to_string()),
                    high: Some("2001:db8::20/128".to_string()),
                    prefix_length: Some(64),
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let lines = pool.set().unwrap();
        assert_eq!(
            lines[2],
            "set routing-instances cust-a access address-assignment pool p6 family inet6 prefix 2001:db8::/64"
        );
        assert_eq!(
            pool.del(),
            vec!["delete routing-instances cust-a access address-assignment pool p6"]
        );

        let output = "set family inet6 prefix 2001:db8::/64\n\
                      set family inet6 range r1 low 2001:db8::10/128\n\
                      set family inet6 range r1 high 2001:db8::20/128\n\
                      set family inet6 range r1 prefix-length 64\n";
        let read = PoolData::from_output("p6", "cust-a", output).unwrap().unwrap();
        assert_eq!(read.family, pool.family);
    }

    #[tokio::test]
    async fn test_create_refuses_wrong_family_block() {
        let device = FakeDevice::new("mx960");
        let client = Client::fake(device.clone(), None);
        let mut pool = inet_pool();
        if let Some(family) = pool.family.as_mut() {
            family.type_ = INET6.to_string();
            family.xauth_attributes_primary_dns = None;
        }

        let mut diags = Diagnostics::new();
        assert!(
            resource_create(&AccessAddressAssignmentPool, &client, pool, &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, INVALID_FAMILY);
        assert_eq!(diag.path.as_deref(), Some("family.inet_range"));
        assert!(device.candidate().is_empty());
        assert!(device.commands().is_empty());
    }

    #[tokio::test]
    async fn test_empty_dhcp_attributes_refused() {
        let mut pool = inet_pool();
        if let Some(family) = pool.family.as_mut() {
            family.dhcp_attributes = Some(DhcpAttributes {
                name_server: Some(Vec::new()),
                ..Default::default()
            });
        }

        let mut diags = Diagnostics::new();
        AccessAddressAssignmentPool.validate_config(&pool, &mut diags);
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, INVALID_FAMILY);
        assert_eq!(diag.path.as_deref(), Some("family.dhcp_attributes"));

        let err = pool.set().unwrap_err();
        assert!(matches!(
            err,
            Error::Path(PathError { ref path, .. }) if path == "family.dhcp_attributes"
        ));

        let device = FakeDevice::new("mx960");
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();
        assert!(
            resource_create(&AccessAddressAssignmentPool, &client, pool, &mut diags)
                .await
                .is_none()
        );
        assert_eq!(
            diags.errors().next().unwrap().path.as_deref(),
            Some("family.dhcp_attributes")
        );
        assert!(device.running().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_line_not_attributed_to_pool_name() {
        let device = FakeDevice::new("mx960");
        device.reject_lines_containing("hold-down");
        let client = Client::fake(device.clone(), None);
        let pool = PoolData {
            name: "link".to_string(),
            hold_down: Some(true),
            ..Default::default()
        };

        let mut diags = Diagnostics::new();
        assert!(
            resource_create(&AccessAddressAssignmentPool, &client, pool, &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, CONFIG_SET_ERROR);
        assert_eq!(diag.path, None);
        assert!(diag.detail.contains("hold-down"));
    }

    #[tokio::test]
    async fn test_round_trip_and_import() {
        let device = FakeDevice::new("mx960");
        let client = Client::fake(device, None);
        let mut diags = Diagnostics::new();

        let created = resource_create(&AccessAddressAssignmentPool, &client, inet_pool(), &mut diags)
            .await
            .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(created.state.id.as_deref(), Some("p1_-_default"));

        let read = resource_read(
            &AccessAddressAssignmentPool,
            &client,
            &created.state,
            &PrivateState::new(),
            &mut diags,
        )
        .await
        .unwrap();
        assert_eq!(read.state, created.state);

        let imported = resource_import(&AccessAddressAssignmentPool, &client, "p1_-_default", &mut diags)
            .await
            .unwrap();
        assert_eq!(imported.state, created.state);

        let mut diags = Diagnostics::new();
        assert!(
            resource_import(&AccessAddressAssignmentPool, &client, "p1", &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, READ_ERROR);
        assert!(diag.detail.contains("missing element(s) in id with separator"));
    }

    #[test]
    fn test_upgrade_from_v0() {
        let v0 = json!({
            "id": "p1_-_default",
            "name": "p1",
            "routing_instance": "default",
            "active_drain": false,
            "hold_down": true,
            "link": null,
            "family": [{
                "type": "inet",
                "network": "192.0.2.0/24",
                "excluded_address": null,
                "excluded_range": [],
                "host": [],
                "inet_range": [{ "name": "r1", "low": "192.0.2.10", "high": "192.0.2.20" }],
                "inet6_range": [],
                "dhcp_attributes": [{ "domain_name": "example.com" }],
                "xauth_attributes_primary_dns": null
            }]
        });

        let mut diags = Diagnostics::new();
        let upgraded = upgrade_state(&AccessAddressAssignmentPool, 0, v0, &mut diags).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        let pool: PoolData = serde_json::from_value(upgraded).unwrap();
        assert_eq!(pool.active_drain, None);
        assert_eq!(pool.hold_down, Some(true));
        let family = pool.family.unwrap();
        assert_eq!(family.inet_range[0].high.as_deref(), Some("192.0.2.20"));
        assert_eq!(
            family.dhcp_attributes.unwrap().domain_name.as_deref(),
            Some("example.com")
        );

        let mut diags = Diagnostics::new();
        assert!(upgrade_state(&AccessAddressAssignmentPool, 3, json!({}), &mut diags).is_none());
        assert!(diags.has_error());
    }
}
