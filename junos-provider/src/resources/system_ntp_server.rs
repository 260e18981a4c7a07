//! `junos_system_ntp_server`: `system ntp server <address>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::checks::check_routing_instance_exists;
use super::{flag, parse_output};
use crate::error::{Error, Result};
use crate::junos::Session;
use crate::lifecycle::{Resource, ResourceData, check_not_exists};
use crate::schema::{Attribute, Block, Schema, Validator};
use crate::setline::{ConfigItem, SetLines};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NtpServerData {
    pub id: Option<String>,
    pub address: String,
    pub key: Option<i64>,
    pub prefer: Option<bool>,
    pub routing_instance: Option<String>,
    pub version: Option<i64>,
}

impl NtpServerData {
    fn prefix(address: &str) -> String {
        format!("set system ntp server {address}")
    }

    /// Parse `show configuration system ntp server <address> | display set relative`.
    pub fn from_output(address: &str, output: &str) -> Result<Option<Self>> {
        let data = Self {
            address: address.to_string(),
            ..Default::default()
        };
        parse_output(output, data, Self::parse_line)
    }

    fn parse_line(&mut self, item: &mut ConfigItem) -> Result<()> {
        match item.next_segment().as_deref() {
            Some("key") => self.key = Some(item.take_int()?),
            Some("prefer") => self.prefer = Some(true),
            Some("routing-instance") => self.routing_instance = Some(item.take_value()?),
            Some("version") => self.version = Some(item.take_int()?),
            _ => {}
        }
        Ok(())
    }
}

impl ResourceData for NtpServerData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&self) -> Result<Vec<String>> {
        let mut lines = SetLines::new(Self::prefix(&self.address));
        lines.bare();
        if let Some(key) = self.key {
            lines.push(format!("key {key}"));
        }
        if flag(self.prefer) {
            lines.push("prefer");
        }
        if let Some(instance) = &self.routing_instance {
            lines.push_value("routing-instance", instance);
        }
        if let Some(version) = self.version {
            lines.push(format!("version {version}"));
        }
        Ok(lines.into_lines())
    }

    fn del(&self) -> Vec<String> {
        vec![format!("delete system ntp server {}", self.address)]
    }
}

/// The `junos_system_ntp_server` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNtpServer;

impl SystemNtpServer {
    async fn check_routing_instance(session: &mut Session, data: &NtpServerData) -> Result<()> {
        if let Some(instance) = &data.routing_instance {
            if !check_routing_instance_exists(session, instance).await? {
                return Err(Error::Check(format!(
                    "routing instance {instance} doesn't exist"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for SystemNtpServer {
    type Data = NtpServerData;

    fn type_name(&self) -> &'static str {
        "junos_system_ntp_server"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            0,
            Block::new("Configure a system ntp server.")
                .attribute("id", Attribute::id())
                .attribute(
                    "address",
                    Attribute::string()
                        .required()
                        .description("Address of server.")
                        .validator(Validator::IpAddress),
                )
                .attribute(
                    "key",
                    Attribute::int64()
                        .description("Authentication key.")
                        .validator(Validator::Int64Between(1, 65534)),
                )
                .attribute(
                    "prefer",
                    Attribute::bool().description("Prefer this peer_serv."),
                )
                .attribute(
                    "routing_instance",
                    Attribute::string()
                        .description("Routing instance through which server is reachable.")
                        .validator(Validator::LengthBetween(1, 63))
                        .validator(Validator::Regex {
                            pattern: r"^[0-9A-Za-z_\-\.]+$",
                            message: "must only contain letters, digits, '_', '-' and '.'",
                        }),
                )
                .attribute(
                    "version",
                    Attribute::int64()
                        .description("NTP version to use.")
                        .validator(Validator::Int64Between(1, 4)),
                ),
        )
    }

    fn id_format(&self) -> &'static str {
        "<address>"
    }

    fn id_of(&self, data: &NtpServerData) -> String {
        data.address.clone()
    }

    async fn read_data(&self, session: &mut Session, id: &str) -> Result<Option<NtpServerData>> {
        let output = session
            .show_config(&format!("system ntp server {id}"))
            .await?;
        NtpServerData::from_output(id, &output)
    }

    async fn pre_check_create(&self, session: &mut Session, plan: &NtpServerData) -> Result<()> {
        Self::check_routing_instance(session, plan).await?;
        check_not_exists(self, session, &plan.address).await
    }

    async fn pre_check_update(
        &self,
        session: &mut Session,
        plan: &NtpServerData,
        _state: &NtpServerData,
    ) -> Result<()> {
        Self::check_routing_instance(session, plan).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::junos::fake::FakeDevice;
    use crate::junos::{Client, FakeSetFile};
    use crate::lifecycle::{
        COMMIT_ERROR, CONFIG_LOCK_ERROR, NOT_FOUND_ERROR, PRE_CHECK_ERROR, PrivateState,
        resource_create, resource_delete, resource_import, resource_read, resource_update,
    };

    fn plan(address: &str) -> NtpServerData {
        NtpServerData {
            address: address.to_string(),
            prefer: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_emits_exact_lines() {
        assert_eq!(
            plan("10.0.0.1").set().unwrap(),
            vec![
                "set system ntp server 10.0.0.1",
                "set system ntp server 10.0.0.1 prefer",
            ]
        );
    }

    #[test]
    fn test_read_prefer_back() {
        let mut data = NtpServerData::from_output("10.0.0.1", "set prefer\n")
            .unwrap()
            .unwrap();
        data.set_id("10.0.0.1".to_string());
        assert_eq!(data.address, "10.0.0.1");
        assert_eq!(data.prefer, Some(true));
        assert_eq!(data.id.as_deref(), Some("10.0.0.1"));

        assert_eq!(NtpServerData::from_output("10.0.0.1", "").unwrap(), None);
    }

    #[test]
    fn test_read_all_options() {
        let data = NtpServerData::from_output(
            "10.0.0.2",
            "set\nset key 12\nset routing-instance mgmt\nset version 3\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(data.key, Some(12));
        assert_eq!(data.routing_instance.as_deref(), Some("mgmt"));
        assert_eq!(data.version, Some(3));
        assert_eq!(data.prefer, None);
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = FakeDevice::new("mx960")
            .with_running(&["set routing-instances mgmt instance-type virtual-router"]);
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        let mut wanted = plan("10.0.0.1");
        wanted.key = Some(5);
        wanted.routing_instance = Some("mgmt".to_string());
        wanted.version = Some(4);

        let created = resource_create(&SystemNtpServer, &client, wanted.clone(), &mut diags)
            .await
            .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(created.state.id.as_deref(), Some("10.0.0.1"));
        assert_eq!(device.commits(), vec!["create resource junos_system_ntp_server"]);
        assert!(!device.is_locked());

        let read = resource_read(
            &SystemNtpServer,
            &client,
            &created.state,
            &PrivateState::new(),
            &mut diags,
        )
        .await
        .unwrap();
        wanted.id = Some("10.0.0.1".to_string());
        assert_eq!(read.state, wanted);
    }

    #[tokio::test]
    async fn test_create_pre_checks() {
        let device = FakeDevice::new("mx960").with_running(&["set system ntp server 10.0.0.1"]);
        let client = Client::fake(device.clone(), None);

        let mut diags = Diagnostics::new();
        assert!(
            resource_create(&SystemNtpServer, &client, plan("10.0.0.1"), &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, PRE_CHECK_ERROR);
        assert!(diag.detail.contains("already exists"));

        let mut diags = Diagnostics::new();
        let mut missing_ri = plan("10.0.0.2");
        missing_ri.routing_instance = Some("nope".to_string());
        assert!(
            resource_create(&SystemNtpServer, &client, missing_ri, &mut diags)
                .await
                .is_none()
        );
        assert!(diags.errors().next().unwrap().detail.contains("nope doesn't exist"));

        assert!(device.commits().is_empty());
        assert!(!device.is_locked());
        assert!(device.candidate().is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces_device_text() {
        let device = FakeDevice::new("mx960");
        device.fail_next_commit("error: configuration check-out failed");
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        assert!(
            resource_create(&SystemNtpServer, &client, plan("10.0.0.1"), &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, COMMIT_ERROR);
        assert!(diag.detail.contains("configuration check-out failed"));
        assert!(!device.is_locked());
        assert!(device.running().is_empty());
    }

    #[tokio::test]
    async fn test_lock_contention_is_reported() {
        let device = FakeDevice::new("mx960");
        device.hold_lock_elsewhere(true);
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        assert!(
            resource_create(&SystemNtpServer, &client, plan("10.0.0.1"), &mut diags)
                .await
                .is_none()
        );
        assert_eq!(diags.errors().next().unwrap().summary, CONFIG_LOCK_ERROR);
        assert_eq!(device.lock_attempts(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_options() {
        let device = FakeDevice::new("mx960").with_running(&[
            "set system ntp server 10.0.0.1",
            "set system ntp server 10.0.0.1 prefer",
        ]);
        let client = Client::fake(device.clone(), None);
        let mut diags = Diagnostics::new();

        let mut state = plan("10.0.0.1");
        state.id = Some("10.0.0.1".to_string());
        let mut next = state.clone();
        next.prefer = None;
        next.version = Some(3);

        let updated = resource_update(&SystemNtpServer, &client, next, &state, &mut diags)
            .await
            .unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(updated.state.version, Some(3));
        assert_eq!(
            device.running(),
            vec![
                "set system ntp server 10.0.0.1",
                "set system ntp server 10.0.0.1 version 3",
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_twice_is_idempotent() {
        let device = FakeDevice::new("mx960").with_running(&[
            "set system ntp server 10.0.0.1",
            "set system ntp server 10.0.0.1 prefer",
            "set system ntp server 10.0.0.10",
        ]);
        let client = Client::fake(device.clone(), None);
        let state = plan("10.0.0.1");

        for _ in 0..2 {
            let mut diags = Diagnostics::new();
            resource_delete(&SystemNtpServer, &client, &state, &mut diags).await;
            assert!(diags.is_empty(), "{diags:?}");
        }
        assert_eq!(device.running(), vec!["set system ntp server 10.0.0.10"]);
        assert_eq!(device.commits().len(), 2);

        let mut diags = Diagnostics::new();
        let mut gone = state.clone();
        gone.id = Some("10.0.0.1".to_string());
        let read = resource_read(&SystemNtpServer, &client, &gone, &PrivateState::new(), &mut diags).await;
        assert!(read.is_none());
        assert!(!diags.has_error());
    }

    #[tokio::test]
    async fn test_import() {
        let device = FakeDevice::new("mx960").with_running(&["set system ntp server 10.0.0.1"]);
        let client = Client::fake(device, None);

        let mut diags = Diagnostics::new();
        let imported = resource_import(&SystemNtpServer, &client, "10.0.0.1", &mut diags)
            .await
            .unwrap();
        assert_eq!(imported.state.id.as_deref(), Some("10.0.0.1"));
        assert_eq!(imported.state.prefer, None);

        let mut diags = Diagnostics::new();
        assert!(
            resource_import(&SystemNtpServer, &client, "10.0.0.9", &mut diags)
                .await
                .is_none()
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.summary, NOT_FOUND_ERROR);
        assert_eq!(
            diag.detail,
            "don't find junos_system_ntp_server with id '10.0.0.9' (id must be <address>)"
        );
    }

    #[tokio::test]
    async fn test_fake_set_file_mode() {
        let path = std::env::temp_dir().join(format!("junos-ntp-{}.set", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let device = FakeDevice::new("mx960");
        let client = Client::fake(
            device.clone(),
            Some(FakeSetFile {
                path: path.clone(),
                update_also: false,
                delete_also: true,
            }),
        );

        let mut diags = Diagnostics::new();
        let created = resource_create(&SystemNtpServer, &client, plan("10.0.0.1"), &mut diags)
            .await
            .unwrap();
        resource_delete(&SystemNtpServer, &client, &created.state, &mut diags).await;
        assert!(diags.is_empty(), "{diags:?}");

        assert!(device.commits().is_empty());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "set system ntp server 10.0.0.1\n\
             set system ntp server 10.0.0.1 prefer\n\
             delete system ntp server 10.0.0.1\n"
        );
        std::fs::remove_file(&path).unwrap();
    }
}
