//! `junos_system_information`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DataSource;
use crate::error::Result;
use crate::junos::Session;
use crate::schema::{Attribute, Block, Schema};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInformationData {
    pub id: Option<String>,
    pub host_name: Option<String>,
    pub hardware_model: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
}

/// Host name, model and OS of the device, gathered when the session opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInformationSource;

#[async_trait]
impl DataSource for SystemInformationSource {
    type Data = SystemInformationData;

    fn type_name(&self) -> &'static str {
        "junos_system_information"
    }

    fn schema(&self) -> Schema {
        let computed = |description: &str| Attribute::string().computed().description(description);
        Schema::new(
            0,
            Block::new("Get information of the Junos device system information.")
                .attribute("id", Attribute::id())
                .attribute("host_name", computed("Hostname of the Junos device."))
                .attribute("hardware_model", computed("Type of hardware/software of Junos device."))
                .attribute("os_name", computed("Operating system name of Junos."))
                .attribute("os_version", computed("Software version of Junos.")),
        )
    }

    async fn read(
        &self,
        session: &mut Session,
        _config: SystemInformationData,
    ) -> Result<SystemInformationData> {
        let info = session.system_information();
        Ok(SystemInformationData {
            id: Some(info.host_name.clone()),
            host_name: Some(info.host_name.clone()),
            hardware_model: Some(info.hardware_model.clone()),
            os_name: Some(info.os_name.clone()),
            os_version: Some(info.os_version.clone()),
        })
    }
}
