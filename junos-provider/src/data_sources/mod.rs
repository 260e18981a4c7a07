//! Data sources: read-only views of device facts.

mod system_information;

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use system_information::{SystemInformationData, SystemInformationSource};

use crate::diag::Diagnostics;
use crate::error::Result;
use crate::junos::{Client, Session};
use crate::lifecycle::{READ_ERROR, close_session, start_session};
use crate::schema::Schema;

/// A read-only Terraform data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Data: Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Fill the data source from the device, starting from its configuration.
    async fn read(&self, session: &mut Session, config: Self::Data) -> Result<Self::Data>;
}

/// Read a data source in its own session.
pub async fn data_source_read<D: DataSource>(
    ds: &D,
    client: &Client,
    config: D::Data,
    diags: &mut Diagnostics,
) -> Option<D::Data> {
    let mut session = start_session(client, diags).await?;
    let result = {
        let _guard = session.mutex().acquire().await;
        ds.read(&mut session, config).await
    };
    close_session(session).await;

    match result {
        Ok(data) => Some(data),
        Err(err) => {
            diags.add_crate_error(READ_ERROR, &err);
            None
        }
    }
}
