//! Provider entry point.
//!
//! The plugin runtime speaks JSON: configuration, plans and states arrive
//! as [`serde_json::Value`]s keyed by Terraform type name. [`Provider`]
//! holds the configured [`Client`] and a registry of type-erased resources
//! and data sources, decodes the JSON into each resource's model and runs
//! the lifecycle helpers.
//!
//! ```rust,no_run
//! use junos_provider::diag::Diagnostics;
//! use junos_provider::provider::Provider;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), junos_provider::Error> {
//! let provider = Provider::configure(json!({ "ip": "192.0.2.1", "password": "secret" }))?;
//! let mut diags = Diagnostics::new();
//! let stored = provider
//!     .create(
//!         "junos_system_ntp_server",
//!         json!({ "address": "10.0.0.1", "prefer": true }),
//!         &mut diags,
//!     )
//!     .await;
//! assert!(stored.is_some() || diags.has_error());
//! # Ok(())
//! # }
//! ```

mod config;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use config::ProviderConfig;

use crate::data_sources::{DataSource, SystemInformationSource, data_source_read};
use crate::diag::Diagnostics;
use crate::error::{Error, Result};
use crate::junos::Client;
use crate::lifecycle::{
    Applied, PrivateState, Resource, resource_create, resource_delete, resource_import,
    resource_read, resource_update, upgrade_state,
};
use crate::resources::{
    AccessAddressAssignmentPool, LldpMedInterface, RoutingInstance, SecurityIkePolicy,
    SystemLoginUser, SystemNtpServer,
};
use crate::schema::Schema;

const DECODE_ERROR: &str = "Decode Error";
const ENCODE_ERROR: &str = "Encode Error";
const UNKNOWN_TYPE_ERROR: &str = "Unknown Type";
const REDACTED: &str = "<sensitive>";

/// State JSON and private state of one resource instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub state: Value,
    pub private: PrivateState,
}

/// A resource behind JSON in and out.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Schema checks, then the resource's own checks on the decoded model.
    fn validate(&self, config: &Value, diags: &mut Diagnostics);

    async fn create(&self, client: &Client, plan: Value, diags: &mut Diagnostics)
    -> Option<StoredState>;

    async fn read(
        &self,
        client: &Client,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState>;

    async fn update(
        &self,
        client: &Client,
        plan: Value,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState>;

    async fn delete(&self, client: &Client, stored: &StoredState, diags: &mut Diagnostics);

    async fn import(&self, client: &Client, id: &str, diags: &mut Diagnostics)
    -> Option<StoredState>;

    fn upgrade_state(&self, version: i64, raw: Value, diags: &mut Diagnostics) -> Option<Value>;
}

/// A data source behind JSON in and out.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &Client, config: Value, diags: &mut Diagnostics) -> Option<Value>;
}

struct Erased<T>(T);

fn decode<D: DeserializeOwned>(value: Value, diags: &mut Diagnostics) -> Option<D> {
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
            diags.add_crate_error(DECODE_ERROR, &Error::State(err));
            None
        }
    }
}

fn encode<D: Serialize>(applied: Applied<D>, diags: &mut Diagnostics) -> Option<StoredState> {
    match serde_json::to_value(&applied.state) {
        Ok(state) => Some(StoredState {
            state,
            private: applied.private,
        }),
        Err(err) => {
            diags.add_crate_error(ENCODE_ERROR, &Error::State(err));
            None
        }
    }
}

/// Copy of `value` with the attributes at `paths` replaced, for logging.
fn redact(value: &Value, paths: &[String]) -> Value {
    let mut value = value.clone();
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        redact_path(&mut value, &segments);
    }
    value
}

fn redact_path(value: &mut Value, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    match value {
        Value::Array(items) => {
            for item in items {
                redact_path(item, segments);
            }
        }
        Value::Object(map) => {
            let Some(child) = map.get_mut(*first) else {
                return;
            };
            if rest.is_empty() {
                if !child.is_null() {
                    *child = Value::String(REDACTED.to_string());
                }
            } else {
                redact_path(child, rest);
            }
        }
        _ => {}
    }
}

#[async_trait]
impl<R: Resource + 'static> DynResource for Erased<R> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        self.0.schema().validate(config, diags);
        if diags.has_error() {
            return;
        }
        if let Some(data) = decode::<R::Data>(config.clone(), diags) {
            self.0.validate_config(&data, diags);
        }
    }

    async fn create(
        &self,
        client: &Client,
        plan: Value,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        debug!(
            "create {} {}",
            self.type_name(),
            redact(&plan, &self.schema().sensitive_paths())
        );
        let plan = decode::<R::Data>(plan, diags)?;
        let applied = resource_create(&self.0, client, plan, diags).await?;
        encode(applied, diags)
    }

    async fn read(
        &self,
        client: &Client,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let state = decode::<R::Data>(stored.state.clone(), diags)?;
        let applied = resource_read(&self.0, client, &state, &stored.private, diags).await?;
        encode(applied, diags)
    }

    async fn update(
        &self,
        client: &Client,
        plan: Value,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        debug!(
            "update {} {}",
            self.type_name(),
            redact(&plan, &self.schema().sensitive_paths())
        );
        let plan = decode::<R::Data>(plan, diags)?;
        let state = decode::<R::Data>(stored.state.clone(), diags)?;
        let applied = resource_update(&self.0, client, plan, &state, diags).await?;
        encode(applied, diags)
    }

    async fn delete(&self, client: &Client, stored: &StoredState, diags: &mut Diagnostics) {
        if let Some(state) = decode::<R::Data>(stored.state.clone(), diags) {
            resource_delete(&self.0, client, &state, diags).await;
        }
    }

    async fn import(
        &self,
        client: &Client,
        id: &str,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let applied = resource_import(&self.0, client, id, diags).await?;
        encode(applied, diags)
    }

    fn upgrade_state(&self, version: i64, raw: Value, diags: &mut Diagnostics) -> Option<Value> {
        upgrade_state(&self.0, version, raw, diags)
    }
}

#[async_trait]
impl<D: DataSource + 'static> DynDataSource for Erased<D> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    async fn read(&self, client: &Client, config: Value, diags: &mut Diagnostics) -> Option<Value> {
        let config = decode::<D::Data>(config, diags)?;
        let data = data_source_read(&self.0, client, config, diags).await?;
        match serde_json::to_value(data) {
            Ok(value) => Some(value),
            Err(err) => {
                diags.add_crate_error(ENCODE_ERROR, &Error::State(err));
                None
            }
        }
    }
}

/// A configured provider: the device client and every registered type.
pub struct Provider {
    client: Client,
    resources: IndexMap<&'static str, Box<dyn DynResource>>,
    data_sources: IndexMap<&'static str, Box<dyn DynDataSource>>,
}

impl Provider {
    /// Register the catalog on top of `client`.
    pub fn new(client: Client) -> Self {
        let mut provider = Self {
            client,
            resources: IndexMap::new(),
            data_sources: IndexMap::new(),
        };
        provider.register_resource(AccessAddressAssignmentPool);
        provider.register_resource(LldpMedInterface);
        provider.register_resource(RoutingInstance);
        provider.register_resource(SecurityIkePolicy);
        provider.register_resource(SystemLoginUser);
        provider.register_resource(SystemNtpServer);
        provider.register_data_source(SystemInformationSource);
        provider
    }

    /// Decode the provider block, fill it from the environment and connect settings.
    pub fn configure(config: Value) -> Result<Self> {
        let client = ProviderConfig::from_json(config)?.with_env()?.into_client()?;
        Ok(Self::new(client))
    }

    pub fn register_resource<R: Resource + 'static>(&mut self, rsc: R) {
        self.resources.insert(rsc.type_name(), Box::new(Erased(rsc)));
    }

    pub fn register_data_source<D: DataSource + 'static>(&mut self, ds: D) {
        self.data_sources.insert(ds.type_name(), Box::new(Erased(ds)));
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn resource_schema(&self, type_name: &str) -> Option<Schema> {
        self.resources.get(type_name).map(|r| r.schema())
    }

    pub fn data_source_schema(&self, type_name: &str) -> Option<Schema> {
        self.data_sources.get(type_name).map(|d| d.schema())
    }

    fn resource(&self, type_name: &str, diags: &mut Diagnostics) -> Option<&dyn DynResource> {
        let found = self.resources.get(type_name).map(|r| r.as_ref());
        if found.is_none() {
            diags.add_error(
                UNKNOWN_TYPE_ERROR,
                format!("resource type {type_name} is not supported"),
            );
        }
        found
    }

    pub fn validate_resource_config(&self, type_name: &str, config: &Value, diags: &mut Diagnostics) {
        if let Some(rsc) = self.resource(type_name, diags) {
            rsc.validate(config, diags);
        }
    }

    pub async fn create(
        &self,
        type_name: &str,
        plan: Value,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let rsc = self.resource(type_name, diags)?;
        rsc.create(&self.client, plan, diags).await
    }

    pub async fn read(
        &self,
        type_name: &str,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let rsc = self.resource(type_name, diags)?;
        rsc.read(&self.client, stored, diags).await
    }

    pub async fn update(
        &self,
        type_name: &str,
        plan: Value,
        stored: &StoredState,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let rsc = self.resource(type_name, diags)?;
        rsc.update(&self.client, plan, stored, diags).await
    }

    pub async fn delete(&self, type_name: &str, stored: &StoredState, diags: &mut Diagnostics) {
        if let Some(rsc) = self.resource(type_name, diags) {
            rsc.delete(&self.client, stored, diags).await;
        }
    }

    pub async fn import(
        &self,
        type_name: &str,
        id: &str,
        diags: &mut Diagnostics,
    ) -> Option<StoredState> {
        let rsc = self.resource(type_name, diags)?;
        rsc.import(&self.client, id, diags).await
    }

    pub fn upgrade_state(
        &self,
        type_name: &str,
        version: i64,
        raw: Value,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        let rsc = self.resource(type_name, diags)?;
        rsc.upgrade_state(version, raw, diags)
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: Value,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        let Some(ds) = self.data_sources.get(type_name) else {
            diags.add_error(
                UNKNOWN_TYPE_ERROR,
                format!("data source type {type_name} is not supported"),
            );
            return None;
        };
        ds.read(&self.client, config, diags).await
    }
}
