//! Resource lifecycle.
//!
//! Every resource goes through the same helpers:
//!
//! ```text
//! create:  validate ─► lock ─► pre_check_create ─► set() ─► commit ─► read back ─► post_check_create ─► unlock
//! read:    mutex ─► read_data ─► (empty output: removed from state)
//! update:  validate ─► lock ─► pre_check_update ─► del_opts(state) + set(plan) ─► commit ─► read back ─► unlock
//! delete:  lock ─► del() ─► commit
//! import:  mutex ─► read_data(id) ─► (empty output: "don't find ...")
//! ```
//!
//! Failures never escape as errors: they are recorded in [`Diagnostics`]
//! and the helper returns `None`. A failed commit leaves the candidate
//! cleared and the lock released (see [`ConfigTransaction`]).
//!
//! With `fake_create_set_file` configured, create (and update/delete when
//! asked) append their lines to the set file instead of reaching a device.

use std::fmt::Debug;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::diag::Diagnostics;
use crate::error::{Error, Result, SessionError};
use crate::junos::{Client, ConfigTransaction, Session};
use crate::schema::Schema;

pub const START_SESSION_ERROR: &str = "Start Session Error";
pub const CONFIG_LOCK_ERROR: &str = "Config Lock Error";
pub const PRE_CHECK_ERROR: &str = "Pre Check Error";
pub const CONFIG_SET_ERROR: &str = "Config Set Error";
pub const CONFIG_DEL_ERROR: &str = "Config Del Error";
pub const COMMIT_ERROR: &str = "Commit Error";
pub const POST_CHECK_ERROR: &str = "Post Check Error";
pub const NOT_FOUND_ERROR: &str = "Not Found Error";
pub const READ_ERROR: &str = "Config Read Error";
pub const UPGRADE_STATE_ERROR: &str = "Upgrade State Error";
pub const SET_FILE_ERROR: &str = "Fake Set File Error";

/// Private state blob stored next to the Terraform state.
pub type PrivateState = Map<String, Value>;

/// A resource's model: the struct mirroring its schema.
pub trait ResourceData:
    Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync
{
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    /// Lines configuring the object. Fails with a [`PathError`](crate::error::PathError)
    /// naming the offending attribute.
    fn set(&self) -> Result<Vec<String>>;

    /// Lines removing the object.
    fn del(&self) -> Vec<String>;

    /// Lines clearing everything `set` may have added, run before an update.
    fn del_opts(&self) -> Vec<String> {
        self.del()
    }
}

/// State and private state after a successful operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<D> {
    pub state: D,
    pub private: PrivateState,
}

/// A managed Junos configuration object.
///
/// The hooks have defaults; resources override the ones they need.
#[async_trait]
pub trait Resource: Send + Sync {
    type Data: ResourceData;

    /// Terraform type name, e.g. `junos_system_ntp_server`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Import id format shown when an import finds nothing.
    fn id_format(&self) -> &'static str {
        "<name>"
    }

    /// The id of a planned object.
    fn id_of(&self, data: &Self::Data) -> String;

    /// Checks beyond what the schema can express.
    fn validate_config(&self, _data: &Self::Data, _diags: &mut Diagnostics) {}

    /// Read the object back from the device; `None` when absent.
    async fn read_data(&self, session: &mut Session, id: &str) -> Result<Option<Self::Data>>;

    /// Runs with the configuration locked, before any line is loaded.
    ///
    /// Refuses to create over an existing object by default.
    async fn pre_check_create(&self, session: &mut Session, plan: &Self::Data) -> Result<()> {
        check_not_exists(self, session, &self.id_of(plan)).await
    }

    /// Runs instead of [`pre_check_create`](Self::pre_check_create) in fake set-file mode.
    fn pre_check_fake_create(&self, _plan: &Self::Data) -> Result<()> {
        Ok(())
    }

    /// Runs after a create commit with the object read back from the device.
    async fn post_check_create(
        &self,
        _session: &mut Session,
        _plan: &Self::Data,
        _fresh: &Self::Data,
    ) -> Result<()> {
        Ok(())
    }

    async fn pre_check_update(
        &self,
        _session: &mut Session,
        _plan: &Self::Data,
        _state: &Self::Data,
    ) -> Result<()> {
        Ok(())
    }

    /// Private state derived from the object as the device shows it.
    fn private_state(&self, _fresh: &Self::Data) -> PrivateState {
        PrivateState::new()
    }

    /// Carry values the device does not show from the prior state.
    fn reconcile_read(&self, _fresh: &mut Self::Data, _prior: &Self::Data, _private: &PrivateState) {
    }

    /// Migrate state JSON written with schema `version` to the current one.
    fn upgrade_state(&self, version: i64, raw: Value) -> Result<Value> {
        let current = self.schema().version;
        if version == current {
            return Ok(raw);
        }
        Err(Error::Check(format!(
            "no state upgrade from version {version} to {current} for {}",
            self.type_name()
        )))
    }
}

/// Fail when an object with `id` is already configured.
pub async fn check_not_exists<R: Resource + ?Sized>(
    rsc: &R,
    session: &mut Session,
    id: &str,
) -> Result<()> {
    if rsc.read_data(session, id).await?.is_some() {
        return Err(Error::Check(format!(
            "{} {} already exists",
            rsc.type_name(),
            id
        )));
    }
    Ok(())
}

/// Create the object from its plan.
pub async fn resource_create<R: Resource>(
    rsc: &R,
    client: &Client,
    mut plan: R::Data,
    diags: &mut Diagnostics,
) -> Option<Applied<R::Data>> {
    rsc.validate_config(&plan, diags);
    if diags.has_error() {
        return None;
    }
    let id = rsc.id_of(&plan);
    let comment = format!("create resource {}", rsc.type_name());

    if client.fake_create_set_file().is_some() {
        if let Err(err) = rsc.pre_check_fake_create(&plan) {
            diags.add_crate_error(PRE_CHECK_ERROR, &err);
            return None;
        }
        let lines = match plan.set() {
            Ok(lines) => lines,
            Err(err) => {
                diags.add_crate_error(CONFIG_SET_ERROR, &err);
                return None;
            }
        };
        write_set_file(client, &lines, &comment, diags).await?;
        plan.set_id(id);
        return Some(Applied {
            state: plan,
            private: PrivateState::new(),
        });
    }

    let mut session = start_session(client, diags).await?;
    let private = create_on_device(rsc, &mut session, &plan, &id, &comment, diags).await;
    close_session(session).await;

    let private = private?;
    info!("{} {} created", rsc.type_name(), id);
    plan.set_id(id);
    Some(Applied {
        state: plan,
        private,
    })
}

async fn create_on_device<R: Resource>(
    rsc: &R,
    session: &mut Session,
    plan: &R::Data,
    id: &str,
    comment: &str,
    diags: &mut Diagnostics,
) -> Option<PrivateState> {
    let mut tx = lock(session, diags).await?;

    if let Err(err) = rsc.pre_check_create(tx.session(), plan).await {
        diags.add_crate_error(PRE_CHECK_ERROR, &err);
        abort(tx).await;
        return None;
    }
    let lines = match plan.set() {
        Ok(lines) => lines,
        Err(err) => {
            diags.add_crate_error(CONFIG_SET_ERROR, &err);
            abort(tx).await;
            return None;
        }
    };
    if let Err(err) = tx.set(&lines).await {
        config_set_error(rsc, plan, CONFIG_SET_ERROR, &err, diags);
        abort(tx).await;
        return None;
    }
    if let Err(err) = tx.commit_locked(comment).await {
        diags.add_crate_error(COMMIT_ERROR, &err);
        return None;
    }

    // Checks see the committed configuration before the lock is released.
    let checked = match read_back(rsc, tx.session(), id, diags).await {
        Some(fresh) => match rsc.post_check_create(tx.session(), plan, &fresh).await {
            Ok(()) => Some(fresh),
            Err(err) => {
                diags.add_crate_error(POST_CHECK_ERROR, &err);
                None
            }
        },
        None => None,
    };
    unlock(tx).await;
    checked.map(|fresh| rsc.private_state(&fresh))
}

/// Refresh the state from the device.
///
/// Returns `None` with no error diagnostic when the object is gone and must
/// be removed from the state.
pub async fn resource_read<R: Resource>(
    rsc: &R,
    client: &Client,
    state: &R::Data,
    private: &PrivateState,
    diags: &mut Diagnostics,
) -> Option<Applied<R::Data>> {
    let Some(id) = state.id().map(str::to_string) else {
        diags.add_error(READ_ERROR, format!("{} state without id", rsc.type_name()));
        return None;
    };

    if client.fake_create_set_file().is_some() {
        // Nothing reached the device: keep the state as written.
        return Some(Applied {
            state: state.clone(),
            private: private.clone(),
        });
    }

    let mut session = start_session(client, diags).await?;
    let result = {
        let _guard = session.mutex().acquire().await;
        rsc.read_data(&mut session, &id).await
    };
    close_session(session).await;

    match result {
        Ok(Some(mut fresh)) => {
            fresh.set_id(id);
            rsc.reconcile_read(&mut fresh, state, private);
            Some(Applied {
                state: fresh,
                private: private.clone(),
            })
        }
        Ok(None) => {
            debug!("{} {} not found, removing from state", rsc.type_name(), id);
            None
        }
        Err(err) => {
            diags.add_crate_error(READ_ERROR, &err);
            None
        }
    }
}

/// Move the object from `state` to `plan`.
pub async fn resource_update<R: Resource>(
    rsc: &R,
    client: &Client,
    mut plan: R::Data,
    state: &R::Data,
    diags: &mut Diagnostics,
) -> Option<Applied<R::Data>> {
    rsc.validate_config(&plan, diags);
    if diags.has_error() {
        return None;
    }
    let id = state
        .id()
        .map(str::to_string)
        .unwrap_or_else(|| rsc.id_of(&plan));
    let comment = format!("update resource {}", rsc.type_name());

    if client.fake_update_also() {
        let mut lines = state.del_opts();
        match plan.set() {
            Ok(set) => lines.extend(set),
            Err(err) => {
                diags.add_crate_error(CONFIG_SET_ERROR, &err);
                return None;
            }
        }
        write_set_file(client, &lines, &comment, diags).await?;
        plan.set_id(id);
        return Some(Applied {
            state: plan,
            private: PrivateState::new(),
        });
    }

    let mut session = start_session(client, diags).await?;
    let private = update_on_device(rsc, &mut session, &plan, state, &id, &comment, diags).await;
    close_session(session).await;

    let private = private?;
    info!("{} {} updated", rsc.type_name(), id);
    plan.set_id(id);
    Some(Applied {
        state: plan,
        private,
    })
}

async fn update_on_device<R: Resource>(
    rsc: &R,
    session: &mut Session,
    plan: &R::Data,
    state: &R::Data,
    id: &str,
    comment: &str,
    diags: &mut Diagnostics,
) -> Option<PrivateState> {
    let mut tx = lock(session, diags).await?;

    if let Err(err) = rsc.pre_check_update(tx.session(), plan, state).await {
        diags.add_crate_error(PRE_CHECK_ERROR, &err);
        abort(tx).await;
        return None;
    }
    if let Err(err) = tx.set(&state.del_opts()).await {
        config_set_error(rsc, state, CONFIG_DEL_ERROR, &err, diags);
        abort(tx).await;
        return None;
    }
    let lines = match plan.set() {
        Ok(lines) => lines,
        Err(err) => {
            diags.add_crate_error(CONFIG_SET_ERROR, &err);
            abort(tx).await;
            return None;
        }
    };
    if let Err(err) = tx.set(&lines).await {
        config_set_error(rsc, plan, CONFIG_SET_ERROR, &err, diags);
        abort(tx).await;
        return None;
    }
    if let Err(err) = tx.commit_locked(comment).await {
        diags.add_crate_error(COMMIT_ERROR, &err);
        return None;
    }

    let fresh = read_back(rsc, tx.session(), id, diags).await;
    unlock(tx).await;
    fresh.map(|fresh| rsc.private_state(&fresh))
}

/// Remove the object.
///
/// `delete` of an absent statement is only a warning on Junos, so deleting
/// twice succeeds.
pub async fn resource_delete<R: Resource>(
    rsc: &R,
    client: &Client,
    state: &R::Data,
    diags: &mut Diagnostics,
) {
    let comment = format!("delete resource {}", rsc.type_name());
    let lines = state.del();

    if client.fake_delete_also() {
        write_set_file(client, &lines, &comment, diags).await;
        return;
    }

    let Some(mut session) = start_session(client, diags).await else {
        return;
    };
    if let Some(mut tx) = lock(&mut session, diags).await {
        if let Err(err) = tx.set(&lines).await {
            config_set_error(rsc, state, CONFIG_DEL_ERROR, &err, diags);
            abort(tx).await;
        } else if let Err(err) = tx.commit(&comment).await {
            diags.add_crate_error(COMMIT_ERROR, &err);
        } else {
            info!(
                "{} {} deleted",
                rsc.type_name(),
                state.id().unwrap_or_default()
            );
        }
    }
    close_session(session).await;
}

/// Import an existing object by id.
pub async fn resource_import<R: Resource>(
    rsc: &R,
    client: &Client,
    id: &str,
    diags: &mut Diagnostics,
) -> Option<Applied<R::Data>> {
    let mut session = start_session(client, diags).await?;
    let result = {
        let _guard = session.mutex().acquire().await;
        rsc.read_data(&mut session, id).await
    };
    close_session(session).await;

    match result {
        Ok(Some(mut fresh)) => {
            fresh.set_id(id.to_string());
            let private = rsc.private_state(&fresh);
            Some(Applied {
                state: fresh,
                private,
            })
        }
        Ok(None) => {
            diags.add_error(
                NOT_FOUND_ERROR,
                format!(
                    "don't find {} with id '{}' (id must be {})",
                    rsc.type_name(),
                    id,
                    rsc.id_format()
                ),
            );
            None
        }
        Err(err) => {
            diags.add_crate_error(READ_ERROR, &err);
            None
        }
    }
}

/// Upgrade state JSON from `version` and check it decodes as the current model.
pub fn upgrade_state<R: Resource>(
    rsc: &R,
    version: i64,
    raw: Value,
    diags: &mut Diagnostics,
) -> Option<Value> {
    let upgraded = match rsc.upgrade_state(version, raw) {
        Ok(value) => value,
        Err(err) => {
            diags.add_crate_error(UPGRADE_STATE_ERROR, &err);
            return None;
        }
    };
    if let Err(err) = serde_json::from_value::<R::Data>(upgraded.clone()) {
        diags.add_crate_error(UPGRADE_STATE_ERROR, &Error::State(err));
        return None;
    }
    Some(upgraded)
}

pub(crate) async fn start_session(client: &Client, diags: &mut Diagnostics) -> Option<Session> {
    match client.start_session().await {
        Ok(session) => Some(session),
        Err(err) => {
            diags.add_crate_error(START_SESSION_ERROR, &err);
            None
        }
    }
}

pub(crate) async fn close_session(session: Session) {
    if let Err(err) = session.close().await {
        warn!("failed to close session: {}", err);
    }
}

async fn lock<'a>(
    session: &'a mut Session,
    diags: &mut Diagnostics,
) -> Option<ConfigTransaction<'a>> {
    match session.begin().await {
        Ok(tx) => Some(tx),
        Err(err) => {
            diags.add_crate_error(CONFIG_LOCK_ERROR, &err);
            None
        }
    }
}

async fn unlock(tx: ConfigTransaction<'_>) {
    if let Err(err) = tx.unlock().await {
        warn!("failed to unlock configuration: {}", err);
    }
}

async fn abort(tx: ConfigTransaction<'_>) {
    if let Err(err) = tx.abort().await {
        warn!("failed to discard candidate configuration: {}", err);
    }
}

/// Attribute a rejected line to the schema attribute it came from.
///
/// Only segments after the object's own configuration path are matched
/// against the schema; that path is what `del()` deletes.
fn config_set_error<R: Resource>(
    rsc: &R,
    data: &R::Data,
    summary: &str,
    err: &Error,
    diags: &mut Diagnostics,
) {
    if let Error::Session(SessionError::ConfigSet { line, .. }) = err {
        let path = object_path(data).and_then(|object| rsc.schema().path_of_line(line, &object));
        if let Some(path) = path {
            diags.add_attribute_error(path, summary, err.to_string());
            return;
        }
    }
    diags.add_crate_error(summary, err);
}

fn object_path<D: ResourceData>(data: &D) -> Option<String> {
    data.del()
        .into_iter()
        .next()?
        .strip_prefix("delete ")
        .map(str::to_string)
}

async fn read_back<R: Resource>(
    rsc: &R,
    session: &mut Session,
    id: &str,
    diags: &mut Diagnostics,
) -> Option<R::Data> {
    match rsc.read_data(session, id).await {
        Ok(Some(fresh)) => Some(fresh),
        Ok(None) => {
            diags.add_error(
                NOT_FOUND_ERROR,
                format!("{} with id '{}' not found after commit", rsc.type_name(), id),
            );
            None
        }
        Err(err) => {
            diags.add_crate_error(READ_ERROR, &err);
            None
        }
    }
}

async fn write_set_file(
    client: &Client,
    lines: &[String],
    comment: &str,
    diags: &mut Diagnostics,
) -> Option<()> {
    match append_set_file(client, lines, comment).await {
        Ok(()) => Some(()),
        Err(err) => {
            diags.add_crate_error(SET_FILE_ERROR, &err);
            None
        }
    }
}

async fn append_set_file(client: &Client, lines: &[String], comment: &str) -> Result<()> {
    let Some(mut session) = client.start_set_file_session().await? else {
        return Ok(());
    };
    let mut tx = session.begin().await?;
    tx.set(lines).await?;
    tx.commit(comment).await?;
    session.close().await
}
