//! Resource catalog.
//!
//! Each module holds one resource: its schema, the model mirroring it,
//! `set()`/`del()` emitting configuration lines, and a pure parser for
//! `display set relative` output.

mod access_address_assignment_pool;
mod checks;
mod lldpmed_interface;
mod routing_instance;
mod security_ike_policy;
mod system_login_user;
mod system_ntp_server;

pub use access_address_assignment_pool::{
    AccessAddressAssignmentPool, DhcpAttributes, PoolData, PoolFamily, PoolHost, PoolRange,
};
pub use checks::{check_routing_instance_exists, check_security_zone_exists};
pub use lldpmed_interface::{CivicCaType, LldpMedInterface, LldpMedInterfaceData, LldpMedLocation};
pub use routing_instance::{RoutingInstance, RoutingInstanceData};
pub use security_ike_policy::{IkePolicyData, SecurityIkePolicy};
pub use system_login_user::{LoginUserAuthentication, LoginUserData, SystemLoginUser};
pub use system_ntp_server::{NtpServerData, SystemNtpServer};

use crate::error::Result;
use crate::setline::{ConfigItem, is_empty_output, relative_items};

/// Run `parse` over every item of `display set relative` output.
///
/// Returns `None` when the device printed nothing.
fn parse_output<D, F>(output: &str, mut data: D, mut parse: F) -> Result<Option<D>>
where
    F: FnMut(&mut D, &mut ConfigItem) -> Result<()>,
{
    if is_empty_output(output) {
        return Ok(None);
    }
    for mut item in relative_items(output) {
        parse(&mut data, &mut item)?;
    }
    Ok(Some(data))
}

/// `Some(true)` or `None`, the way Junos flags read back.
fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}
