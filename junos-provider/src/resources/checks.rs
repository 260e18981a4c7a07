//! Existence checks shared by resource pre-checks.

use crate::error::Result;
use crate::junos::Session;
use crate::setline::is_empty_output;

/// Name of the master instance, always present.
pub const DEFAULT_ROUTING_INSTANCE: &str = "default";

/// Whether `routing-instances <name>` is configured.
///
/// `default` is the master instance and always exists.
pub async fn check_routing_instance_exists(session: &mut Session, name: &str) -> Result<bool> {
    if name == DEFAULT_ROUTING_INSTANCE {
        return Ok(true);
    }
    let output = session
        .show_config(&format!("routing-instances {name}"))
        .await?;
    Ok(!is_empty_output(&output))
}

/// Whether `security zones security-zone <name>` is configured.
pub async fn check_security_zone_exists(session: &mut Session, name: &str) -> Result<bool> {
    let output = session
        .show_config(&format!("security zones security-zone {name}"))
        .await?;
    Ok(!is_empty_output(&output))
}
