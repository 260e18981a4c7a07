//! NTP server example
//!
//! Configures a provider from the `JUNOS_*` environment variables, creates a
//! `junos_system_ntp_server`, reads it back and deletes it.
//!
//! # Usage
//!
//! ```bash
//! JUNOS_HOST=192.0.2.1 JUNOS_USERNAME=admin JUNOS_PASSWORD=secret \
//!     cargo run --example ntp_server -- 10.0.0.1
//! ```
//!
//! With `JUNOS_FAKECREATE_SETFILE=/tmp/junos.set` the lines are written to
//! that file instead of the device.

use std::env;

use junos_provider::diag::Diagnostics;
use junos_provider::provider::Provider;
use serde_json::json;

const NTP_SERVER: &str = "junos_system_ntp_server";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let address = env::args().nth(1).unwrap_or_else(|| "10.0.0.1".to_string());
    let provider = Provider::configure(json!({}))?;

    let plan = json!({ "address": address, "prefer": true });
    let mut diags = Diagnostics::new();
    provider.validate_resource_config(NTP_SERVER, &plan, &mut diags);

    if !diags.has_error() {
        if let Some(stored) = provider.create(NTP_SERVER, plan, &mut diags).await {
            println!("created: {}", stored.state);

            match provider.read(NTP_SERVER, &stored, &mut diags).await {
                Some(read) => println!("read back: {}", read.state),
                None => println!("not found on read"),
            }

            provider.delete(NTP_SERVER, &stored, &mut diags).await;
            println!("deleted");
        }
    }

    for diag in diags.iter() {
        eprintln!("{diag}");
    }
    if diags.has_error() {
        std::process::exit(1);
    }
    Ok(())
}
