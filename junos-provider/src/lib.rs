//! # junos-provider
//!
//! Configuration engine of a Terraform provider for Junos devices.
//!
//! Resources map Junos configuration stanzas to schema attributes: each one
//! emits `set ...` lines from its model and parses
//! `show configuration ... | display set relative` back into it. Every
//! resource goes through the same session and transaction layer.
//!
//! ## Features
//!
//! - Junos CLI over an SSH shell via russh (password, key file or PEM key)
//! - Exclusive configuration lock with commit, and rollback on failure
//! - Client-scoped mutex serializing snapshot reads
//! - Template-method lifecycle: create, read, update, delete, import
//! - Versioned state upgraders
//! - Fake mode writing `set` lines to a file instead of a device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use junos_provider::diag::Diagnostics;
//! use junos_provider::junos::ClientBuilder;
//! use junos_provider::lifecycle::resource_create;
//! use junos_provider::resources::{NtpServerData, SystemNtpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), junos_provider::Error> {
//!     let client = ClientBuilder::new("192.0.2.1")
//!         .username("terraform")
//!         .password("secret")
//!         .build()?;
//!
//!     let plan = NtpServerData {
//!         address: "10.0.0.1".to_string(),
//!         prefer: Some(true),
//!         ..Default::default()
//!     };
//!     let mut diags = Diagnostics::new();
//!     if let Some(applied) = resource_create(&SystemNtpServer, &client, plan, &mut diags).await {
//!         println!("created {:?}", applied.state.id);
//!     }
//!     for diag in diags {
//!         eprintln!("{diag}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod data_sources;
pub mod diag;
pub mod error;
pub mod junos;
pub mod lifecycle;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod setline;
pub mod transport;

// Re-export main types for convenience
pub use diag::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use junos::{Client, ClientBuilder, Session};
pub use provider::{Provider, ProviderConfig};
