//! Codec for Junos `set` lines.
//!
//! Emission builds `set <prefix> <suffix>` lines with Junos quoting.
//! Parsing tokenizes each line of `display set relative` output once into
//! segments and lets a resource dispatch on the leading segments.

mod emit;
mod parse;
mod secret;

pub use emit::{SetLines, quote};
pub use parse::{ConfigItem, relative_items, tokenize};
pub use secret::decode_secret;

/// Separator between the parts of a composite resource id.
pub const ID_SEPARATOR: &str = "_-_";

/// Suffix appended to `show configuration` queries.
pub const DISPLAY_SET_RELATIVE: &str = " | display set relative";

/// Prefix of `show configuration` queries.
pub const SHOW_CONFIG: &str = "show configuration ";

/// Whether `show configuration` printed nothing for the queried level.
pub fn is_empty_output(output: &str) -> bool {
    output.lines().all(|line| line.trim().is_empty())
}

/// Build a `show configuration <path> | display set relative` command.
pub fn show_config_relative(path: &str) -> String {
    format!("{SHOW_CONFIG}{}{DISPLAY_SET_RELATIVE}", path.trim_end())
}
