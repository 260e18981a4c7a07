//! Channel layer: prompt detection on the raw CLI byte stream.
//!
//! The device shell is a plain byte stream; output is accumulated in a
//! [`PatternBuffer`] (ANSI escapes stripped) until one of the Junos prompts
//! shows up at its tail.

mod buffer;
mod prompt;

pub use buffer::PatternBuffer;
pub use prompt::{CliMode, JunosPrompt};
