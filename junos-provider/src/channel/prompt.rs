//! Junos prompt patterns.
//!
//! ```text
//! user@router>              # operational mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>
//! [edit]
//! user@router#              # configuration mode
//! ```
//!
//! Prompt patterns are adapted from scrapli's JunOS driver. They are anchored
//! at the very end of the buffer: a prompt is only a prompt once the device
//! stops writing after it.

use regex::bytes::Regex;

use super::buffer::PatternBuffer;

/// CLI mode inferred from the prompt character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    /// `>` prompt.
    Operational,
    /// `#` prompt.
    Configuration,
}

impl CliMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CliMode::Operational => "operational",
            CliMode::Configuration => "configuration",
        }
    }
}

/// Compiled Junos prompt patterns.
#[derive(Debug, Clone)]
pub struct JunosPrompt {
    operational: Regex,
    configuration: Regex,
}

const OPERATIONAL: &str = r"(?m)^[\w\-@()/:\.]{1,63}>\s?\z";
const CONFIGURATION: &str = r"(?m)^[\w\-@()/:\.]{1,63}#\s?\z";

impl JunosPrompt {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            operational: Regex::new(OPERATIONAL)?,
            configuration: Regex::new(CONFIGURATION)?,
        })
    }

    /// Detect a prompt at the tail of the buffer.
    ///
    /// Returns the mode and the offset (in the full buffer) where the prompt starts.
    pub fn detect(&self, buffer: &PatternBuffer) -> Option<(CliMode, usize)> {
        let offset = buffer.tail_start();
        if let Some(m) = buffer.search_tail(&self.operational) {
            return Some((CliMode::Operational, offset + m.start()));
        }
        buffer
            .search_tail(&self.configuration)
            .map(|m| (CliMode::Configuration, offset + m.start()))
    }
}
