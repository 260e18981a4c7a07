//! `set` line emission.

/// Quote a value the way `display set` prints it.
///
/// Values with whitespace or CLI metacharacters are wrapped in double quotes
/// with `\` and `"` escaped; plain tokens are returned unchanged.
pub fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | ';' | '{' | '}' | '#' | '[' | ']' | '\\' | '|'));

    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Accumulates configuration lines sharing a hierarchy prefix.
///
/// ```
/// use junos_provider::setline::SetLines;
///
/// let mut lines = SetLines::new("set system ntp server 10.0.0.1");
/// lines.bare();
/// lines.push("prefer");
/// assert_eq!(
///     lines.into_lines(),
///     vec!["set system ntp server 10.0.0.1", "set system ntp server 10.0.0.1 prefer"],
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SetLines {
    prefix: String,
    lines: Vec<String>,
}

impl SetLines {
    /// Start a line set under `prefix` (e.g. `set system ntp server 10.0.0.1`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end().to_string(),
            lines: Vec::new(),
        }
    }

    /// The prefix itself as a line.
    pub fn bare(&mut self) {
        self.lines.push(self.prefix.clone());
    }

    /// `<prefix> <suffix>`.
    pub fn push(&mut self, suffix: impl AsRef<str>) {
        self.lines.push(format!("{} {}", self.prefix, suffix.as_ref()));
    }

    /// `<prefix> <keyword> <quoted value>`.
    pub fn push_value(&mut self, keyword: &str, value: &str) {
        self.push(format!("{keyword} {}", quote(value)));
    }

    /// Append lines built elsewhere (e.g. a nested block).
    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    /// Same prefix, extended with more segments, for a nested block.
    pub fn child(&self, segments: impl AsRef<str>) -> SetLines {
        SetLines::new(format!("{} {}", self.prefix, segments.as_ref()))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
