//! `set` line parsing.

use std::mem;

use crate::error::{Error, Result};

/// Split one configuration line into segments.
///
/// Double-quoted values become a single segment with the quotes removed
/// and `\x` escapes resolved.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else if c.is_whitespace() {
            if in_token {
                segments.push(mem::take(&mut current));
                in_token = false;
            }
        } else if c == '"' {
            in_quotes = true;
            in_token = true;
        } else {
            current.push(c);
            in_token = true;
        }
    }
    if in_token {
        segments.push(current);
    }

    segments
}

/// Cursor over the segments of one configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    line: String,
    segments: Vec<String>,
    pos: usize,
}

impl ConfigItem {
    /// Tokenize a line as-is.
    pub fn new(line: &str) -> Self {
        Self {
            line: line.trim().to_string(),
            segments: tokenize(line),
            pos: 0,
        }
    }

    /// Tokenize a `set ...` line, positioned after `set`.
    ///
    /// Returns `None` for lines that are not `set` lines.
    pub fn from_set_line(line: &str) -> Option<Self> {
        let mut item = Self::new(line);
        item.strip(&["set"]).then_some(item)
    }

    /// The original line.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Advance past `keys` if the next segments equal them.
    pub fn strip(&mut self, keys: &[&str]) -> bool {
        let rest = self.remaining();
        if rest.len() < keys.len() || !rest.iter().zip(keys).all(|(seg, key)| seg.as_str() == *key) {
            return false;
        }
        self.pos += keys.len();
        true
    }

    /// Consume and return the next segment.
    pub fn next_segment(&mut self) -> Option<String> {
        let segment = self.segments.get(self.pos).cloned();
        if segment.is_some() {
            self.pos += 1;
        }
        segment
    }

    /// Look at the next segment without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.segments.get(self.pos).map(String::as_str)
    }

    /// Consume everything left as a single value.
    pub fn take_value(&mut self) -> Result<String> {
        if self.is_empty() {
            return Err(self.error("missing value"));
        }
        let value = self.remaining().join(" ");
        self.pos = self.segments.len();
        Ok(value)
    }

    /// Consume everything left as an integer.
    pub fn take_int(&mut self) -> Result<i64> {
        let value = self.take_value()?;
        match value.parse::<i64>() {
            Ok(n) => Ok(n),
            Err(e) => Err(self.error(format!("'{value}' is not an integer: {e}"))),
        }
    }

    /// Segments not consumed yet.
    pub fn remaining(&self) -> &[String] {
        &self.segments[self.pos.min(self.segments.len())..]
    }

    /// All segments of the line, consumed or not.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }

    /// A parse error pointing at this line.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line.clone(),
            message: message.into(),
        }
    }
}

/// Items of `display set relative` output.
///
/// Blank lines, non-`set` lines and the bare `set` of an empty stanza are skipped.
pub fn relative_items(output: &str) -> impl Iterator<Item = ConfigItem> + '_ {
    output
        .lines()
        .filter_map(ConfigItem::from_set_line)
        .filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain_and_quoted() {
        assert_eq!(
            tokenize("set system login user bob full-name \"Bob \\\"B\\\" Smith\""),
            vec!["set", "system", "login", "user", "bob", "full-name", "Bob \"B\" Smith"]
        );
        assert_eq!(tokenize("  set   prefer  "), vec!["set", "prefer"]);
        assert_eq!(tokenize("set description \"\""), vec!["set", "description", ""]);
    }

    #[test]
    fn test_strip_and_take_value() {
        let mut item = ConfigItem::from_set_line("set family inet network 192.0.2.0/24").unwrap();
        assert!(!item.strip(&["family", "inet6"]));
        assert!(item.strip(&["family", "inet"]));
        assert_eq!(item.next_segment().as_deref(), Some("network"));
        assert_eq!(item.take_value().unwrap(), "192.0.2.0/24");
        assert!(item.is_empty());
    }

    #[test]
    fn test_take_int_error_names_line() {
        let mut item = ConfigItem::from_set_line("set uid abc").unwrap();
        item.strip(&["uid"]);
        let err = item.take_int().unwrap_err();
        assert!(err.to_string().contains("set uid abc"));
    }

    #[test]
    fn test_relative_items_skips_noise() {
        let output = "\nset\nset prefer\n## Last changed: 2024-01-01\nset key 5\n";
        let items: Vec<_> = relative_items(output).map(|i| i.remaining().to_vec()).collect();
        assert_eq!(items, vec![vec!["prefer".to_string()], vec!["key".into(), "5".into()]]);
    }
}
