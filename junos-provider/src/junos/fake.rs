//! In-memory Junos device for tests.
//!
//! Keeps a running and a candidate configuration as `set` lines, honours the
//! exclusive lock, answers `show version` and
//! `show configuration <path> | display set relative`, and applies `delete`
//! lines by hierarchy prefix.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::device::{CommitReport, Device};
use crate::error::{Result, SessionError};
use crate::setline::{DISPLAY_SET_RELATIVE, SHOW_CONFIG, quote, tokenize};

#[derive(Debug, Default)]
struct FakeState {
    model: String,
    running: Vec<String>,
    candidate: Vec<String>,
    locked: bool,
    locked_elsewhere: bool,
    lock_attempts: usize,
    commit_failure: Option<String>,
    rejected: Vec<String>,
    commits: Vec<String>,
    commands: Vec<String>,
}

/// Shared-state fake device; clones observe the same device.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn new(model: &str) -> Self {
        let device = Self::default();
        device.lock().model = model.to_string();
        device
    }

    /// Seed the running configuration.
    pub fn with_running(self, lines: &[&str]) -> Self {
        self.lock().running = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn running(&self) -> Vec<String> {
        self.lock().running.clone()
    }

    pub fn candidate(&self) -> Vec<String> {
        self.lock().candidate.clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.lock().locked
    }

    pub fn lock_attempts(&self) -> usize {
        self.lock().lock_attempts
    }

    pub fn hold_lock_elsewhere(&self, held: bool) {
        self.lock().locked_elsewhere = held;
    }

    pub fn fail_next_commit(&self, message: &str) {
        self.lock().commit_failure = Some(message.to_string());
    }

    /// Make `config_set` reject lines containing `fragment`.
    pub fn reject_lines_containing(&self, fragment: &str) {
        self.lock().rejected.push(fragment.to_string());
    }
}

fn starts_with_path(tokens: &[String], path: &[String]) -> bool {
    tokens.len() >= path.len() && tokens.iter().zip(path).all(|(a, b)| a == b)
}

fn display_set_relative(running: &[String], path: &str) -> String {
    let path = tokenize(path);
    let mut out = Vec::new();
    for line in running {
        let tokens = tokenize(line);
        let Some(tokens) = tokens.strip_prefix(&["set".to_string()][..]) else {
            continue;
        };
        if !starts_with_path(tokens, &path) {
            continue;
        }
        let rest: Vec<String> = tokens[path.len()..].iter().map(|t| quote(t)).collect();
        if rest.is_empty() {
            out.push("set".to_string());
        } else {
            out.push(format!("set {}", rest.join(" ")));
        }
    }
    out.join("\n")
}

fn apply(running: &mut Vec<String>, op: &str) {
    let tokens = tokenize(op);
    match tokens.first().map(String::as_str) {
        Some("set") => {
            if !running.iter().any(|l| tokenize(l) == tokens) {
                running.push(op.to_string());
            }
        }
        Some("delete") => {
            let path = &tokens[1..];
            running.retain(|l| {
                let line = tokenize(l);
                !starts_with_path(&line[1..], path)
            });
        }
        _ => {}
    }
}

#[async_trait]
impl Device for FakeDevice {
    async fn command(&mut self, cmd: &str) -> Result<String> {
        let mut state = self.lock();
        state.commands.push(cmd.to_string());

        if cmd == "show version" {
            return Ok(format!(
                "Hostname: fake\nModel: {}\nJunos: 21.4R3.15",
                state.model
            ));
        }
        if let Some(path) = cmd
            .strip_prefix(SHOW_CONFIG)
            .and_then(|rest| rest.strip_suffix(DISPLAY_SET_RELATIVE))
        {
            return Ok(display_set_relative(&state.running, path));
        }

        Err(SessionError::CommandFailed {
            command: cmd.to_string(),
            message: "unknown command.".to_string(),
        }
        .into())
    }

    async fn config_lock(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.lock_attempts += 1;
        if state.locked_elsewhere || state.locked {
            return Err(SessionError::LockFailed {
                message: "error: configuration database locked by: admin".to_string(),
            }
            .into());
        }
        state.locked = true;
        Ok(())
    }

    async fn config_set(&mut self, lines: &[String]) -> Result<()> {
        let mut state = self.lock();
        for line in lines {
            let rejected = state.rejected.iter().any(|r| line.contains(r.as_str()));
            let verb_ok = line.starts_with("set ") || line.starts_with("delete ");
            if rejected || !verb_ok {
                return Err(SessionError::ConfigSet {
                    line: line.clone(),
                    message: "syntax error.".to_string(),
                }
                .into());
            }
            state.candidate.push(line.clone());
        }
        Ok(())
    }

    async fn config_clear(&mut self) -> Result<()> {
        self.lock().candidate.clear();
        Ok(())
    }

    async fn config_unlock(&mut self) -> Result<()> {
        self.lock().locked = false;
        Ok(())
    }

    async fn commit(&mut self, comment: &str) -> Result<CommitReport> {
        let mut state = self.lock();
        if let Some(message) = state.commit_failure.take() {
            return Err(SessionError::Commit { message }.into());
        }
        let candidate = std::mem::take(&mut state.candidate);
        for op in &candidate {
            apply(&mut state.running, op);
        }
        state.commits.push(comment.to_string());
        Ok(CommitReport::default())
    }

    fn has_netconf(&self) -> bool {
        false
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_set_relative() {
        let running = vec![
            "set system ntp server 10.0.0.1".to_string(),
            "set system ntp server 10.0.0.1 prefer".to_string(),
            "set system ntp server 10.0.0.10 key 1".to_string(),
            "set system login user bob full-name \"Bob Smith\"".to_string(),
        ];
        assert_eq!(
            display_set_relative(&running, "system ntp server 10.0.0.1"),
            "set\nset prefer"
        );
        assert_eq!(
            display_set_relative(&running, "system login user bob"),
            "set full-name \"Bob Smith\""
        );
        assert_eq!(display_set_relative(&running, "system ntp server 10.0.0.2"), "");
    }

    #[test]
    fn test_delete_by_prefix() {
        let mut running = vec![
            "set system ntp server 10.0.0.1".to_string(),
            "set system ntp server 10.0.0.1 prefer".to_string(),
            "set system ntp server 10.0.0.10".to_string(),
        ];
        apply(&mut running, "delete system ntp server 10.0.0.1");
        assert_eq!(running, vec!["set system ntp server 10.0.0.10".to_string()]);
    }
}
