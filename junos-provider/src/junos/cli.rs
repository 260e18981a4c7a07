//! Junos CLI driver over an interactive shell stream.
//!
//! Works on any `AsyncRead + AsyncWrite` byte stream: the SSH PTY channel in
//! production, a scripted mock in tests. Commands are written one per line
//! and the reply is everything up to the next prompt.
//!
//! # Configuration transaction on the CLI
//!
//! ```text
//! user@router> configure exclusive         # config_lock
//! user@router# set system ntp server ...   # config_set
//! user@router# commit comment "..."        # commit
//! user@router# rollback 0                  # config_clear
//! user@router# exit configuration-mode     # config_unlock
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::device::{CommitReport, Device};
use crate::channel::{CliMode, JunosPrompt, PatternBuffer};
use crate::error::{ChannelError, Result, SessionError};

/// Line prefixes that mean the device refused a command.
const FAILURE_PREFIXES: &[&str] = &[
    "error:",
    "syntax error",
    "unknown command",
    "missing argument",
    "invalid value",
    "invalid numeric value",
    "No valid completions",
];

/// Fragments Junos prints after the offending token (`'xyz' is ambiguous.`).
const FAILURE_SUFFIXES: &[&str] = &["is ambiguous."];

/// Configuration lines of `display set` output; values inside them are data.
const CONFIG_LINE_PREFIXES: &[&str] = &["set ", "deactivate ", "protect "];

/// Commands run right after the first prompt.
const ON_OPEN_COMMANDS: &[&str] = &["set cli screen-length 0", "set cli screen-width 0"];

/// Junos CLI driver.
pub struct CliDevice<S> {
    stream: S,
    buffer: PatternBuffer,
    prompt: JunosPrompt,
    mode: CliMode,
    timeout: Duration,
}

impl<S> CliDevice<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wait for the first prompt and prepare the terminal.
    pub async fn open(stream: S, timeout: Duration) -> Result<Self> {
        let prompt = JunosPrompt::new().map_err(|e| SessionError::CommandFailed {
            command: "<prompt>".to_string(),
            message: e.to_string(),
        })?;

        let mut device = Self {
            stream,
            buffer: PatternBuffer::new(1000),
            prompt,
            mode: CliMode::Operational,
            timeout,
        };

        let banner = device.read_until_prompt().await?;
        trace!("login banner: {:?}", String::from_utf8_lossy(&banner));

        for cmd in ON_OPEN_COMMANDS {
            device.send(cmd).await?;
        }

        Ok(device)
    }

    /// Current CLI mode according to the last prompt seen.
    pub fn mode(&self) -> CliMode {
        self.mode
    }

    /// Read until a prompt shows up at the buffer tail.
    ///
    /// Returns the output preceding the prompt and records the mode.
    async fn read_until_prompt(&mut self) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut chunk = BytesMut::with_capacity(4096);

        loop {
            if let Some((mode, start)) = self.prompt.detect(&self.buffer) {
                self.mode = mode;
                let mut data = self.buffer.take();
                data.truncate(start);
                return Ok(data);
            }

            chunk.clear();
            let read = tokio::time::timeout_at(deadline, self.stream.read_buf(&mut chunk))
                .await
                .map_err(|_| ChannelError::PromptTimeout(self.timeout))?
                .map_err(ChannelError::Io)?;

            if read == 0 {
                return Err(ChannelError::Closed.into());
            }
            self.buffer.extend(&chunk);
        }
    }

    /// Send one command line and return its normalized output.
    async fn send(&mut self, command: &str) -> Result<String> {
        debug!("cli ({}) > {}", self.mode.as_str(), command);

        let line = format!("{command}\n");
        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;

        let raw = self.read_until_prompt().await?;
        let output = normalize_output(&String::from_utf8_lossy(&raw), command);
        trace!("cli < {:?}", output);

        Ok(output)
    }
}

/// Strip the command echo, CRs, and Junos context lines (`[edit ...]`, `{master:0}`).
fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace('\r', "");
    let mut lines = text.lines().peekable();

    if lines.peek().is_some_and(|first| first.trim() == command.trim()) {
        lines.next();
    }

    lines
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("[edit") && !(trimmed.starts_with('{') && trimmed.ends_with('}'))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_string()
}

/// The device error text if the output reports a failure.
///
/// Only line-leading markers count, and configuration lines are skipped.
fn detect_failure(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !CONFIG_LINE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .any(|line| {
            FAILURE_PREFIXES.iter().any(|p| line.starts_with(p))
                || FAILURE_SUFFIXES.iter().any(|p| line.ends_with(p))
        })
        .then(|| output.trim().to_string())
}

fn quote_comment(comment: &str) -> String {
    format!("\"{}\"", comment.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl<S> Device for CliDevice<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn command(&mut self, cmd: &str) -> Result<String> {
        let output = match self.mode {
            CliMode::Operational => self.send(cmd).await?,
            CliMode::Configuration => self.send(&format!("run {cmd}")).await?,
        };

        match detect_failure(&output) {
            Some(message) => Err(SessionError::CommandFailed {
                command: cmd.to_string(),
                message,
            }
            .into()),
            None => Ok(output),
        }
    }

    async fn config_lock(&mut self) -> Result<()> {
        let output = self.send("configure exclusive").await?;

        if let Some(message) = detect_failure(&output) {
            if self.mode == CliMode::Configuration {
                // Entered config mode anyway: leave it before reporting.
                self.send("exit configuration-mode").await?;
            }
            return Err(SessionError::LockFailed { message }.into());
        }
        if self.mode != CliMode::Configuration {
            return Err(SessionError::LockFailed { message: output }.into());
        }

        Ok(())
    }

    async fn config_set(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            let output = self.send(line).await?;
            if let Some(message) = detect_failure(&output) {
                return Err(SessionError::ConfigSet {
                    line: line.clone(),
                    message,
                }
                .into());
            }
        }
        Ok(())
    }

    async fn config_clear(&mut self) -> Result<()> {
        let output = self.send("rollback 0").await?;
        if let Some(message) = detect_failure(&output) {
            return Err(SessionError::CommandFailed {
                command: "rollback 0".to_string(),
                message,
            }
            .into());
        }
        Ok(())
    }

    async fn config_unlock(&mut self) -> Result<()> {
        if self.mode == CliMode::Configuration {
            self.send("exit configuration-mode").await?;
        }
        Ok(())
    }

    async fn commit(&mut self, comment: &str) -> Result<CommitReport> {
        let output = self
            .send(&format!("commit comment {}", quote_comment(comment)))
            .await?;

        if detect_failure(&output).is_some() || !output.contains("commit complete") {
            return Err(SessionError::Commit { message: output }.into());
        }

        let warnings = output
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("warning:"))
            .map(str::to_string)
            .collect();

        Ok(CommitReport { warnings })
    }

    fn has_netconf(&self) -> bool {
        false
    }

    async fn close(&mut self) -> Result<()> {
        if self.mode == CliMode::Configuration {
            self.send("exit configuration-mode").await?;
        }
        // The shell goes away with "exit"; no prompt follows.
        self.stream
            .write_all(b"exit\n")
            .await
            .map_err(ChannelError::Io)?;
        self.stream.shutdown().await.map_err(ChannelError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio_test::io::Builder;

    const PROMPT: &[u8] = b"\r\nlab@r1> ";
    const CONFIG_PROMPT: &[u8] = b"\r\n[edit]\r\nlab@r1# ";

    fn reply(echo: &str, body: &str, prompt: &[u8]) -> Vec<u8> {
        let mut out = format!("{echo}\r\n{body}").into_bytes();
        out.extend_from_slice(prompt);
        out
    }

    fn login(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"--- JUNOS 21.4R3 built 2022-10-01\r\n\r\nlab@r1> ")
            .write(b"set cli screen-length 0\n")
            .read(&reply("set cli screen-length 0", "Screen length set to 0", PROMPT))
            .write(b"set cli screen-width 0\n")
            .read(&reply("set cli screen-width 0", "Screen width set to 0", PROMPT))
    }

    #[test]
    fn test_normalize_output() {
        let raw = "show version\r\nHostname: r1\r\nModel: vsrx\r\n\r\n";
        assert_eq!(normalize_output(raw, "show version"), "Hostname: r1\nModel: vsrx");

        let raw = "configure exclusive\r\nEntering configuration mode\r\n\r\n[edit]\r\n";
        assert_eq!(
            normalize_output(raw, "configure exclusive"),
            "Entering configuration mode"
        );

        let raw = "show version\r\n{master:0}\r\n";
        assert_eq!(normalize_output(raw, "show version"), "");
    }

    #[test]
    fn test_detect_failure() {
        assert!(detect_failure("syntax error, expecting <command>.").is_some());
        assert!(detect_failure("error: configuration database locked by:").is_some());
        assert!(detect_failure("  error: zone missing\nerror: configuration check-out failed").is_some());
        assert!(detect_failure("'inter' is ambiguous.").is_some());
        assert!(detect_failure("warning: statement not found").is_none());
        assert!(detect_failure("").is_none());
    }

    #[test]
    fn test_detect_failure_ignores_configured_values() {
        let output = "set instance-type vrf\nset description \"fallback on error: see ticket\"";
        assert!(detect_failure(output).is_none());
        assert!(detect_failure("set description \"syntax error is ambiguous.\"").is_none());
        assert!(detect_failure("Description: see error: log").is_none());
    }

    #[test]
    fn test_quote_comment() {
        assert_eq!(quote_comment("create resource x"), "\"create resource x\"");
        assert_eq!(quote_comment("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[tokio::test]
    async fn test_command_in_operational_mode() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"show version\n")
            .read(&reply(
                "show version",
                "Hostname: r1\r\nModel: vsrx\r\nJunos: 21.4R3.15",
                PROMPT,
            ));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        let output = device.command("show version").await.unwrap();
        assert_eq!(output, "Hostname: r1\nModel: vsrx\nJunos: 21.4R3.15");
        assert_eq!(device.mode(), CliMode::Operational);
    }

    #[tokio::test]
    async fn test_transaction_commands() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"configure exclusive\n")
            .read(&reply(
                "configure exclusive",
                "warning: uncommitted changes will be discarded on exit\r\nEntering configuration mode",
                CONFIG_PROMPT,
            ))
            .write(b"set system ntp server 10.0.0.1\n")
            .read(&reply("set system ntp server 10.0.0.1", "", CONFIG_PROMPT))
            .write(b"run show configuration system ntp | display set relative\n")
            .read(&reply(
                "run show configuration system ntp | display set relative",
                "set server 10.0.0.2",
                CONFIG_PROMPT,
            ))
            .write(b"commit comment \"create resource junos_system_ntp_server\"\n")
            .read(&reply(
                "commit comment \"create resource junos_system_ntp_server\"",
                "commit complete",
                CONFIG_PROMPT,
            ))
            .write(b"exit configuration-mode\n")
            .read(&reply("exit configuration-mode", "Exiting configuration mode", PROMPT));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        device.config_lock().await.unwrap();
        assert_eq!(device.mode(), CliMode::Configuration);
        device
            .config_set(&["set system ntp server 10.0.0.1".to_string()])
            .await
            .unwrap();
        let show = device
            .command("show configuration system ntp | display set relative")
            .await
            .unwrap();
        assert_eq!(show, "set server 10.0.0.2");
        let report = device
            .commit("create resource junos_system_ntp_server")
            .await
            .unwrap();
        assert!(report.warnings.is_empty());
        device.config_unlock().await.unwrap();
        assert_eq!(device.mode(), CliMode::Operational);
    }

    #[tokio::test]
    async fn test_show_configuration_with_error_text_in_value() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"show configuration routing-instances vrf1 | display set relative\n")
            .read(&reply(
                "show configuration routing-instances vrf1 | display set relative",
                "set instance-type vrf\r\nset description \"fallback on error: see ticket\"",
                PROMPT,
            ));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        let output = device
            .command("show configuration routing-instances vrf1 | display set relative")
            .await
            .unwrap();
        assert_eq!(
            output,
            "set instance-type vrf\nset description \"fallback on error: see ticket\""
        );
    }

    #[tokio::test]
    async fn test_lock_held_by_other_user() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"configure exclusive\n")
            .read(&reply(
                "configure exclusive",
                "error: configuration database locked by:\r\n  admin terminal p1 (pid 4242) on since 2024-01-01",
                PROMPT,
            ));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        let err = device.config_lock().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::LockFailed { ref message }) if message.contains("locked by")
        ));
    }

    #[tokio::test]
    async fn test_config_set_syntax_error() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"configure exclusive\n")
            .read(&reply("configure exclusive", "Entering configuration mode", CONFIG_PROMPT))
            .write(b"set system ntp server bogus prefer-not\n")
            .read(&reply(
                "set system ntp server bogus prefer-not",
                "                                   ^\r\nsyntax error.",
                CONFIG_PROMPT,
            ));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        device.config_lock().await.unwrap();
        let err = device
            .config_set(&["set system ntp server bogus prefer-not".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::ConfigSet { ref line, .. }) if line == "set system ntp server bogus prefer-not"
        ));
    }

    #[tokio::test]
    async fn test_commit_failure_and_warnings() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"configure exclusive\n")
            .read(&reply("configure exclusive", "Entering configuration mode", CONFIG_PROMPT))
            .write(b"commit comment \"first\"\n")
            .read(&reply(
                "commit comment \"first\"",
                "[edit system]\r\n  warning: statement has no effect\r\ncommit complete",
                CONFIG_PROMPT,
            ))
            .write(b"commit comment \"second\"\n")
            .read(&reply(
                "commit comment \"second\"",
                "[edit security]\r\n  'zones'\r\n    error: zone missing\r\nerror: configuration check-out failed",
                CONFIG_PROMPT,
            ));
        let mut device = CliDevice::open(builder.build(), Duration::from_secs(5))
            .await
            .unwrap();

        device.config_lock().await.unwrap();
        let report = device.commit("first").await.unwrap();
        assert_eq!(report.warnings, vec!["warning: statement has no effect"]);

        let err = device.commit("second").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::Commit { ref message }) if message.contains("check-out failed")
        ));
    }

    #[tokio::test]
    async fn test_stream_closed_while_waiting() {
        let mock = Builder::new().read(b"--- JUNOS 21.4R3\r\n").build();
        let result = CliDevice::open(mock, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::Channel(ChannelError::Closed))));
    }
}
