// crates/ethd-poller/src/notify.rs
//
// Notification hooks: command templates, the Notifier seam, and the
// production CommandNotifier that runs templates as subprocesses.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// The three hook channels, named after their configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Block,
    Wallet,
    Alert,
}

impl NotifyKind {
    /// Configuration key of the hook.
    pub fn name(&self) -> &'static str {
        match self {
            NotifyKind::Block => "blocknotify",
            NotifyKind::Wallet => "walletnotify",
            NotifyKind::Alert => "alertnotify",
        }
    }
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command templates for each hook. Each template carries one `%s`
/// placeholder that receives the payload (block hash, txid or alert text).
#[derive(Debug, Clone, Default)]
pub struct NotifyCommands {
    pub blocknotify: Option<String>,
    pub walletnotify: Option<String>,
    pub alertnotify: Option<String>,
    /// Working directory of spawned commands.
    pub workdir: Option<PathBuf>,
}

impl NotifyCommands {
    /// The configured template for `kind`. Blank templates count as absent.
    pub fn template(&self, kind: NotifyKind) -> Option<&str> {
        let template = match kind {
            NotifyKind::Block => self.blocknotify.as_deref(),
            NotifyKind::Wallet => self.walletnotify.as_deref(),
            NotifyKind::Alert => self.alertnotify.as_deref(),
        };
        template.filter(|t| !t.trim().is_empty())
    }

    pub fn has(&self, kind: NotifyKind) -> bool {
        self.template(kind).is_some()
    }

    /// Argument vector for `kind`: the template split on whitespace, with
    /// `payload` substituted into the first `%s`. The payload always stays
    /// inside a single argument and is never seen by a shell.
    pub fn argv(&self, kind: NotifyKind, payload: &str) -> Option<Vec<String>> {
        let template = self.template(kind)?;
        let mut substituted = false;
        let argv = template
            .split_whitespace()
            .map(|arg| {
                if !substituted && arg.contains("%s") {
                    substituted = true;
                    arg.replacen("%s", payload, 1)
                } else {
                    arg.to_string()
                }
            })
            .collect();
        Some(argv)
    }
}

/// Delivery of hook notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether a command is configured for `kind`.
    fn is_configured(&self, kind: NotifyKind) -> bool;

    /// Deliver one notification. Returns `false` when nothing was executed
    /// (no command configured, or the command could not be spawned). Never
    /// fails: a broken hook must not take the poller down.
    async fn execute(&self, kind: NotifyKind, payload: &str) -> bool;
}

/// Spawns hook commands directly, without a shell.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    commands: NotifyCommands,
}

impl CommandNotifier {
    pub fn new(commands: NotifyCommands) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &NotifyCommands {
        &self.commands
    }
}

/// Read two output streams to the end, keeping lines in arrival order.
async fn merged_output<O, E>(stdout: O, stderr: E) -> String
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let (mut out_open, mut err_open) = (true, true);
    let mut lines = Vec::new();

    while out_open || err_open {
        tokio::select! {
            line = out.next_segment(), if out_open => match line {
                Ok(Some(line)) => lines.push(String::from_utf8_lossy(&line).into_owned()),
                _ => out_open = false,
            },
            line = err.next_segment(), if err_open => match line {
                Ok(Some(line)) => lines.push(String::from_utf8_lossy(&line).into_owned()),
                _ => err_open = false,
            },
        }
    }
    lines.join("\n").trim_end().to_string()
}

#[async_trait]
impl Notifier for CommandNotifier {
    fn is_configured(&self, kind: NotifyKind) -> bool {
        self.commands.has(kind)
    }

    async fn execute(&self, kind: NotifyKind, payload: &str) -> bool {
        let Some(argv) = self.commands.argv(kind, payload) else {
            tracing::warn!("{} command not found", kind);
            return false;
        };
        let Some((program, args)) = argv.split_first() else {
            tracing::warn!("{} command not found", kind);
            return false;
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.commands.workdir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("{} command exec error: {}", kind, e);
                return false;
            }
        };

        if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
            let combined = merged_output(stdout, stderr).await;
            if !combined.is_empty() {
                tracing::warn!("{}: {}", kind.name().to_uppercase(), combined);
            }
        }
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::debug!("{} command exited with {}", kind, status);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("{} command wait error: {}", kind, e),
        }
        tracing::info!("{} successfully notified", kind);
        true
    }
}
