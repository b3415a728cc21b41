use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use colored::Colorize;
use std::process::Stdio;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};

use crate::aws::AuthToken;

/// Final destination of an issued token
#[async_trait]
pub trait ResultSink {
    async fn deliver(&self, token: &AuthToken);
}

/// Prints the token and, unless disabled, copies it to the system clipboard.
/// A clipboard failure only produces a warning; the token is already on screen.
#[derive(Debug, Clone)]
pub struct TerminalSink {
    pub copy_to_clipboard: bool,
}

#[async_trait]
impl ResultSink for TerminalSink {
    async fn deliver(&self, token: &AuthToken) {
        println!("{token}");

        if !self.copy_to_clipboard {
            return;
        }

        match copy_with(CLIPBOARD_COMMANDS, token.as_str()).await {
            Ok(()) => println!("{}", "Token copied to clipboard!".green()),
            Err(e) => warn!("Could not copy token to clipboard: {e:#}"),
        }
    }
}

/// Clipboard programs to try, in order
#[cfg(target_os = "macos")]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Pipe `text` into the first command that accepts it.
async fn copy_with(commands: &[(&str, &[&str])], text: &str) -> Result<()> {
    for (program, args) in commands {
        match pipe_to(program, args, text).await {
            Ok(()) => return Ok(()),
            Err(e) => debug!("Clipboard command {} failed: {e:#}", program),
        }
    }
    bail!("no working clipboard command found")
}

async fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to execute {program}"))?;

    let mut stdin = child
        .stdin
        .take()
        .with_context(|| format!("No stdin for {program}"))?;
    stdin
        .write_all(text.as_bytes())
        .await
        .with_context(|| format!("Failed to write to {program}"))?;
    drop(stdin);

    let status = child.wait().await?;
    status
        .success()
        .then_some(())
        .with_context(|| format!("{program} returned {status}"))
}
