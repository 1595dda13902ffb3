use anyhow::{Context, Result};
use std::process::Command;
use tracing::debug;

/// Opens a URL for the user during device login.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!("Opening browser at {}", url);
        let mut command = browser_command(url)?;
        let status = command
            .status()
            .context("Failed to execute browser command")?;

        status
            .success()
            .then_some(())
            .context("Browser command returned error")
    }
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Result<Command> {
    let mut command = Command::new("open");
    command.arg(url);
    Ok(command)
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Result<Command> {
    let mut command = Command::new("cmd");
    command.args(["/c", "start", "", url]);
    Ok(command)
}

#[cfg(target_os = "linux")]
fn browser_command(url: &str) -> Result<Command> {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    Ok(command)
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
fn browser_command(_url: &str) -> Result<Command> {
    anyhow::bail!("Unsupported operating system")
}
