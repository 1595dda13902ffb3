use anyhow::Result;
use clap::ValueEnum;
use std::io::Write;

use crate::aws::SecretSummary;
use crate::simplefin::AccountSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn render_accounts(
    accounts: &AccountSet,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, accounts)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            writeln!(out, "Found {} account(s):", accounts.accounts.len())?;
            for (i, account) in accounts.accounts.iter().enumerate() {
                writeln!(out, "{}. Account: {}", i + 1, account.name)?;
                writeln!(out, "   ID: {}", account.id)?;
                writeln!(out, "   Balance: {} {}", account.balance, account.currency)?;
                writeln!(out, "   Organization: {}", account.org.name)?;
                if !account.transactions.is_empty() {
                    writeln!(out, "   Recent transactions: {}", account.transactions.len())?;
                }
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

pub fn render_secrets(secrets: &[SecretSummary], prefix: &str, out: &mut impl Write) -> Result<()> {
    if secrets.is_empty() {
        if prefix.is_empty() {
            writeln!(out, "No secrets found")?;
        } else {
            writeln!(out, "No secrets found with prefix '{prefix}'")?;
        }
        return Ok(());
    }

    writeln!(out, "Found {} secret(s):", secrets.len())?;
    for (i, secret) in secrets.iter().enumerate() {
        match secret.last_changed {
            Some(changed) => writeln!(
                out,
                "{}. {} (last changed {})",
                i + 1,
                secret.name,
                changed.format("%Y-%m-%d %H:%M:%S UTC")
            )?,
            None => writeln!(out, "{}. {}", i + 1, secret.name)?,
        }
    }
    Ok(())
}
