use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::io::{self, Write};

use super::{CommandContext, output, secrets_manager};
use crate::aws::SecretStore;
use crate::constants::SECRET_NAME_PREFIX;

#[derive(Debug, Clone, Args)]
pub struct SecretsCommand {
    #[command(subcommand)]
    pub action: SecretsAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SecretsAction {
    #[command(about = "List stored secrets")]
    List {
        #[arg(long, help = "List every secret, not only monies ones")]
        all: bool,
    },
    #[command(about = "Delete the secret named by --secret-name")]
    Delete {
        #[arg(long, help = "Delete without asking for confirmation")]
        force: bool,
    },
}

pub async fn list_secrets(store: &dyn SecretStore, all: bool, out: &mut impl Write) -> Result<()> {
    let prefix = if all { "" } else { SECRET_NAME_PREFIX };
    let secrets = store.list(prefix).await.context("Failed to list secrets")?;
    output::render_secrets(&secrets, prefix, out)
}

pub async fn delete_secret(
    store: &dyn SecretStore,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    store.delete(name).await.context("Failed to delete secret")?;
    writeln!(out, "Deleted secret: {name}")?;
    Ok(())
}

fn confirm_deletion(name: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Are you sure you want to delete secret '{name}'? This cannot be undone."
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

impl SecretsCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match self.action {
            SecretsAction::List { all } => {
                let store = secrets_manager(&ctx.settings).await?;
                list_secrets(&store, all, &mut io::stdout().lock()).await
            }
            SecretsAction::Delete { force } => {
                let Some(name) = ctx.settings.secret_name.as_deref().filter(|n| !n.is_empty())
                else {
                    bail!("Secret name is required");
                };

                if !force && !confirm_deletion(name)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let store = secrets_manager(&ctx.settings).await?;
                delete_secret(&store, name, &mut io::stdout().lock()).await
            }
        }
    }
}
