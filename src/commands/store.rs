use anyhow::{Context, Result, bail};
use clap::Args;
use std::io::{self, Write};

use super::{CommandContext, secrets_manager};
use crate::aws::SecretStore;
use crate::simplefin::{AccessCredential, SetupTokenResolver};

#[derive(Debug, Clone, Args)]
pub struct StoreCommand {}

pub async fn store_credential(
    store: &dyn SecretStore,
    name: &str,
    credential: &AccessCredential,
    out: &mut impl Write,
) -> Result<()> {
    store
        .store(name, credential)
        .await
        .context("Failed to store access credential")?;

    writeln!(out, "Stored access credential in AWS Secrets Manager")?;
    writeln!(out, "   Secret name: {name}")?;
    writeln!(
        out,
        "   You can now use: monies fetch --use-secrets --secret-name \"{name}\""
    )?;
    Ok(())
}

impl StoreCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let Some(setup_token) = ctx.setup_token.as_deref().filter(|t| !t.is_empty()) else {
            bail!("Setup token is required for storing");
        };
        let name = ctx.settings.secret_name_or_default();

        let credential = SetupTokenResolver::new_default()?
            .resolve(setup_token)
            .await
            .context("Failed to resolve setup token")?;

        let store = secrets_manager(&ctx.settings).await?;
        store_credential(&store, name, &credential, &mut io::stdout().lock()).await
    }
}
