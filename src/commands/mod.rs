pub mod completions;
pub mod fetch;
pub mod output;
pub mod secrets;
pub mod store;
pub mod sync;

pub use completions::CompletionsCommand;
pub use fetch::{AccountFilters, FetchCommand};
pub use output::OutputFormat;
pub use secrets::{SecretsAction, SecretsCommand};
pub use store::StoreCommand;
pub use sync::SyncCommand;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::aws::{AwsSsoProvider, LoginFlow, SecretStore, SecretsManagerStore, session};
use crate::browser::SystemBrowser;
use crate::config::Settings;
use crate::simplefin::{AccessCredential, SetupTokenResolver};

/// Flags shared by every command, resolved once per run.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub settings: Settings,
    pub use_secrets: bool,
    pub setup_token: Option<String>,
    pub output: OutputFormat,
}

/// Where the SimpleFIN access credential is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    SetupToken(String),
    SecretsManager(String),
}

impl CommandContext {
    pub fn credential_source(&self) -> Result<CredentialSource> {
        if self.use_secrets {
            let Some(name) = self.settings.secret_name.as_deref().filter(|n| !n.is_empty()) else {
                bail!("Secret name is required when using AWS Secrets Manager");
            };
            return Ok(CredentialSource::SecretsManager(name.to_string()));
        }

        match self.setup_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Ok(CredentialSource::SetupToken(token.to_string())),
            None => bail!("Setup token is required when not using AWS Secrets Manager"),
        }
    }

    pub async fn access_credential(&self) -> Result<AccessCredential> {
        match self.credential_source()? {
            CredentialSource::SetupToken(token) => SetupTokenResolver::new_default()?
                .resolve(&token)
                .await
                .context("Failed to resolve setup token"),
            CredentialSource::SecretsManager(name) => {
                let store = secrets_manager(&self.settings).await?;
                store
                    .retrieve(&name)
                    .await
                    .with_context(|| format!("Failed to read access credential from '{name}'"))
            }
        }
    }
}

/// Secrets Manager client authorized through the profile's SSO login.
pub async fn secrets_manager(settings: &Settings) -> Result<SecretsManagerStore> {
    let profile = settings.login_profile()?;
    let provider = AwsSsoProvider::new(&profile.sso_region).await;
    let cache = settings.credential_cache();
    let flow = LoginFlow::new(&provider, &cache, &SystemBrowser);

    let credentials = session::resolve(&profile, &flow)
        .await
        .context("Failed to obtain AWS credentials")?;
    info!("Using AWS region {}", profile.region);

    let config = credentials.into_sdk_config(&profile).await;
    Ok(SecretsManagerStore::new(&config))
}
