use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_secretsmanager::config::Credentials;
use tracing::{debug, info, warn};

use super::status::{self, CredentialStatus};
use super::{CredentialCache, LoginError, LoginFlow, LoginProfile, RoleCredential, SsoProvider};

const CREDENTIALS_PROVIDER_NAME: &str = "monies-sso";

/// Credentials chosen for AWS service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCredentials {
    /// The profile's own credential chain already works
    Profile,
    /// Role credentials from the cache or a fresh login
    Role(RoleCredential),
}

impl ResolvedCredentials {
    pub async fn into_sdk_config(self, profile: &LoginProfile) -> SdkConfig {
        let loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(profile.region.clone()));

        match self {
            Self::Profile => loader.profile_name(&profile.profile_name).load().await,
            Self::Role(credential) => {
                let credentials = Credentials::new(
                    credential.access_key_id,
                    credential.secret_access_key,
                    Some(credential.session_token),
                    Some(credential.expires_at.into()),
                    CREDENTIALS_PROVIDER_NAME,
                );
                loader.credentials_provider(credentials).load().await
            }
        }
    }
}

/// Pick credentials for `profile`: the profile chain when it is valid, else
/// an unexpired cached role credential, else an interactive login.
pub async fn resolve<P: SsoProvider, C: CredentialCache>(
    profile: &LoginProfile,
    flow: &LoginFlow<'_, P, C>,
) -> Result<ResolvedCredentials, LoginError> {
    match status::check(flow.provider(), profile).await {
        CredentialStatus::Valid => {
            debug!("Existing credentials for '{}' are valid", profile.profile_name);
            return Ok(ResolvedCredentials::Profile);
        }
        CredentialStatus::Expired => info!("SSO credentials have expired"),
        CredentialStatus::NotFound => info!("No SSO credentials found"),
        CredentialStatus::Error(message) => {
            warn!("Could not check credential status: {}", message)
        }
    }

    match flow.cache().read_role(profile).await {
        Ok(Some(credential)) if !credential.is_expired() => {
            debug!("Reusing cached role credentials for '{}'", profile.profile_name);
            return Ok(ResolvedCredentials::Role(credential));
        }
        Ok(_) => {}
        Err(e) => warn!("Ignoring unreadable role credential cache: {}", e),
    }

    println!("SSO login required for profile '{}'", profile.profile_name);
    let credential = flow.initiate(profile).await?;
    Ok(ResolvedCredentials::Role(credential))
}
