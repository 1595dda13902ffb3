use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::{
    CacheError, ClientRegistration, CredentialCache, DeviceAuthorization, LoginProfile,
    ProviderError, RoleCredential, SessionToken, SsoProvider, TokenPoll,
};
use crate::browser::BrowserLauncher;
use crate::constants::SSO_CLIENT_NAME;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("failed to register SSO client: {0}")]
    Registration(#[source] ProviderError),
    #[error("failed to start device authorization: {0}")]
    AuthorizationStart(#[source] ProviderError),
    #[error("failed to create token: {0}")]
    TokenExchange(#[source] ProviderError),
    #[error("device authorization expired before it was approved")]
    AuthorizationTimeout,
    #[error("failed to get role credentials: {0}")]
    RoleCredential(#[source] ProviderError),
    #[error("failed to cache role credentials: {0}")]
    CacheWrite(#[source] CacheError),
}

/// Interactive device-authorization login for one SSO profile.
pub struct LoginFlow<'a, P, C> {
    provider: &'a P,
    cache: &'a C,
    browser: &'a dyn BrowserLauncher,
}

impl<'a, P: SsoProvider, C: CredentialCache> LoginFlow<'a, P, C> {
    pub fn new(provider: &'a P, cache: &'a C, browser: &'a dyn BrowserLauncher) -> Self {
        Self {
            provider,
            cache,
            browser,
        }
    }

    pub fn provider(&self) -> &P {
        self.provider
    }

    pub fn cache(&self) -> &C {
        self.cache
    }

    /// Log in through the device flow and return role credentials for the
    /// profile's account and role. Both the session token and the role
    /// credential are written to the cache.
    pub async fn initiate(&self, profile: &LoginProfile) -> Result<RoleCredential, LoginError> {
        info!("Starting SSO login for profile '{}'", profile.profile_name);

        let registration = self
            .provider
            .register_client(SSO_CLIENT_NAME)
            .await
            .map_err(LoginError::Registration)?;

        let authorization = self
            .provider
            .start_device_authorization(&registration, &profile.start_url)
            .await
            .map_err(LoginError::AuthorizationStart)?;

        self.present(&authorization);

        let token = self.wait_for_token(&registration, &authorization).await?;
        info!("SSO authorization approved");

        if let Err(e) = self.cache.write_session(profile, &token).await {
            warn!("Failed to cache SSO session token: {}", e);
        }

        let credential = self
            .provider
            .get_role_credentials(&token, &profile.account_id, &profile.role_name)
            .await
            .map_err(LoginError::RoleCredential)?;

        self.cache
            .write_role(profile, &credential)
            .await
            .map_err(LoginError::CacheWrite)?;

        info!(
            "Obtained credentials for {}/{} (expires {})",
            profile.account_id, profile.role_name, credential.expires_at
        );
        Ok(credential)
    }

    fn present(&self, authorization: &DeviceAuthorization) {
        let url = authorization.verification_url();
        println!("Attempting to automatically open the SSO authorization page in your browser.");
        println!("If the browser does not open, visit the following URL:");
        println!();
        println!("{url}");
        println!();
        println!("Then enter the code:");
        println!();
        println!("{}", authorization.user_code);
        println!();

        if let Err(e) = self.browser.open(url) {
            warn!("Failed to open browser: {:#}", e);
        }
    }

    async fn wait_for_token(
        &self,
        registration: &ClientRegistration,
        authorization: &DeviceAuthorization,
    ) -> Result<SessionToken, LoginError> {
        let deadline = Instant::now() + authorization.expires_in;
        let mut interval = authorization.interval.max(MIN_POLL_INTERVAL);

        println!("Waiting for authorization...");
        while Instant::now() < deadline {
            sleep(interval).await;

            match self
                .provider
                .poll_for_token(registration, &authorization.device_code)
                .await
                .map_err(LoginError::TokenExchange)?
            {
                TokenPoll::Issued(token) => return Ok(token),
                TokenPoll::Pending => debug!("Authorization pending"),
                TokenPoll::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    debug!("Asked to slow down, polling every {:?}", interval);
                }
            }
        }

        Err(LoginError::AuthorizationTimeout)
    }
}
