use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_sso::Client as PortalClient;
use aws_sdk_ssooidc::Client as OidcClient;
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{LoginProfile, RoleCredential, SessionToken};

const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Failure reported by an Identity Center call, carrying the full error text.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn sdk_error<E: std::error::Error>(err: E) -> ProviderError {
    ProviderError::new(DisplayErrorContext(err).to_string())
}

/// Why an identity probe did not succeed.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// No credentials could be assembled for the profile
    #[error("failed to load credentials: {0}")]
    Construction(String),
    /// Credentials were assembled but the identity call failed
    #[error("identity probe failed: {0}")]
    Probe(String),
}

/// Client identity registered for one device login.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
}

/// Out-of-band authorization started against a start URL.
#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub interval: Duration,
    pub expires_in: Duration,
}

impl DeviceAuthorization {
    /// URL to show the user, preferring the one with the code embedded.
    pub fn verification_url(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

/// Result of one token poll. Pending states are not errors.
#[derive(Debug, Clone)]
pub enum TokenPoll {
    Pending,
    SlowDown,
    Issued(SessionToken),
}

/// Identity Center operations the login flow depends on.
#[async_trait]
pub trait SsoProvider: Send + Sync {
    async fn register_client(&self, client_name: &str) -> Result<ClientRegistration, ProviderError>;

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, ProviderError>;

    async fn poll_for_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenPoll, ProviderError>;

    async fn get_role_credentials(
        &self,
        token: &SessionToken,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredential, ProviderError>;

    async fn probe_identity(&self, profile: &LoginProfile) -> Result<(), ProbeError>;
}

/// [`SsoProvider`] backed by the AWS SDK (SSO OIDC, SSO portal, STS).
#[derive(Debug, Clone)]
pub struct AwsSsoProvider {
    oidc: OidcClient,
    portal: PortalClient,
}

impl AwsSsoProvider {
    /// Clients for the Identity Center instance in `sso_region`. These calls
    /// are unsigned, so no credentials are loaded.
    pub async fn new(sso_region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(sso_region.to_string()))
            .no_credentials()
            .load()
            .await;
        Self::from_config(&config)
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            oidc: OidcClient::new(config),
            portal: PortalClient::new(config),
        }
    }
}

fn required(value: Option<&str>, what: &str) -> Result<String, ProviderError> {
    value
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| ProviderError::new(format!("response is missing {what}")))
}

/// A chain where no provider produced credentials means the profile has
/// none to offer; anything else is a failure inside a provider.
fn credentials_error(err: CredentialsError) -> ProbeError {
    let detail = DisplayErrorContext(&err).to_string();
    match err {
        CredentialsError::CredentialsNotLoaded(_) => {
            ProbeError::Construction(format!("no valid credential source: {detail}"))
        }
        _ => ProbeError::Construction(detail),
    }
}

fn seconds(value: i32) -> Duration {
    Duration::from_secs(u64::try_from(value).unwrap_or(0))
}

#[async_trait]
impl SsoProvider for AwsSsoProvider {
    async fn register_client(
        &self,
        client_name: &str,
    ) -> Result<ClientRegistration, ProviderError> {
        let response = self
            .oidc
            .register_client()
            .client_name(client_name)
            .client_type("public")
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(ClientRegistration {
            client_id: required(response.client_id(), "client id")?,
            client_secret: required(response.client_secret(), "client secret")?,
        })
    }

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, ProviderError> {
        let response = self
            .oidc
            .start_device_authorization()
            .client_id(&registration.client_id)
            .client_secret(&registration.client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(DeviceAuthorization {
            device_code: required(response.device_code(), "device code")?,
            user_code: required(response.user_code(), "user code")?,
            verification_uri: required(response.verification_uri(), "verification URI")?,
            verification_uri_complete: response.verification_uri_complete().map(String::from),
            interval: seconds(response.interval()),
            expires_in: seconds(response.expires_in()),
        })
    }

    async fn poll_for_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenPoll, ProviderError> {
        let result = self
            .oidc
            .create_token()
            .client_id(&registration.client_id)
            .client_secret(&registration.client_secret)
            .device_code(device_code)
            .grant_type(DEVICE_CODE_GRANT_TYPE)
            .send()
            .await;

        match result {
            Ok(response) => {
                let expires_at =
                    Utc::now() + TimeDelta::seconds(i64::from(response.expires_in()));
                Ok(TokenPoll::Issued(SessionToken {
                    access_token: required(response.access_token(), "access token")?,
                    expires_at,
                }))
            }
            Err(err) => match err.as_service_error() {
                Some(e) if e.is_authorization_pending_exception() => Ok(TokenPoll::Pending),
                Some(e) if e.is_slow_down_exception() => Ok(TokenPoll::SlowDown),
                _ => Err(sdk_error(err)),
            },
        }
    }

    async fn get_role_credentials(
        &self,
        token: &SessionToken,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredential, ProviderError> {
        debug!("Requesting role credentials for {}/{}", account_id, role_name);
        let response = self
            .portal
            .get_role_credentials()
            .role_name(role_name)
            .account_id(account_id)
            .access_token(&token.access_token)
            .send()
            .await
            .map_err(sdk_error)?;

        let credentials = response
            .role_credentials()
            .ok_or_else(|| ProviderError::new("response is missing role credentials"))?;

        Ok(RoleCredential {
            access_key_id: required(credentials.access_key_id(), "access key id")?,
            secret_access_key: required(credentials.secret_access_key(), "secret access key")?,
            session_token: required(credentials.session_token(), "session token")?,
            expires_at: DateTime::from_timestamp_millis(credentials.expiration())
                .ok_or_else(|| ProviderError::new("role credential expiration is out of range"))?,
        })
    }

    async fn probe_identity(&self, profile: &LoginProfile) -> Result<(), ProbeError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&profile.profile_name)
            .region(Region::new(profile.region.clone()))
            .load()
            .await;

        let credentials = config.credentials_provider().ok_or_else(|| {
            ProbeError::Construction("no valid credential source configured".to_string())
        })?;
        credentials
            .provide_credentials()
            .await
            .map_err(credentials_error)?;

        let identity = StsClient::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| ProbeError::Probe(DisplayErrorContext(e).to_string()))?;

        debug!(
            "Caller identity: {}",
            identity.arn().unwrap_or("<unknown>")
        );
        Ok(())
    }
}
