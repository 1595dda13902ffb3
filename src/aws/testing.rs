//! Scripted collaborators shared by the login, status and session tests,
//! plus SDK config for adapter tests against a mock endpoint.

use anyhow::bail;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use chrono::{TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{
    ClientRegistration, DeviceAuthorization, LoginProfile, ProbeError, ProviderError,
    RoleCredential, SessionToken, SsoProvider, TokenPoll,
};
use crate::browser::BrowserLauncher;

pub(crate) fn login_profile() -> LoginProfile {
    LoginProfile {
        profile_name: "demo".to_string(),
        region: "us-east-1".to_string(),
        sso_region: "us-east-1".to_string(),
        start_url: "https://x/start".to_string(),
        account_id: "123".to_string(),
        role_name: "R".to_string(),
    }
}

/// SDK config whose clients talk to `endpoint` with static credentials and
/// no retries.
pub(crate) async fn mock_sdk_config(endpoint: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(endpoint)
        .credentials_provider(Credentials::new(
            "AKIDTEST",
            "test-secret",
            None,
            None,
            "monies-test",
        ))
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}

pub(crate) fn issued_token() -> SessionToken {
    SessionToken {
        access_token: "issued-access-token".to_string(),
        expires_at: Utc::now() + TimeDelta::hours(8),
    }
}

pub(crate) fn role_credential(valid_for: TimeDelta) -> RoleCredential {
    RoleCredential {
        access_key_id: "ASIAFAKE".to_string(),
        secret_access_key: "fake-secret".to_string(),
        session_token: "fake-session".to_string(),
        expires_at: Utc::now() + valid_for,
    }
}

pub(crate) struct FakeProvider {
    /// Answers for successive polls; `Pending` once exhausted
    pub polls: Mutex<VecDeque<Result<TokenPoll, ProviderError>>>,
    pub probe: Result<(), ProbeError>,
    pub register_error: Option<ProviderError>,
    pub start_error: Option<ProviderError>,
    pub role_error: Option<ProviderError>,
    pub interval: Duration,
    pub expires_in: Duration,
    pub poll_count: AtomicUsize,
    pub role_calls: AtomicUsize,
    pub last_role_request: Mutex<Option<(String, String, String)>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            polls: Mutex::new(VecDeque::new()),
            probe: Ok(()),
            register_error: None,
            start_error: None,
            role_error: None,
            interval: Duration::from_secs(1),
            expires_in: Duration::from_secs(600),
            poll_count: AtomicUsize::new(0),
            role_calls: AtomicUsize::new(0),
            last_role_request: Mutex::new(None),
        }
    }
}

impl FakeProvider {
    pub fn with_polls(polls: Vec<Result<TokenPoll, ProviderError>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            ..Self::default()
        }
    }

    pub fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn role_calls(&self) -> usize {
        self.role_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SsoProvider for FakeProvider {
    async fn register_client(
        &self,
        client_name: &str,
    ) -> Result<ClientRegistration, ProviderError> {
        if let Some(err) = &self.register_error {
            return Err(err.clone());
        }
        Ok(ClientRegistration {
            client_id: format!("{client_name}-id"),
            client_secret: "client-secret".to_string(),
        })
    }

    async fn start_device_authorization(
        &self,
        _registration: &ClientRegistration,
        _start_url: &str,
    ) -> Result<DeviceAuthorization, ProviderError> {
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        Ok(DeviceAuthorization {
            device_code: "device-code".to_string(),
            user_code: "ABCD-EFGH".to_string(),
            verification_uri: "https://device.example/".to_string(),
            verification_uri_complete: Some(
                "https://device.example/?user_code=ABCD-EFGH".to_string(),
            ),
            interval: self.interval,
            expires_in: self.expires_in,
        })
    }

    async fn poll_for_token(
        &self,
        _registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenPoll, ProviderError> {
        assert_eq!(device_code, "device-code");
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TokenPoll::Pending))
    }

    async fn get_role_credentials(
        &self,
        token: &SessionToken,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredential, ProviderError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_role_request.lock().unwrap() = Some((
            token.access_token.clone(),
            account_id.to_string(),
            role_name.to_string(),
        ));
        match &self.role_error {
            Some(err) => Err(err.clone()),
            None => Ok(role_credential(TimeDelta::hours(1))),
        }
    }

    async fn probe_identity(&self, _profile: &LoginProfile) -> Result<(), ProbeError> {
        self.probe.clone()
    }
}

#[derive(Default)]
pub(crate) struct RecordingBrowser {
    pub fail: bool,
    pub opened: Mutex<Vec<String>>,
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        if self.fail {
            bail!("no display");
        }
        Ok(())
    }
}
