use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{
    Client, Request, Response,
    header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue},
};
use std::time::Duration;
use thiserror::Error;

use super::AccessCredential;
use crate::constants::HTTP_TIMEOUT;

/// HTTP client whose requests give up after `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Something that can put a prepared request on the wire.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl RequestSender for Client {
    async fn send(&self, request: Request) -> reqwest::Result<Response> {
        self.execute(request).await
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request body cannot be cloned for authentication")]
    UncloneableRequest,
    #[error("invalid authorization header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Send(#[from] reqwest::Error),
}

/// Decorates every outgoing request with HTTP Basic authentication.
///
/// The caller's request is never modified: a clone is stamped and handed to
/// the inner sender, whose response or error is returned as is.
#[derive(Clone)]
pub struct BasicAuthTransport<S = Client> {
    username: String,
    password: String,
    inner: S,
}

impl BasicAuthTransport<Client> {
    pub fn from_credential(credential: &AccessCredential) -> Result<Self, TransportError> {
        let client = http_client(HTTP_TIMEOUT)?;
        Ok(Self::new(&credential.username, &credential.password, client))
    }
}

impl<S: RequestSender> BasicAuthTransport<S> {
    pub fn new(username: &str, password: &str, inner: S) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            inner,
        }
    }

    pub async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut cloned = request
            .try_clone()
            .ok_or(TransportError::UncloneableRequest)?;
        cloned
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization()?);
        Ok(self.inner.send(cloned).await?)
    }

    fn authorization(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::try_from(format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl<S> std::fmt::Debug for BasicAuthTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthTransport")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}
