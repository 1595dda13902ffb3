use reqwest::{Client, Method, Request, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{AccessCredential, AccountSet, BasicAuthTransport, RequestSender, TransportError};

/// Filters for `GET /accounts`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetAccountsOptions {
    /// Unix timestamp; transactions on or after this date
    pub start_date: Option<i64>,
    /// Unix timestamp; transactions before (not on) this date
    pub end_date: Option<i64>,
    pub pending: bool,
    pub account_ids: Vec<String>,
    pub balances_only: bool,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid SimpleFIN URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("SimpleFIN request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("SimpleFIN returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to read SimpleFIN response: {0}")]
    Body(#[from] reqwest::Error),
    #[error("failed to decode SimpleFIN accounts: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct SimpleFinClient<S = Client> {
    transport: BasicAuthTransport<S>,
    base_url: String,
}

impl SimpleFinClient<Client> {
    /// Client for `https://<host_path>` authenticated with the credential.
    pub fn new(credential: &AccessCredential) -> Result<Self, ClientError> {
        Ok(Self {
            transport: BasicAuthTransport::from_credential(credential)?,
            base_url: format!("https://{}", credential.host_path),
        })
    }
}

impl<S: RequestSender> SimpleFinClient<S> {
    pub fn with_base_url(base_url: impl Into<String>, transport: BasicAuthTransport<S>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn accounts_url(&self, options: &GetAccountsOptions) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!(
            "{}/accounts",
            self.base_url.trim_end_matches('/')
        ))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = options.start_date {
                query.append_pair("start-date", &start.to_string());
            }
            if let Some(end) = options.end_date {
                query.append_pair("end-date", &end.to_string());
            }
            if options.pending {
                query.append_pair("pending", "1");
            }
            for account_id in &options.account_ids {
                query.append_pair("account", account_id);
            }
            query.append_pair(
                "balances-only",
                if options.balances_only { "1" } else { "0" },
            );
        }

        Ok(url)
    }

    pub async fn get_accounts(
        &self,
        options: &GetAccountsOptions,
    ) -> Result<AccountSet, ClientError> {
        let url = self.accounts_url(options)?;
        info!("Fetching SimpleFIN accounts");
        debug!("Accounts URL: {}", url);

        let request = Request::new(Method::GET, url);
        let response = self.transport.send(&request).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }

        let accounts: AccountSet = serde_json::from_str(&body)?;
        info!("Fetched {} account(s)", accounts.accounts.len());
        Ok(accounts)
    }
}
