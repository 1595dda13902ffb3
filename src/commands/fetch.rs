use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use std::io;
use tracing::warn;

use super::{CommandContext, output};
use crate::simplefin::{AccessCredential, AccountSet, GetAccountsOptions, SimpleFinClient};

/// Filters accepted by `fetch` and `sync`.
#[derive(Debug, Clone, Default, Args)]
pub struct AccountFilters {
    #[arg(long, value_name = "YYYY-MM-DD", help = "Only transactions on or after this date")]
    pub start_date: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD", help = "Only transactions before this date")]
    pub end_date: Option<NaiveDate>,

    #[arg(long, help = "Include pending transactions")]
    pub pending: bool,

    #[arg(long = "account", value_name = "ID", help = "Restrict to an account id (repeatable)")]
    pub accounts: Vec<String>,

    #[arg(long, help = "Return balances without transactions")]
    pub balances_only: bool,
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl AccountFilters {
    pub fn to_options(&self) -> GetAccountsOptions {
        GetAccountsOptions {
            start_date: self.start_date.map(midnight_utc),
            end_date: self.end_date.map(midnight_utc),
            pending: self.pending,
            account_ids: self.accounts.clone(),
            balances_only: self.balances_only,
        }
    }
}

/// Fetch accounts and surface any bridge-reported problems as warnings.
pub async fn fetch_accounts(
    credential: &AccessCredential,
    options: &GetAccountsOptions,
) -> Result<AccountSet> {
    let accounts = SimpleFinClient::new(credential)?
        .get_accounts(options)
        .await
        .context("Failed to get accounts")?;

    for message in &accounts.errors {
        warn!("SimpleFIN reported: {}", message);
    }
    Ok(accounts)
}

#[derive(Debug, Clone, Args)]
pub struct FetchCommand {
    #[command(flatten)]
    pub filters: AccountFilters,
}

impl FetchCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let credential = ctx
            .access_credential()
            .await
            .context("Failed to get access credential")?;
        let accounts = fetch_accounts(&credential, &self.filters.to_options()).await?;
        output::render_accounts(&accounts, ctx.output, &mut io::stdout().lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters() {
        assert_eq!(
            AccountFilters::default().to_options(),
            GetAccountsOptions::default()
        );
    }

    #[test]
    fn test_dates_become_midnight_utc_timestamps() {
        let filters = AccountFilters {
            start_date: NaiveDate::from_ymd_opt(2023, 11, 14),
            end_date: NaiveDate::from_ymd_opt(2023, 11, 15),
            pending: true,
            accounts: vec!["acct_1".to_string()],
            balances_only: true,
        };

        assert_eq!(
            filters.to_options(),
            GetAccountsOptions {
                start_date: Some(1_699_920_000),
                end_date: Some(1_700_006_400),
                pending: true,
                account_ids: vec!["acct_1".to_string()],
                balances_only: true,
            }
        );
    }
}
