use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::fetch::{AccountFilters, fetch_accounts};
use super::CommandContext;
use crate::constants::DATABASE_PATH_ENV;
use crate::db::{Database, RunSummary};
use crate::simplefin::AccountSet;

#[derive(Debug, Clone, Args)]
pub struct SyncCommand {
    #[arg(long, env = DATABASE_PATH_ENV, help = "SQLite database file")]
    pub db_path: Option<PathBuf>,

    #[command(flatten)]
    pub filters: AccountFilters,
}

/// Record `accounts` under a fresh run id in the database at `path`.
pub fn record_accounts(path: &Path, accounts: &AccountSet) -> Result<(String, RunSummary)> {
    let mut db = Database::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    let run_id = Uuid::new_v4().to_string();
    let summary = db
        .record_run(accounts, &run_id)
        .context("Failed to record account balances")?;
    Ok((run_id, summary))
}

impl SyncCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let db_path = self
            .db_path
            .unwrap_or_else(|| ctx.settings.database_path.clone());

        let credential = ctx
            .access_credential()
            .await
            .context("Failed to get access credential")?;
        let accounts = fetch_accounts(&credential, &self.filters.to_options()).await?;

        let (run_id, summary) = record_accounts(&db_path, &accounts)?;
        info!("Sync run {} written to {}", run_id, db_path.display());

        println!(
            "Recorded {} balance(s) ({} new account(s)) in run {}",
            summary.balances, summary.new_accounts, run_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplefin::Account;
    use tempfile::TempDir;

    #[test]
    fn test_record_accounts_uses_distinct_run_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monies.db");
        let accounts = AccountSet {
            accounts: vec![Account {
                id: "acct_1".to_string(),
                name: "Checking".to_string(),
                balance: "100.00".to_string(),
                ..Account::default()
            }],
            ..AccountSet::default()
        };

        let (first_run, first) = record_accounts(&path, &accounts).unwrap();
        let (second_run, second) = record_accounts(&path, &accounts).unwrap();

        assert_ne!(first_run, second_run);
        assert_eq!(first.new_accounts, 1);
        assert_eq!(second.new_accounts, 0);
        assert_eq!(second.balances, 1);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.balances_for_run(&first_run).unwrap().len(), 1);
        assert_eq!(db.balances_for_run(&second_run).unwrap().len(), 1);
    }
}
