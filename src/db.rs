//! SQLite storage for synced accounts and their balance history.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::simplefin::{Account, AccountSet};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {}: {source}", .path.display())]
    CreateDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Creates the account and balance tables and their indexes if absent.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS BANK_ACCOUNT (
            ID TEXT PRIMARY KEY,
            NAME TEXT NOT NULL,
            INSTITUTION_NAME TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS BANK_ACCOUNT_BALANCE (
            ID TEXT,
            BANK_ACCOUNT_ID TEXT,
            RUN_ID TEXT NOT NULL,
            BALANCE TEXT NOT NULL,
            CREATED_AT TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (BANK_ACCOUNT_ID) REFERENCES BANK_ACCOUNT(ID)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_account_balance_account_id
         ON BANK_ACCOUNT_BALANCE(BANK_ACCOUNT_ID)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_account_balance_run_id
         ON BANK_ACCOUNT_BALANCE(RUN_ID)",
        [],
    )?;

    Ok(())
}

/// A stored balance observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRecord {
    pub id: String,
    pub bank_account_id: String,
    pub run_id: String,
    pub balance: String,
}

/// Outcome of recording one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub new_accounts: usize,
    pub balances: usize,
}

fn insert_bank_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO BANK_ACCOUNT (ID, NAME, INSTITUTION_NAME) VALUES (?1, ?2, ?3)",
        params![account.id, account.name, account.org.name],
    )?;
    Ok(())
}

fn account_exists(conn: &Connection, account_id: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM BANK_ACCOUNT WHERE ID = ?1",
            params![account_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_balance(
    conn: &Connection,
    account_id: &str,
    run_id: &str,
    balance: &str,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO BANK_ACCOUNT_BALANCE (ID, BANK_ACCOUNT_ID, RUN_ID, BALANCE)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, account_id, run_id, balance],
    )?;
    Ok(id)
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opening database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn put_bank_account(&self, account: &Account) -> Result<()> {
        insert_bank_account(&self.conn, account)
    }

    pub fn bank_account_exists(&self, account_id: &str) -> Result<bool> {
        account_exists(&self.conn, account_id)
    }

    /// Append a balance row and return its generated id.
    pub fn put_account_balance(
        &self,
        account_id: &str,
        run_id: &str,
        balance: &str,
    ) -> Result<String> {
        insert_balance(&self.conn, account_id, run_id, balance)
    }

    /// Insert accounts not seen before, then one balance row per account,
    /// all or nothing.
    pub fn record_run(&mut self, accounts: &AccountSet, run_id: &str) -> Result<RunSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = RunSummary::default();

        for account in &accounts.accounts {
            if !account_exists(&tx, &account.id)? {
                insert_bank_account(&tx, account)?;
                summary.new_accounts += 1;
                debug!("Added account {} ({})", account.id, account.name);
            }
            insert_balance(&tx, &account.id, run_id, &account.balance)?;
            summary.balances += 1;
        }

        tx.commit()?;
        info!(
            "Recorded run {}: {} new account(s), {} balance(s)",
            run_id, summary.new_accounts, summary.balances
        );
        Ok(summary)
    }

    pub fn balances_for_run(&self, run_id: &str) -> Result<Vec<BalanceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT ID, BANK_ACCOUNT_ID, RUN_ID, BALANCE FROM BANK_ACCOUNT_BALANCE
             WHERE RUN_ID = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(BalanceRecord {
                id: row.get(0)?,
                bank_account_id: row.get(1)?,
                run_id: row.get(2)?,
                balance: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
