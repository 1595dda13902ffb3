use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Financial institution holding an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "sfin-url", default)]
    pub sfin_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub posted: i64,
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payee: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub transacted_at: i64,
}

impl Transaction {
    pub fn posted_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.posted, 0)
    }

    pub fn transacted_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.transacted_at, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub org: Organization,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub currency: String,
    pub balance: String,
    #[serde(rename = "available-balance", default)]
    pub available_balance: String,
    #[serde(rename = "balance-date", default)]
    pub balance_date: i64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Holdings are passed through untouched.
    #[serde(default)]
    pub holdings: Vec<serde_json::Value>,
}

impl Account {
    pub fn balance_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.balance_date, 0)
    }
}

/// Body of `GET /accounts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSet {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(rename = "x-api-message", default)]
    pub x_api_message: Vec<String>,
}
