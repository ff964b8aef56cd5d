//! Persistence collaborator interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::candidate::TxnType;
use crate::error::Result;
use crate::recurring::RecurringRule;

pub type TransactionId = String;

/// A confirmed transaction, as written to the `transactions` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxnType,
    pub budget_folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A past transaction used for category inference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub title: String,
    pub budget_folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// CRUD store owning transactions, budget folders and recurring rules.
/// Every read is scoped by user id.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<TransactionId>;

    async fn update_transaction(&self, id: &str, tx: &NewTransaction) -> Result<()>;

    async fn budget_folders(&self, user_id: &str) -> Result<Vec<Budget>>;

    async fn recurring_rules(&self, user_id: &str) -> Result<Vec<RecurringRule>>;

    /// Most recent first
    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
}
