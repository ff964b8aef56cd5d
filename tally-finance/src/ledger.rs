//! CSV-backed `Store` for the command-line client.
//!
//! A ledger is a directory holding:
//!   budgets.csv       user_id,id,name
//!   recurring.csv     user_id,title_pattern,budget_folder_id,avg_amount,cadence,next_due_date,active
//!   transactions.csv  id,user_id,title,amount,type,budget_folder_id,created_at
//! Missing files read as empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use tally_core::{
    Budget, Cadence, HistoryEntry, NewTransaction, RecurringRule, Store, TransactionId, TxnType,
};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("transaction not found: {0}")]
    NotFound(String),
}

impl From<LedgerError> for tally_core::Error {
    fn from(e: LedgerError) -> Self {
        tally_core::Error::Store(e.to_string())
    }
}

type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BudgetRow {
    user_id: String,
    id: String,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleRow {
    user_id: String,
    title_pattern: String,
    budget_folder_id: Option<String>,
    avg_amount: f64,
    cadence: Cadence,
    next_due_date: NaiveDate,
    active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRow {
    id: String,
    user_id: String,
    title: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: TxnType,
    budget_folder_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn new(id: String, tx: &NewTransaction) -> Self {
        Self {
            id,
            user_id: tx.user_id.clone(),
            title: tx.title.clone(),
            amount: tx.amount,
            kind: tx.kind,
            budget_folder_id: tx.budget_folder_id.clone(),
            created_at: tx.created_at,
        }
    }
}

pub struct Ledger {
    dir: PathBuf,
    // Serialises writers within this process
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub async fn add_budget(&self, user_id: &str, budget: &Budget) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        append(
            &self.path("budgets.csv"),
            &BudgetRow {
                user_id: user_id.to_string(),
                id: budget.id.clone(),
                name: budget.name.clone(),
            },
        )
    }

    pub async fn add_recurring_rule(&self, user_id: &str, rule: &RecurringRule) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        append(
            &self.path("recurring.csv"),
            &RuleRow {
                user_id: user_id.to_string(),
                title_pattern: rule.title_pattern.clone(),
                budget_folder_id: rule.budget_folder_id.clone(),
                avg_amount: rule.avg_amount,
                cadence: rule.cadence,
                next_due_date: rule.next_due_date,
                active: rule.active,
            },
        )
    }

    async fn insert(&self, tx: &NewTransaction) -> Result<TransactionId> {
        let _guard = self.write_lock.lock().await;
        let path = self.path("transactions.csv");
        let existing: Vec<TransactionRow> = read_all(&path)?;
        let id = format!("t{}", existing.len() + 1);
        append(&path, &TransactionRow::new(id.clone(), tx))?;
        debug!(%id, "transaction appended");
        Ok(id)
    }

    async fn update(&self, id: &str, tx: &NewTransaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path("transactions.csv");
        let mut rows: Vec<TransactionRow> = read_all(&path)?;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        *row = TransactionRow::new(id.to_string(), tx);
        rewrite(&path, &rows)
    }

    fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut rows: Vec<TransactionRow> = read_all::<TransactionRow>(&self.path("transactions.csv"))?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|r| HistoryEntry {
                title: r.title,
                budget_folder_id: r.budget_folder_id,
                created_at: r.created_at,
            })
            .collect())
    }
}

fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}

fn append<T: Serialize>(path: &Path, row: &T) -> Result<()> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    wtr.serialize(row)?;
    wtr.flush()?;
    Ok(())
}

fn rewrite<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl Store for Ledger {
    async fn insert_transaction(&self, tx: &NewTransaction) -> tally_core::Result<TransactionId> {
        Ok(self.insert(tx).await?)
    }

    async fn update_transaction(&self, id: &str, tx: &NewTransaction) -> tally_core::Result<()> {
        Ok(self.update(id, tx).await?)
    }

    async fn budget_folders(&self, user_id: &str) -> tally_core::Result<Vec<Budget>> {
        let rows: Vec<BudgetRow> = read_all(&self.path("budgets.csv"))?;
        Ok(rows
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| Budget::new(r.id, r.name))
            .collect())
    }

    async fn recurring_rules(&self, user_id: &str) -> tally_core::Result<Vec<RecurringRule>> {
        let rows: Vec<RuleRow> = read_all(&self.path("recurring.csv"))?;
        Ok(rows
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| RecurringRule {
                title_pattern: r.title_pattern,
                budget_folder_id: r.budget_folder_id,
                avg_amount: r.avg_amount,
                cadence: r.cadence,
                next_due_date: r.next_due_date,
                active: r.active,
            })
            .collect())
    }

    async fn recent_transactions(&self, user_id: &str, limit: usize) -> tally_core::Result<Vec<HistoryEntry>> {
        Ok(self.history(user_id, limit)?)
    }
}
