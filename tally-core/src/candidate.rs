//! Transaction candidates: provisional, unconfirmed transactions extracted from text
//! or returned by the remote extraction service.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Direction of money flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    #[default]
    Expense,
    Income,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Expense => "expense",
            TxnType::Income => "income",
        }
    }
}

/// Values a user entered by hand before a recurring rule overwrote them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualValues {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

/// A provisional transaction. Immutable: every change produces a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawCandidate")]
pub struct TransactionCandidate {
    title: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: TxnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_name: Option<String>,
    date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    autofill: Option<ManualValues>,
}

fn check_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::NonPositiveAmount(amount))
    }
}

impl TransactionCandidate {
    /// Create a candidate, rejecting empty titles and amounts that are not > 0.
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        kind: TxnType,
        date: NaiveDate,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(Self {
            title,
            amount: check_amount(amount)?,
            kind,
            category_name: None,
            date,
            currency: None,
            autofill: None,
        })
    }

    pub fn with_category(mut self, category_name: Option<String>) -> Self {
        self.category_name = category_name.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn kind(&self) -> TxnType {
        self.kind
    }

    pub fn category_name(&self) -> Option<&str> {
        self.category_name.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    /// Manual values replaced by an auto-fill, if one was applied
    pub fn autofill(&self) -> Option<&ManualValues> {
        self.autofill.as_ref()
    }

    pub fn is_autofilled(&self) -> bool {
        self.autofill.is_some()
    }

    /// Overwrite amount, type and category, remembering the values being replaced.
    /// A second fill keeps the original manual values.
    pub fn autofilled(
        &self,
        amount: f64,
        kind: TxnType,
        category_name: Option<String>,
    ) -> Result<Self> {
        let previous = self.autofill.clone().unwrap_or_else(|| ManualValues {
            amount: self.amount,
            kind: self.kind,
            category_name: self.category_name.clone(),
        });
        Ok(Self {
            amount: check_amount(amount)?,
            kind,
            category_name,
            autofill: Some(previous),
            ..self.clone()
        })
    }

    /// Restore the manual values verbatim. No-op when nothing was auto-filled.
    pub fn undo_autofill(&self) -> Self {
        match &self.autofill {
            Some(prev) => Self {
                amount: prev.amount,
                kind: prev.kind,
                category_name: prev.category_name.clone(),
                autofill: None,
                ..self.clone()
            },
            None => self.clone(),
        }
    }
}

/// Wire shape accepted from the remote service and local JSON.
/// Amounts may arrive as numbers or numeric strings.
#[derive(Deserialize)]
struct RawCandidate {
    title: String,
    amount: RawAmount,
    #[serde(rename = "type", default)]
    kind: TxnType,
    #[serde(default, alias = "category")]
    category_name: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    autofill: Option<ManualValues>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl TryFrom<RawCandidate> for TransactionCandidate {
    type Error = Error;

    fn try_from(raw: RawCandidate) -> Result<Self> {
        let amount = match raw.amount {
            RawAmount::Number(n) => n,
            RawAmount::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse()
                .map_err(|_| Error::NonPositiveAmount(0.0))?,
        };
        let date = raw.date.unwrap_or_else(|| Utc::now().date_naive());
        let mut candidate = TransactionCandidate::new(raw.title, amount, raw.kind, date)?
            .with_category(raw.category_name)
            .with_currency(raw.currency);
        candidate.autofill = raw.autofill;
        Ok(candidate)
    }
}

/// Output of the local extractor, also the shape of a `propose_transaction` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParseOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionCandidate>>,
}

impl ParseOutcome {
    /// No amount could be isolated
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: Vec<TransactionCandidate>) -> Self {
        if candidates.is_empty() {
            return Self::no_match();
        }
        Self {
            success: true,
            transaction: candidates.first().cloned(),
            transactions: Some(candidates),
        }
    }

    pub fn into_candidates(self) -> Vec<TransactionCandidate> {
        match (self.transactions, self.transaction) {
            (Some(list), _) if !list.is_empty() => list,
            (_, Some(one)) => vec![one],
            _ => Vec::new(),
        }
    }
}

/// Pull every valid candidate out of a loosely shaped JSON value.
///
/// Accepts a single candidate object, an array of them, or a
/// `{success, transaction?, transactions?}` payload. Invalid entries are skipped.
pub fn candidates_from_value(value: &Value) -> Vec<TransactionCandidate> {
    match value {
        Value::Array(items) => items.iter().filter_map(candidate_from_value).collect(),
        Value::Object(map) if map.contains_key("transactions") || map.contains_key("transaction") => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                return Vec::new();
            }
            let mut out: Vec<TransactionCandidate> = map
                .get("transactions")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(candidate_from_value).collect())
                .unwrap_or_default();
            if out.is_empty() {
                if let Some(one) = map.get("transaction").and_then(candidate_from_value) {
                    out.push(one);
                }
            }
            out
        }
        Value::Object(_) => candidate_from_value(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn candidate_from_value(value: &Value) -> Option<TransactionCandidate> {
    serde_json::from_value(value.clone()).ok()
}
