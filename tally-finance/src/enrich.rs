//! Enrichment of locally extracted candidates before they are proposed.
//!
//! Budgets and recurring rules are loaded from the store once per session;
//! transaction history is read per batch. Any store failure is logged and
//! the candidates pass through unchanged.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use tally_core::{
    apply_rule, match_candidate, Budget, HistoryEntry, RecurringRule, Store, TransactionCandidate,
};

use crate::category_rules::smart_category;

#[derive(Debug, Default)]
struct SessionData {
    budgets: Vec<Budget>,
    rules: Vec<RecurringRule>,
}

pub struct Enricher {
    store: Arc<dyn Store>,
    user_id: String,
    history_limit: usize,
    data: OnceCell<SessionData>,
}

impl Enricher {
    pub fn new(store: Arc<dyn Store>, user_id: impl Into<String>, history_limit: usize) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            history_limit,
            data: OnceCell::new(),
        }
    }

    async fn data(&self) -> &SessionData {
        self.data
            .get_or_init(|| async {
                let budgets = self
                    .store
                    .budget_folders(&self.user_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "loading budget folders failed");
                        Vec::new()
                    });
                let rules: Vec<RecurringRule> = self
                    .store
                    .recurring_rules(&self.user_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "loading recurring rules failed");
                        Vec::new()
                    })
                    .into_iter()
                    .filter(|r| r.active)
                    .collect();
                debug!(budgets = budgets.len(), rules = rules.len(), "session data loaded");
                SessionData { budgets, rules }
            })
            .await
    }

    /// The user's budget folders, for proposal cards
    pub async fn budgets(&self) -> Vec<Budget> {
        self.data().await.budgets.clone()
    }

    /// Smart category lookup, then recurring auto-fill.
    pub async fn enrich(&self, candidates: Vec<TransactionCandidate>) -> Vec<TransactionCandidate> {
        let data = self.data().await;
        let history = self
            .store
            .recent_transactions(&self.user_id, self.history_limit)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "loading transaction history failed");
                Vec::new()
            });

        candidates
            .into_iter()
            .map(|c| enrich_one(c, data, &history))
            .collect()
    }
}

fn enrich_one(
    candidate: TransactionCandidate,
    data: &SessionData,
    history: &[HistoryEntry],
) -> TransactionCandidate {
    let candidate = match candidate.category_name() {
        Some(_) => candidate,
        None => {
            let category = smart_category(candidate.title(), history, &data.budgets);
            candidate.with_category(category)
        }
    };

    let Some(rule) = match_candidate(&candidate, &data.rules) else {
        return candidate;
    };
    match apply_rule(&candidate, rule, &data.budgets) {
        Ok(filled) => {
            debug!(title = candidate.title(), rule = %rule.title_pattern, "recurring rule applied");
            filled
        }
        Err(e) => {
            warn!(error = %e, rule = %rule.title_pattern, "recurring rule not applicable");
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tally_core::{Cadence, Error, NewTransaction, Result, TransactionId, TxnType};

    #[derive(Default)]
    struct FakeStore {
        fail: bool,
        rule_loads: AtomicUsize,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn insert_transaction(&self, _tx: &NewTransaction) -> Result<TransactionId> {
            Ok("t1".into())
        }

        async fn update_transaction(&self, _id: &str, _tx: &NewTransaction) -> Result<()> {
            Ok(())
        }

        async fn budget_folders(&self, _user_id: &str) -> Result<Vec<Budget>> {
            if self.fail {
                return Err(Error::Store("db down".into()));
            }
            Ok(vec![Budget::new("b-subs", "Subscriptions"), Budget::new("b-car", "Car")])
        }

        async fn recurring_rules(&self, _user_id: &str) -> Result<Vec<RecurringRule>> {
            self.rule_loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Store("db down".into()));
            }
            let rule = |pattern: &str, active: bool| RecurringRule {
                title_pattern: pattern.into(),
                budget_folder_id: Some("b-subs".into()),
                avg_amount: 15.99,
                cadence: Cadence::Monthly,
                next_due_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                active,
            };
            Ok(vec![rule("Old gym", false), rule("Netflix #8812", true)])
        }

        async fn recent_transactions(&self, _user_id: &str, _limit: usize) -> Result<Vec<HistoryEntry>> {
            if self.fail {
                return Err(Error::Store("db down".into()));
            }
            Ok(vec![HistoryEntry {
                title: "Shell gas".into(),
                budget_folder_id: Some("b-car".into()),
                created_at: Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap(),
            }])
        }
    }

    fn candidate(title: &str, amount: f64) -> TransactionCandidate {
        TransactionCandidate::new(title, amount, TxnType::Expense, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_category_and_recurring_fill() {
        let store = Arc::new(FakeStore::default());
        let enricher = Enricher::new(store.clone(), "u1", 50);

        let out = enricher.enrich(vec![candidate("Gas", 40.0), candidate("netflix", 10.0)]).await;
        assert_eq!(out[0].category_name(), Some("Car"));
        assert!(!out[0].is_autofilled());

        assert_eq!(out[1].amount(), 15.99);
        assert_eq!(out[1].category_name(), Some("Subscriptions"));
        assert_eq!(out[1].undo_autofill().amount(), 10.0);

        enricher.enrich(vec![candidate("Gas", 1.0)]).await;
        assert_eq!(store.rule_loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inactive_rules_ignored() {
        let enricher = Enricher::new(Arc::new(FakeStore::default()), "u1", 50);
        let out = enricher.enrich(vec![candidate("old gym", 30.0)]).await;
        assert_eq!(out[0].amount(), 30.0);
        assert!(!out[0].is_autofilled());
    }

    #[tokio::test]
    async fn test_store_failures_pass_candidates_through() {
        let store = Arc::new(FakeStore { fail: true, ..Default::default() });
        let enricher = Enricher::new(store, "u1", 50);
        let out = enricher.enrich(vec![candidate("Netflix", 10.0)]).await;
        assert_eq!(out[0].amount(), 10.0);
        assert_eq!(out[0].category_name(), Some("Subscriptions"));
        assert!(enricher.budgets().await.is_empty());
    }
}
