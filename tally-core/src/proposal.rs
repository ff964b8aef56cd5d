//! Proposal cards: the per-proposal edit/confirm/save lifecycle.
//!
//! States:
//!   Viewing ⇄ Editing
//!   Viewing | Editing → Saving → Saved (→ Viewing after SAVED_BANNER_SECS)
//!                              → Failed (→ back to where the save started)

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::budget::{select_budget, Budget};
use crate::candidate::{TransactionCandidate, TxnType};
use crate::error::{Error, Result};
use crate::store::{NewTransaction, Store, TransactionId};

/// How long the "saved" confirmation stays visible, in seconds
pub const SAVED_BANNER_SECS: i64 = 3;

/// Where a save started from, so a failure can return there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardState {
    Viewing,
    Editing,
    Saving { from: Origin },
    Saved { id: TransactionId, at: DateTime<Utc> },
    Failed { message: String, from: Origin },
}

/// Editable copy of a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub title: String,
    pub amount: f64,
    pub kind: TxnType,
    pub category_name: Option<String>,
    pub date: NaiveDate,
    pub budget_folder_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProposalCard {
    candidate: TransactionCandidate,
    draft: Draft,
    budgets: Vec<Budget>,
    state: CardState,
}

impl ProposalCard {
    /// Build a card, auto-selecting a budget from the candidate's category.
    pub fn new(candidate: TransactionCandidate, budgets: Vec<Budget>) -> Self {
        let draft = draft_from(&candidate, &budgets);
        Self {
            candidate,
            draft,
            budgets,
            state: CardState::Viewing,
        }
    }

    pub fn candidate(&self) -> &TransactionCandidate {
        &self.candidate
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, CardState::Saving { .. })
    }

    pub fn edit(&mut self) -> Result<()> {
        self.settle_failure();
        match self.state {
            CardState::Saving { .. } => Err(Error::SaveInFlight),
            _ => {
                self.state = CardState::Editing;
                Ok(())
            }
        }
    }

    pub fn view(&mut self) -> Result<()> {
        self.settle_failure();
        match self.state {
            CardState::Saving { .. } => Err(Error::SaveInFlight),
            _ => {
                self.state = CardState::Viewing;
                Ok(())
            }
        }
    }

    /// Mutate the draft. Enters `Editing`; rejected while saving.
    pub fn update(&mut self, apply: impl FnOnce(&mut Draft)) -> Result<()> {
        self.edit()?;
        apply(&mut self.draft);
        Ok(())
    }

    /// Restore manually-entered values replaced by a recurring auto-fill.
    pub fn undo_autofill(&mut self) -> Result<bool> {
        if self.is_saving() {
            return Err(Error::SaveInFlight);
        }
        if !self.candidate.is_autofilled() {
            return Ok(false);
        }
        self.candidate = self.candidate.undo_autofill();
        self.draft = draft_from(&self.candidate, &self.budgets);
        Ok(true)
    }

    /// Enter `Saving` and produce the record to persist.
    pub fn begin_save(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<NewTransaction> {
        self.settle_failure();
        let from = match self.state {
            CardState::Saving { .. } => return Err(Error::SaveInFlight),
            CardState::Editing => Origin::Editing,
            _ => Origin::Viewing,
        };
        let record = self.record(user_id, now)?;
        self.state = CardState::Saving { from };
        Ok(record)
    }

    pub fn save_succeeded(&mut self, id: TransactionId, now: DateTime<Utc>) -> Result<()> {
        if !self.is_saving() {
            return Err(Error::NotSaving);
        }
        debug!(%id, "proposal saved");
        self.state = CardState::Saved { id, at: now };
        Ok(())
    }

    /// Report the store's message verbatim and return to the pre-save state.
    pub fn save_failed(&mut self, message: &str, on_error: impl FnOnce(&str)) -> Result<()> {
        let CardState::Saving { from } = self.state else {
            return Err(Error::NotSaving);
        };
        warn!(error = %message, "proposal save failed");
        on_error(message);
        self.state = CardState::Failed {
            message: message.to_string(),
            from,
        };
        Ok(())
    }

    /// Revert the saved confirmation once `SAVED_BANNER_SECS` have elapsed,
    /// and leave a failure for the state it interrupted.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let CardState::Saved { at, .. } = &self.state {
            if now - *at >= Duration::seconds(SAVED_BANNER_SECS) {
                self.state = CardState::Viewing;
            }
        }
        self.settle_failure();
    }

    /// Persist the draft through `store`.
    pub async fn save(
        &mut self,
        store: &dyn Store,
        user_id: &str,
        now: DateTime<Utc>,
        on_error: impl FnOnce(&str),
    ) -> Result<Option<TransactionId>> {
        let record = match self.begin_save(user_id, now) {
            Ok(r) => r,
            Err(Error::SaveInFlight) => return Err(Error::SaveInFlight),
            Err(e) => {
                on_error(&e.to_string());
                return Ok(None);
            }
        };
        match store.insert_transaction(&record).await {
            Ok(id) => {
                self.save_succeeded(id.clone(), now)?;
                Ok(Some(id))
            }
            Err(e) => {
                self.save_failed(&e.to_string(), on_error)?;
                Ok(None)
            }
        }
    }

    fn settle_failure(&mut self) {
        if let CardState::Failed { from, .. } = self.state {
            self.state = match from {
                Origin::Viewing => CardState::Viewing,
                Origin::Editing => CardState::Editing,
            };
        }
    }

    fn record(&self, user_id: &str, now: DateTime<Utc>) -> Result<NewTransaction> {
        let checked = TransactionCandidate::new(
            self.draft.title.clone(),
            self.draft.amount,
            self.draft.kind,
            self.draft.date,
        )?;
        Ok(NewTransaction {
            user_id: user_id.to_string(),
            title: checked.title().to_string(),
            amount: checked.amount(),
            kind: checked.kind(),
            budget_folder_id: self.draft.budget_folder_id.clone(),
            created_at: self
                .draft
                .date
                .and_time(now.time())
                .and_utc(),
        })
    }
}

fn draft_from(candidate: &TransactionCandidate, budgets: &[Budget]) -> Draft {
    Draft {
        title: candidate.title().to_string(),
        amount: candidate.amount(),
        kind: candidate.kind(),
        category_name: candidate.category_name().map(str::to_string),
        date: candidate.date(),
        budget_folder_id: select_budget(candidate.category_name(), budgets).map(|b| b.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurring::{apply_rule, Cadence, RecurringRule};
    use crate::store::HistoryEntry;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn card() -> ProposalCard {
        let c = TransactionCandidate::new("Taxi", 14.0, TxnType::Expense, now().date_naive())
            .unwrap()
            .with_category(Some("transport".to_string()));
        ProposalCard::new(
            c,
            vec![Budget::new("b1", "Food"), Budget::new("b2", "Transport")],
        )
    }

    struct FakeStore {
        fail_with: Option<String>,
        saved: Mutex<Vec<NewTransaction>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn insert_transaction(&self, tx: &NewTransaction) -> Result<TransactionId> {
            if let Some(msg) = &self.fail_with {
                return Err(Error::Store(msg.clone()));
            }
            self.saved.lock().unwrap().push(tx.clone());
            Ok("txn-1".to_string())
        }

        async fn update_transaction(&self, _id: &str, _tx: &NewTransaction) -> Result<()> {
            Ok(())
        }

        async fn budget_folders(&self, _user_id: &str) -> Result<Vec<Budget>> {
            Ok(vec![])
        }

        async fn recurring_rules(&self, _user_id: &str) -> Result<Vec<RecurringRule>> {
            Ok(vec![])
        }

        async fn recent_transactions(&self, _user_id: &str, _limit: usize) -> Result<Vec<HistoryEntry>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_budget_auto_selected_from_category() {
        assert_eq!(card().draft().budget_folder_id.as_deref(), Some("b2"));
    }

    #[test]
    fn test_viewing_editing_toggle() {
        let mut c = card();
        c.edit().unwrap();
        assert_eq!(c.state(), &CardState::Editing);
        c.view().unwrap();
        assert_eq!(c.state(), &CardState::Viewing);
    }

    #[test]
    fn test_no_edit_while_saving() {
        let mut c = card();
        c.begin_save("u1", now()).unwrap();
        assert_eq!(c.edit(), Err(Error::SaveInFlight));
        assert_eq!(c.update(|d| d.amount = 1.0), Err(Error::SaveInFlight));
        assert!(matches!(c.begin_save("u1", now()), Err(Error::SaveInFlight)));
        assert_eq!(c.draft().amount, 14.0);
    }

    #[test]
    fn test_saved_banner_reverts_after_delay() {
        let mut c = card();
        c.begin_save("u1", now()).unwrap();
        c.save_succeeded("txn-9".into(), now()).unwrap();
        c.tick(now() + Duration::seconds(1));
        assert!(matches!(c.state(), CardState::Saved { .. }));
        c.tick(now() + Duration::seconds(SAVED_BANNER_SECS));
        assert_eq!(c.state(), &CardState::Viewing);
    }

    #[test]
    fn test_failure_reports_verbatim_and_returns_to_editing() {
        let mut c = card();
        c.update(|d| d.amount = 20.0).unwrap();
        c.begin_save("u1", now()).unwrap();
        let mut seen = String::new();
        c.save_failed("duplicate key value", |m| seen = m.to_string()).unwrap();
        assert_eq!(seen, "duplicate key value");
        c.tick(now());
        assert_eq!(c.state(), &CardState::Editing);
        assert_eq!(c.draft().amount, 20.0);
    }

    #[test]
    fn test_invalid_draft_is_not_saved() {
        let mut c = card();
        c.update(|d| d.amount = 0.0).unwrap();
        assert!(matches!(c.begin_save("u1", now()), Err(Error::NonPositiveAmount(_))));
        assert_eq!(c.state(), &CardState::Editing);
    }

    #[test]
    fn test_undo_autofill_restores_draft() {
        let date = now().date_naive();
        let manual = TransactionCandidate::new("Gym", 25.0, TxnType::Expense, date).unwrap();
        let rule = RecurringRule {
            title_pattern: "gym".into(),
            budget_folder_id: Some("b2".into()),
            avg_amount: 40.0,
            cadence: Cadence::Monthly,
            next_due_date: date,
            active: true,
        };
        let budgets = vec![Budget::new("b1", "Food"), Budget::new("b2", "Health")];
        let filled = apply_rule(&manual, &rule, &budgets).unwrap();
        let mut c = ProposalCard::new(filled, budgets);
        assert_eq!(c.draft().amount, 40.0);
        assert_eq!(c.draft().budget_folder_id.as_deref(), Some("b2"));

        assert!(c.undo_autofill().unwrap());
        assert_eq!(c.draft().amount, 25.0);
        assert_eq!(c.draft().budget_folder_id.as_deref(), Some("b1"));
        assert!(!c.undo_autofill().unwrap());
    }

    #[tokio::test]
    async fn test_save_through_store() {
        let store = FakeStore { fail_with: None, saved: Mutex::new(vec![]) };
        let mut c = card();
        let id = c.save(&store, "u1", now(), |_| panic!("no error expected")).await.unwrap();
        assert_eq!(id.as_deref(), Some("txn-1"));
        let saved = store.saved.lock().unwrap();
        assert_eq!(saved[0].budget_folder_id.as_deref(), Some("b2"));
        assert_eq!(saved[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_store_failure_never_sticks_in_saving() {
        let store = FakeStore {
            fail_with: Some("connection refused".into()),
            saved: Mutex::new(vec![]),
        };
        let mut c = card();
        let mut seen = None;
        let id = c
            .save(&store, "u1", now(), |m| seen = Some(m.to_string()))
            .await
            .unwrap();
        assert!(id.is_none());
        assert_eq!(seen.as_deref(), Some("connection refused"));
        assert!(!c.is_saving());
        c.view().unwrap();
        assert_eq!(c.state(), &CardState::Viewing);
    }
}
