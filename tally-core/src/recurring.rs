//! Recurring-expense rules: title normalization and exact matching.
//!
//! Candidate titles and rule patterns go through the same `normalize_title`
//! before comparison. Matching is exact on the normalized form; the first
//! rule in inbound order wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::budget::{budget_name, Budget};
use crate::candidate::{TransactionCandidate, TxnType};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringRule {
    pub title_pattern: String,
    pub budget_folder_id: Option<String>,
    pub avg_amount: f64,
    pub cadence: Cadence,
    pub next_due_date: NaiveDate,
    pub active: bool,
}

/// Trailing receipt/invoice numbers: 3+ digits, optionally prefixed by `#` or `*`
fn is_receipt_number(token: &str) -> bool {
    let digits = token.strip_prefix(['#', '*']).unwrap_or(token);
    digits.len() >= 3 && digits.chars().all(|c| c.is_ascii_digit())
}

/// Lower-case, drop emoji and punctuation, collapse whitespace, and strip
/// trailing receipt numbers.
pub fn normalize_title(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        if c.is_alphanumeric() {
            spaced.push(c);
        } else if c == '#' || c == '*' {
            spaced.push(' ');
            spaced.push(c);
        } else {
            spaced.push(' ');
        }
    }

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    while tokens.last().is_some_and(|t| is_receipt_number(t)) {
        tokens.pop();
    }

    tokens
        .iter()
        .map(|t| t.trim_matches(['#', '*']))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First rule whose normalized pattern equals `normalized_title`.
pub fn find_match<'a>(normalized_title: &str, rules: &'a [RecurringRule]) -> Option<&'a RecurringRule> {
    rules
        .iter()
        .find(|r| normalize_title(&r.title_pattern) == normalized_title)
}

/// Normalize the candidate's title and look it up.
pub fn match_candidate<'a>(
    candidate: &TransactionCandidate,
    rules: &'a [RecurringRule],
) -> Option<&'a RecurringRule> {
    let normalized = normalize_title(candidate.title());
    if normalized.is_empty() {
        return None;
    }
    find_match(&normalized, rules)
}

/// Overwrite amount, type and category with the rule's values.
///
/// Recurring rules describe expenses, so the type becomes `Expense`. The
/// category becomes the rule's budget folder name; without a known folder the
/// candidate keeps its own. The replaced values stay on the candidate for undo.
pub fn apply_rule(
    candidate: &TransactionCandidate,
    rule: &RecurringRule,
    budgets: &[Budget],
) -> Result<TransactionCandidate> {
    let category = budget_name(rule.budget_folder_id.as_deref(), budgets)
        .map(str::to_string)
        .or_else(|| candidate.category_name().map(str::to_string));
    candidate.autofilled(rule.avg_amount, TxnType::Expense, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, amount: f64) -> RecurringRule {
        RecurringRule {
            title_pattern: pattern.to_string(),
            budget_folder_id: Some("subs".to_string()),
            avg_amount: amount,
            cadence: Cadence::Monthly,
            next_due_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            active: true,
        }
    }

    #[test]
    fn test_normalize_strips_punctuation_emoji_and_case() {
        assert_eq!(normalize_title("  Netflix!!  🎬 Premium "), "netflix premium");
        assert_eq!(normalize_title("Café—au-lait"), "café au lait");
    }

    #[test]
    fn test_normalize_strips_trailing_receipt_numbers() {
        assert_eq!(normalize_title("Spotify #12345"), "spotify");
        assert_eq!(normalize_title("Spotify*998 4411"), "spotify");
        assert_eq!(normalize_title("Gym 24"), "gym 24");
        assert_eq!(normalize_title("Rent 2026 flat"), "rent 2026 flat");
    }

    #[test]
    fn test_find_match_symmetry() {
        let rules = vec![rule("NETFLIX.com #0042", 15.99)];
        let t = "netflix com";
        assert_eq!(normalize_title(&rules[0].title_pattern), normalize_title(t));
        assert!(find_match(&normalize_title(t), &rules).is_some());
    }

    #[test]
    fn test_first_match_wins_and_no_fuzzy() {
        let rules = vec![rule("Gym", 30.0), rule("gym!", 45.0)];
        assert_eq!(find_match("gym", &rules).unwrap().avg_amount, 30.0);
        assert!(find_match("gym membership", &rules).is_none());
    }

    #[test]
    fn test_apply_rule_overwrites_and_undo_restores() {
        let budgets = vec![Budget::new("subs", "Subscriptions")];
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let manual = TransactionCandidate::new("Netflix", 10.0, TxnType::Income, date)
            .unwrap()
            .with_category(Some("Fun".to_string()));
        let r = rule("netflix", 15.99);

        let filled = apply_rule(&manual, &r, &budgets).unwrap();
        assert_eq!(filled.amount(), 15.99);
        assert_eq!(filled.kind(), TxnType::Expense);
        assert_eq!(filled.category_name(), Some("Subscriptions"));
        assert_eq!(filled.date(), date);

        assert_eq!(filled.undo_autofill(), manual);
    }

    #[test]
    fn test_match_candidate_ignores_empty_titles() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let c = TransactionCandidate::new("#1234", 5.0, TxnType::Expense, date).unwrap();
        assert!(match_candidate(&c, &[rule("", 1.0)]).is_none());
    }
}
