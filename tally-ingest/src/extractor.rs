//! Local extractor: free text → transaction candidates, with no I/O.
//!
//! The text is split into segments (newlines, `;`, `", "`). Each segment with
//! a positive amount yields one candidate; whatever is left after removing
//! the date, the amount and edge filler words becomes the title.

use chrono::{Local, NaiveDate};
use tracing::debug;

use tally_core::{Extract, Locale, ParseOutcome, TransactionCandidate, TxnType};

use crate::parsers::amount::{find_amounts, pick_amount, AmountMatch};
use crate::parsers::date::find_date;
use crate::parsers::re_segment_break;
use crate::types::{rules, LocaleRules};

const EDGE_PUNCT: &[char] = &[
    ',', '.', ';', ':', '!', '?', '(', ')', '"', '\'', '«', '»', '“', '”', '„', '-', '–', '—',
];

/// Extract transactions relative to the local calendar date.
pub fn parse(raw: &str, locale: Locale) -> ParseOutcome {
    parse_on(raw, locale, Local::now().date_naive())
}

/// Deterministic form of [`parse`] with an explicit reference date.
pub fn parse_on(raw: &str, locale: Locale, today: NaiveDate) -> ParseOutcome {
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return ParseOutcome::no_match();
    }
    let rules = rules(locale);

    let scanned: Vec<Scanned> = re_segment_break()
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| scan(s, rules, today))
        .collect();

    // A date mentioned once covers the whole message
    let shared_date = scanned.iter().find_map(|s| s.date).unwrap_or(today);

    let candidates: Vec<TransactionCandidate> = scanned
        .into_iter()
        .filter_map(|s| s.into_candidate(shared_date, rules))
        .collect();
    debug!(%locale, count = candidates.len(), "local extraction");
    ParseOutcome::from_candidates(candidates)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExtractor;

impl Extract for LocalExtractor {
    fn extract(&self, text: &str, locale: Locale, today: NaiveDate) -> ParseOutcome {
        parse_on(text, locale, today)
    }
}

#[derive(Debug)]
struct Scanned {
    title: String,
    amount: Option<AmountMatch>,
    date: Option<NaiveDate>,
    income: bool,
}

impl Scanned {
    fn into_candidate(self, fallback_date: NaiveDate, rules: &LocaleRules) -> Option<TransactionCandidate> {
        let amount = self.amount?;
        let kind = if self.income {
            TxnType::Income
        } else {
            TxnType::Expense
        };
        let title = if self.title.is_empty() {
            rules.locale.default_title(kind).to_string()
        } else {
            self.title
        };
        let candidate =
            TransactionCandidate::new(title, amount.value, kind, self.date.unwrap_or(fallback_date)).ok()?;
        Some(candidate.with_currency(amount.currency.map(str::to_string)))
    }
}

fn scan(segment: &str, rules: &LocaleRules, today: NaiveDate) -> Scanned {
    let mut work = segment.to_string();

    let date = find_date(&work, rules, today).map(|m| {
        blank(&mut work, m.span);
        m.date
    });

    let amount = pick_amount(&find_amounts(&work, rules)).cloned();
    if let Some(a) = &amount {
        blank(&mut work, a.span.clone());
    }

    let income = amount.as_ref().is_some_and(|a| a.explicit_plus)
        || words(segment).any(|w| rules.is_income_word(w));

    Scanned {
        title: capitalize(&title_words(&work, rules).join(" ")),
        amount,
        date,
        income,
    }
}

/// Overwrite a matched span with spaces so later byte offsets stay valid
fn blank(work: &mut String, span: std::ops::Range<usize>) {
    let spaces = " ".repeat(span.len());
    work.replace_range(span, &spaces);
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(EDGE_PUNCT))
        .filter(|w| !w.is_empty())
}

fn title_words<'a>(work: &'a str, rules: &LocaleRules) -> Vec<&'a str> {
    let mut out: Vec<&str> = words(work).collect();
    let lead = out.iter().take_while(|w| rules.is_filler(w)).count();
    out.drain(..lead);
    while out.last().is_some_and(|w| rules.is_filler(w)) {
        out.pop();
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
    }

    fn yesterday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn one(text: &str, locale: Locale) -> TransactionCandidate {
        let mut all = parse_on(text, locale, today()).into_candidates();
        assert_eq!(all.len(), 1, "{text}: {all:?}");
        all.remove(0)
    }

    #[test]
    fn test_yesterday_gas() {
        let c = one("Yesterday gas 500", Locale::En);
        assert_eq!(c.title(), "Gas");
        assert_eq!(c.amount(), 500.0);
        assert_eq!(c.kind(), TxnType::Expense);
        assert_eq!(c.date(), yesterday());
        assert_eq!(c.currency(), None);
    }

    #[test]
    fn test_leap_day_is_a_date_not_an_amount() {
        let c = one("такси 29.02 300", Locale::Ru);
        assert_eq!(c.amount(), 300.0);
        assert_eq!(c.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(c.title(), "Такси");
    }

    #[test]
    fn test_parse_is_idempotent() {
        for text in ["Yesterday gas 500", "coffee 4.50; taxi 12", "hello", "вчера такси 1 200 руб"] {
            assert_eq!(parse_on(text, Locale::Ru, today()), parse_on(text, Locale::Ru, today()));
            assert_eq!(parse_on(text, Locale::En, today()), parse_on(text, Locale::En, today()));
        }
    }

    #[test]
    fn test_conversation_is_not_a_transaction() {
        let out = parse_on("let's talk about my week", Locale::En, today());
        assert!(!out.success);
        assert!(out.transaction.is_none());
    }

    #[test]
    fn test_multiple_segments() {
        let all = parse_on("coffee 4.50; taxi 12\nlunch 9", Locale::En, today()).into_candidates();
        let titles: Vec<&str> = all.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Coffee", "Taxi", "Lunch"]);
        assert_eq!(all[0].amount(), 4.5);
    }

    #[test]
    fn test_date_applies_to_every_segment() {
        let all = parse_on("yesterday coffee 4, bus 2", Locale::En, today()).into_candidates();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|c| c.date() == yesterday()));
        assert_eq!(all[1].title(), "Bus");
    }

    #[test]
    fn test_locales() {
        let c = one("gestern Kaffee 3,50 €", Locale::De);
        assert_eq!((c.title(), c.amount(), c.currency()), ("Kaffee", 3.5, Some("EUR")));
        assert_eq!(c.date(), yesterday());

        let c = one("вчера такси 1 200 руб", Locale::Ru);
        assert_eq!((c.title(), c.amount(), c.currency()), ("Такси", 1200.0, Some("RUB")));

        let c = one("кава 50 грн", Locale::Uk);
        assert_eq!((c.title(), c.currency()), ("Кава", Some("UAH")));

        let c = one("ayer café 2,50 euros", Locale::Es);
        assert_eq!((c.title(), c.amount(), c.currency()), ("Café", 2.5, Some("EUR")));
    }

    #[test]
    fn test_income_markers() {
        let c = one("+2k salary", Locale::En);
        assert_eq!((c.title(), c.amount(), c.kind()), ("Salary", 2000.0, TxnType::Income));

        let c = one("зарплата 50000", Locale::Ru);
        assert_eq!((c.title(), c.kind()), ("Зарплата", TxnType::Income));
    }

    #[test]
    fn test_filler_words_and_default_titles() {
        assert_eq!(one("spent 20 on lunch", Locale::En).title(), "Lunch");
        assert_eq!(one("paid 15", Locale::En).title(), "Expense");
        assert_eq!(one("+15", Locale::En).title(), "Income");
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        assert!(!parse_on("-5 refund", Locale::En, today()).success);
        assert!(!parse_on("gas 0", Locale::En, today()).success);
    }

    #[test]
    fn test_extract_trait_matches_parse_on() {
        let via_trait = LocalExtractor.extract("taxi 12", Locale::En, today());
        assert_eq!(via_trait, parse_on("taxi 12", Locale::En, today()));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let out = parse_on("taxi 12", Locale::En, today());
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["transactions"][0]["type"], "expense");
        assert_eq!(v["transaction"]["title"], "Taxi");
    }
}
