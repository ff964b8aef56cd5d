//! Amount and date recognisers used by the local extractor.
//!
//! Locale-independent patterns are compiled once through `re!`; patterns
//! built from a locale's word lists are compiled once per locale.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::Locale;

use crate::types::{rules, LocaleRules, CURRENCY_CODES, CURRENCY_SYMBOLS};

pub mod amount;
pub mod date;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_segment_break, r"[\n;]|,\s+");
re!(re_date_iso, r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b");
re!(re_date_dotted, r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})\b");
re!(re_date_dotted_short, r"\b(\d{1,2})\.(\d{2})\b");
re!(re_date_slash, r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b");

/// Patterns derived from one locale's vocabulary
pub(crate) struct LocalePatterns {
    pub relative: Regex,
    pub day_month: Regex,
    pub month_day: Regex,
    pub amount: Regex,
}

pub(crate) fn patterns(locale: Locale) -> &'static LocalePatterns {
    static CACHE: OnceLock<Vec<LocalePatterns>> = OnceLock::new();
    let all = CACHE.get_or_init(|| {
        Locale::ALL
            .iter()
            .map(|l| LocalePatterns::build(rules(*l)))
            .collect()
    });
    let idx = Locale::ALL.iter().position(|l| *l == locale).unwrap_or(0);
    &all[idx]
}

/// Longest first so alternation never stops at a prefix
fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words.dedup();
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

impl LocalePatterns {
    fn build(r: &LocaleRules) -> Self {
        let relative = format!(
            r"(?i)\b(?:(?P<d2>{})|(?P<d1>{})|(?P<d0>{}))\b",
            alternation(r.day_before_yesterday.iter().copied()),
            alternation(r.yesterday.iter().copied()),
            alternation(r.today.iter().copied()),
        );

        let months = alternation(r.months.iter().map(|(m, _)| *m));
        let day_month = format!(
            r"(?i)\b(?P<day>\d{{1,2}})(?:\.|st|nd|rd|th)?\s+(?:de\s+)?(?P<month>{months})\b\.?(?:,?\s+(?:de\s+)?(?P<year>\d{{4}})\b)?"
        );
        let month_day = format!(
            r"(?i)\b(?P<month>{months})\.?\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(?P<year>\d{{4}})\b)?"
        );

        let group: String = r
            .group_separators
            .iter()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        let symbols: String = CURRENCY_SYMBOLS
            .iter()
            .map(|(s, _)| regex::escape(s))
            .collect();
        let words = alternation(
            CURRENCY_CODES
                .iter()
                .chain(r.currency_words)
                .map(|(w, _)| *w),
        );
        let amount = format!(
            concat!(
                r"(?i)(?:(?P<sign>[+\-−])\s?)?(?:(?P<pre>[{symbols}])\s?)?",
                r"\b(?:(?P<grouped>\d{{1,3}}(?:[{group}]\d{{3}})+(?:[.,]\d{{1,2}})?)|(?P<plain>\d+(?:[.,]\d{{1,3}})?))",
                r"(?P<k>\s?[kк]\b)?",
                r"(?:\s*(?P<post>[{symbols}]|(?:{words})\b))?"
            ),
            symbols = symbols,
            group = group,
            words = words,
        );

        let compile = |pat: &str| Regex::new(pat).expect("invalid locale regex");
        Self {
            relative: compile(&relative),
            day_month: compile(&day_month),
            month_day: compile(&month_day),
            amount: compile(&amount),
        }
    }
}
