//! Relative and explicit dates.
//!
//! Tried in order: relative words, ISO, dotted with year, dotted without year
//! (comma-decimal locales only), slash, `<day> <month>`, `<month> <day>`.
//! A date without a year is the latest such day not after `today`.

use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate};
use regex::{Captures, Regex};

use super::{patterns, re_date_dotted, re_date_dotted_short, re_date_iso, re_date_slash};
use crate::types::LocaleRules;

#[derive(Debug, Clone, PartialEq)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub span: Range<usize>,
}

pub fn find_date(text: &str, rules: &LocaleRules, today: NaiveDate) -> Option<DateMatch> {
    let p = patterns(rules.locale);

    relative(text, &p.relative, today)
        .or_else(|| first_valid(re_date_iso(), text, |c| {
            let year: i32 = c.get(1)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, num(c, 2)?, num(c, 3)?)
        }))
        .or_else(|| first_valid(re_date_dotted(), text, |c| {
            resolve(num(c, 1)?, num(c, 2)?, year(c.get(3)?.as_str()), today)
        }))
        .or_else(|| {
            if !rules.short_dotted_dates {
                return None;
            }
            first_valid(re_date_dotted_short(), text, |c| {
                resolve(num(c, 1)?, num(c, 2)?, None, today)
            })
        })
        .or_else(|| first_valid(re_date_slash(), text, |c| {
            let (a, b) = (num(c, 1)?, num(c, 2)?);
            let (day, month) = if rules.month_first { (b, a) } else { (a, b) };
            let y = c.get(3).and_then(|m| year(m.as_str()));
            if c.get(3).is_some() && y.is_none() {
                return None;
            }
            resolve(day, month, y, today)
        }))
        .or_else(|| first_valid(&p.day_month, text, |c| named(c, rules, today)))
        .or_else(|| first_valid(&p.month_day, text, |c| named(c, rules, today)))
}

fn relative(text: &str, re: &Regex, today: NaiveDate) -> Option<DateMatch> {
    let c = re.captures(text)?;
    let days_back = if c.name("d2").is_some() {
        2
    } else if c.name("d1").is_some() {
        1
    } else {
        0
    };
    let whole = c.get(0)?;
    Some(DateMatch {
        date: today - Duration::days(days_back),
        span: whole.range(),
    })
}

fn first_valid(
    re: &Regex,
    text: &str,
    to_date: impl Fn(&Captures<'_>) -> Option<NaiveDate>,
) -> Option<DateMatch> {
    re.captures_iter(text).find_map(|c| {
        let date = to_date(&c)?;
        Some(DateMatch {
            date,
            span: c.get(0)?.range(),
        })
    })
}

fn num(c: &Captures<'_>, i: usize) -> Option<u32> {
    c.get(i)?.as_str().parse().ok()
}

fn year(s: &str) -> Option<i32> {
    let y: i32 = s.parse().ok()?;
    match s.len() {
        2 => Some(2000 + y),
        4 => Some(y),
        _ => None,
    }
}

fn named(c: &Captures<'_>, rules: &LocaleRules, today: NaiveDate) -> Option<NaiveDate> {
    let day: u32 = c.name("day")?.as_str().parse().ok()?;
    let month = rules.month(c.name("month")?.as_str())?;
    let y = c.name("year").and_then(|m| year(m.as_str()));
    resolve(day, month, y, today)
}

fn resolve(day: u32, month: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day),
        // Most recent occurrence; 29 February can be up to 8 years back
        None => (0..=8)
            .filter_map(|back| NaiveDate::from_ymd_opt(today.year() - back, month, day))
            .find(|d| *d <= today),
    }
}
