//! Monetary amounts with locale separators, `k` multipliers and currencies.

use std::ops::Range;

use regex::Captures;

use super::patterns;
use crate::types::LocaleRules;

#[derive(Debug, Clone, PartialEq)]
pub struct AmountMatch {
    /// Signed value after the multiplier
    pub value: f64,
    pub explicit_plus: bool,
    pub currency: Option<&'static str>,
    /// Byte range in the scanned text
    pub span: Range<usize>,
}

impl AmountMatch {
    /// Currency or sign next to the number
    pub fn is_marked(&self) -> bool {
        self.explicit_plus || self.currency.is_some() || self.value < 0.0
    }
}

/// Parse the digits of a grouped (`1,234.56`) or plain (`12,5`) number.
pub fn normalize_number(raw: &str, grouped: bool, rules: &LocaleRules) -> Option<f64> {
    let digits: String = if grouped {
        raw.chars()
            .filter(|c| !rules.group_separators.contains(c))
            .collect()
    } else {
        raw.to_string()
    };
    let value: f64 = digits.replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Every amount-looking number in `text`, in order of appearance.
pub fn find_amounts(text: &str, rules: &LocaleRules) -> Vec<AmountMatch> {
    patterns(rules.locale)
        .amount
        .captures_iter(text)
        .filter_map(|caps| amount_from(text, &caps, rules))
        .collect()
}

fn amount_from(text: &str, caps: &Captures<'_>, rules: &LocaleRules) -> Option<AmountMatch> {
    let whole = caps.get(0)?;
    let (num, grouped) = match (caps.name("grouped"), caps.name("plain")) {
        (Some(m), _) => (m, true),
        (None, Some(m)) => (m, false),
        (None, None) => return None,
    };
    let mut value = normalize_number(num.as_str(), grouped, rules)?;

    let k = caps.name("k");
    let post = caps.name("post");
    let tail_end = k.map(|m| m.end()).unwrap_or(num.end());
    // "500g", "2nd": the number is part of a word
    if post.is_none()
        && text[tail_end..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric)
    {
        return None;
    }
    if k.is_some() {
        value *= 1000.0;
    }

    // A sign glued to a word ("wi-5") is punctuation, not a sign
    let sign = caps.name("sign").filter(|s| {
        text[..s.start()]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace)
    });
    let start = match sign {
        Some(s) => s.start(),
        None => caps
            .name("pre")
            .map(|p| p.start())
            .unwrap_or(num.start()),
    };
    let explicit_plus = sign.is_some_and(|s| s.as_str() == "+");
    if sign.is_some_and(|s| s.as_str() != "+") {
        value = -value;
    }

    let currency = caps
        .name("pre")
        .or(post)
        .and_then(|m| rules.currency(m.as_str()));

    Some(AmountMatch {
        value,
        explicit_plus,
        currency,
        span: start..whole.end(),
    })
}

/// The amount a segment is about: the first marked positive one, else the last positive one.
pub fn pick_amount(amounts: &[AmountMatch]) -> Option<&AmountMatch> {
    let positive: Vec<&AmountMatch> = amounts.iter().filter(|a| a.value > 0.0).collect();
    positive
        .iter()
        .find(|a| a.is_marked())
        .or(positive.last())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rules;
    use tally_core::Locale;

    fn values(text: &str, locale: Locale) -> Vec<f64> {
        find_amounts(text, rules(locale)).iter().map(|a| a.value).collect()
    }

    #[test]
    fn test_locale_separators() {
        assert_eq!(values("rent 1,234.56", Locale::En), vec![1234.56]);
        assert_eq!(values("coffee 4,50", Locale::En), vec![4.5]);
        assert_eq!(values("Miete 1.234,56", Locale::De), vec![1234.56]);
        assert_eq!(values("Kaffee 3,50", Locale::De), vec![3.5]);
        assert_eq!(values("аренда 1 234,56", Locale::Ru), vec![1234.56]);
        assert_eq!(values("alquiler 1.200", Locale::Es), vec![1200.0]);
    }

    #[test]
    fn test_k_multiplier() {
        assert_eq!(values("rent 2k", Locale::En), vec![2000.0]);
        assert_eq!(values("ремонт 1,5к", Locale::Ru), vec![1500.0]);
        assert_eq!(values("flour 2kg 3", Locale::En), vec![3.0]);
    }

    #[test]
    fn test_currency_detection() {
        let a = find_amounts("coffee $4.50", rules(Locale::En));
        assert_eq!(a[0].currency, Some("USD"));
        assert_eq!(a[0].value, 4.5);
        let a = find_amounts("такси 300 руб", rules(Locale::Ru));
        assert_eq!(a[0].currency, Some("RUB"));
        let a = find_amounts("Kaffee 3,50 €", rules(Locale::De));
        assert_eq!(a[0].currency, Some("EUR"));
        let a = find_amounts("lunch 12 usd", rules(Locale::En));
        assert_eq!(a[0].currency, Some("USD"));
    }

    #[test]
    fn test_signs() {
        let a = find_amounts("+500 salary", rules(Locale::En));
        assert!(a[0].explicit_plus);
        assert_eq!(a[0].value, 500.0);
        assert_eq!(values("refund -5", Locale::En), vec![-5.0]);
        assert_eq!(values("co-5", Locale::En), vec![5.0]);
    }

    #[test]
    fn test_pick_prefers_marked_then_last() {
        let r = rules(Locale::En);
        let a = find_amounts("2 coffees 12", r);
        assert_eq!(pick_amount(&a).unwrap().value, 12.0);
        let a = find_amounts("$15 for 3 tickets", r);
        assert_eq!(pick_amount(&a).unwrap().value, 15.0);
        let a = find_amounts("refund -5 0", r);
        assert!(pick_amount(&a).is_none());
    }

    #[test]
    fn test_span_covers_sign_and_currency() {
        let text = "tea +$3 now";
        let a = find_amounts(text, rules(Locale::En));
        assert_eq!(&text[a[0].span.clone()], "+$3");
    }
}
