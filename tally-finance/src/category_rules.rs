//! Category suggestions for new candidates.
//!
//! Priority: the budget of the most recent similar transaction > keyword
//! table > none. Keywords cover the five supported languages.

use tally_core::{budget_name, normalize_title, Budget, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Groceries,
    Food,
    Transport,
    Housing,
    Utilities,
    Subscriptions,
    Health,
    Entertainment,
    Income,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Subscriptions => "Subscriptions",
            Category::Health => "Health",
            Category::Entertainment => "Entertainment",
            Category::Income => "Income",
        }
    }
}

/// Keywords shorter than this must match a whole word; longer ones are stems
const STEM_LEN: usize = 5;

/// Suffixes of `t` that begin at a word start
fn word_starts(t: &str) -> impl Iterator<Item = &str> {
    let mut prev_alnum = false;
    t.char_indices().filter_map(move |(i, c)| {
        let start = c.is_alphanumeric() && !prev_alnum;
        prev_alnum = c.is_alphanumeric();
        start.then(|| &t[i..])
    })
}

fn keyword_at(rest: &str, word: &str) -> bool {
    if !rest.starts_with(word) {
        return false;
    }
    word.chars().count() >= STEM_LEN
        || !rest[word.len()..].chars().next().is_some_and(char::is_alphanumeric)
}

fn any(title: &str, words: &[&str]) -> bool {
    word_starts(title).any(|rest| words.iter().any(|w| keyword_at(rest, w)))
}

/// Keyword-based category for a title.
pub fn categorize(title: &str) -> Option<Category> {
    let t = title.to_lowercase();

    // Income
    if any(&t, &["salary", "paycheck", "зарплат", "доход", "дохід", "gehalt", "lohn", "sueldo", "salario", "nómina"]) {
        return Some(Category::Income);
    }

    // Groceries
    if any(&t, &[
        "grocer", "supermarket", "walmart", "aldi", "lidl", "rewe", "edeka", "mercadona",
        "продукт", "пятёрочк", "пятерочк", "магнит", "сільпо", "атб", "supermercado", "lebensmittel",
    ]) {
        return Some(Category::Groceries);
    }

    // Food and drink
    if any(&t, &[
        "coffee", "lunch", "dinner", "breakfast", "restaurant", "pizza", "burger", "cafe", "café",
        "кофе", "обед", "ужин", "кафе", "ресторан", "кава", "обід", "вечеря",
        "kaffee", "mittag", "essen", "restaurante", "comida", "cena", "almuerzo",
    ]) {
        return Some(Category::Food);
    }

    // Transport
    if any(&t, &[
        "taxi", "uber", "bolt", "bus", "metro", "train", "gas", "fuel", "parking",
        "такси", "бензин", "метро", "автобус", "таксі", "пальне",
        "tanken", "benzin", "bahn", "gasolina", "autobús", "gasolin",
    ]) {
        return Some(Category::Transport);
    }

    // Housing
    if any(&t, &["rent", "mortgage", "аренд", "квартир", "оренд", "miete", "alquiler", "hipoteca"]) {
        return Some(Category::Housing);
    }

    // Utilities
    if any(&t, &[
        "electric", "water bill", "internet", "phone", "коммуналк", "свет", "інтернет", "комунал",
        "strom", "handy", "luz", "agua",
    ]) {
        return Some(Category::Utilities);
    }

    // Subscriptions
    if any(&t, &["netflix", "spotify", "youtube", "icloud", "subscription", "подписк", "підписк", "abo", "suscripci"]) {
        return Some(Category::Subscriptions);
    }

    // Health
    if any(&t, &["pharmacy", "doctor", "dentist", "аптек", "врач", "лікар", "apotheke", "arzt", "farmacia", "médico"]) {
        return Some(Category::Health);
    }

    // Entertainment
    if any(&t, &["cinema", "movie", "concert", "кино", "кіно", "концерт", "kino", "cine"]) {
        return Some(Category::Entertainment);
    }

    None
}

/// Budget name used by the most recent transaction with a similar title.
///
/// Titles are compared after `normalize_title`; one containing the other
/// counts as similar. `history` is expected most recent first.
pub fn category_from_history(title: &str, history: &[HistoryEntry], budgets: &[Budget]) -> Option<String> {
    let wanted = normalize_title(title);
    if wanted.is_empty() {
        return None;
    }
    history
        .iter()
        .filter(|h| {
            let seen = normalize_title(&h.title);
            !seen.is_empty() && (seen.contains(&wanted) || wanted.contains(&seen))
        })
        .find_map(|h| budget_name(h.budget_folder_id.as_deref(), budgets))
        .map(str::to_string)
}

/// History first, then keywords.
pub fn smart_category(title: &str, history: &[HistoryEntry], budgets: &[Budget]) -> Option<String> {
    category_from_history(title, history, budgets)
        .or_else(|| categorize(title).map(|c| c.name().to_string()))
}
