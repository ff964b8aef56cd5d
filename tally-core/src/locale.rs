//! Supported UI locales and the localized notices shown in place of failed replies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::TxnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
    Uk,
    De,
    Es,
}

/// Assistant-style notices substituted for a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The stream finished with no text and no proposals
    EmptyResponse,
    /// The remote call hit the timeout ceiling
    TimedOut,
    /// Quota denied; retry after the cooldown
    RateLimited { retry_after_secs: u64 },
    /// Remote failed and the input looked like a transaction
    TransactionUnavailable,
    /// Remote failed on plain conversation
    ChatUnavailable,
}

impl Locale {
    pub const ALL: [Locale; 5] = [Locale::En, Locale::Ru, Locale::Uk, Locale::De, Locale::Es];

    /// Resolve a locale tag by its primary subtag (`en-US` → `en`).
    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_lowercase();
        match primary.as_str() {
            "ru" => Locale::Ru,
            "uk" | "ua" => Locale::Uk,
            "de" => Locale::De,
            "es" => Locale::Es,
            _ => Locale::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
            Locale::Uk => "uk",
            Locale::De => "de",
            Locale::Es => "es",
        }
    }

    /// Title used when the text carried nothing but an amount
    pub fn default_title(&self, kind: TxnType) -> &'static str {
        match (self, kind) {
            (Locale::En, TxnType::Expense) => "Expense",
            (Locale::En, TxnType::Income) => "Income",
            (Locale::Ru, TxnType::Expense) => "Расход",
            (Locale::Ru, TxnType::Income) => "Доход",
            (Locale::Uk, TxnType::Expense) => "Витрата",
            (Locale::Uk, TxnType::Income) => "Дохід",
            (Locale::De, TxnType::Expense) => "Ausgabe",
            (Locale::De, TxnType::Income) => "Einnahme",
            (Locale::Es, TxnType::Expense) => "Gasto",
            (Locale::Es, TxnType::Income) => "Ingreso",
        }
    }

    pub fn notice(&self, notice: Notice) -> String {
        match notice {
            Notice::EmptyResponse => match self {
                Locale::En => "I couldn't come up with an answer. Try rephrasing, e.g. \"coffee 4.50\".",
                Locale::Ru => "Не получилось ответить. Попробуйте переформулировать, например «кофе 150».",
                Locale::Uk => "Не вдалося відповісти. Спробуйте інакше, наприклад «кава 50».",
                Locale::De => "Darauf habe ich keine Antwort. Versuch es anders, z. B. „Kaffee 3,50“.",
                Locale::Es => "No pude responder. Prueba a reformularlo, por ejemplo «café 2,50».",
            }
            .to_string(),
            Notice::TimedOut => match self {
                Locale::En => "That took too long and was cancelled. Please try again.",
                Locale::Ru => "Ответ занял слишком много времени и был отменён. Попробуйте ещё раз.",
                Locale::Uk => "Відповідь забрала забагато часу й була скасована. Спробуйте ще раз.",
                Locale::De => "Das hat zu lange gedauert und wurde abgebrochen. Bitte versuch es erneut.",
                Locale::Es => "Tardó demasiado y se canceló. Inténtalo de nuevo.",
            }
            .to_string(),
            Notice::RateLimited { retry_after_secs } => match self {
                Locale::En => format!("You've hit the request limit. Try again in {retry_after_secs} s."),
                Locale::Ru => format!("Достигнут лимит запросов. Повторите через {retry_after_secs} с."),
                Locale::Uk => format!("Досягнуто ліміту запитів. Повторіть через {retry_after_secs} с."),
                Locale::De => format!("Anfragelimit erreicht. Versuch es in {retry_after_secs} s erneut."),
                Locale::Es => format!("Has alcanzado el límite de solicitudes. Reintenta en {retry_after_secs} s."),
            },
            Notice::TransactionUnavailable => match self {
                Locale::En => "Looks like a transaction, but I couldn't process it right now. Try a format like \"taxi 12\".",
                Locale::Ru => "Похоже на операцию, но обработать её сейчас не удалось. Попробуйте формат «такси 300».",
                Locale::Uk => "Схоже на операцію, але зараз її не вдалося обробити. Спробуйте формат «таксі 120».",
                Locale::De => "Sieht nach einer Buchung aus, konnte aber gerade nicht verarbeitet werden. Versuch z. B. „Taxi 12“.",
                Locale::Es => "Parece una transacción, pero no pude procesarla ahora. Prueba con «taxi 12».",
            }
            .to_string(),
            Notice::ChatUnavailable => match self {
                Locale::En => "The assistant is unavailable right now. Please try again later.",
                Locale::Ru => "Ассистент сейчас недоступен. Попробуйте позже.",
                Locale::Uk => "Асистент зараз недоступний. Спробуйте пізніше.",
                Locale::De => "Der Assistent ist gerade nicht erreichbar. Bitte später erneut versuchen.",
                Locale::Es => "El asistente no está disponible ahora. Inténtalo más tarde.",
            }
            .to_string(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_primary_subtag() {
        assert_eq!(Locale::from_tag("en-US"), Locale::En);
        assert_eq!(Locale::from_tag("ru_RU"), Locale::Ru);
        assert_eq!(Locale::from_tag("UK"), Locale::Uk);
        assert_eq!(Locale::from_tag("de"), Locale::De);
        assert_eq!(Locale::from_tag("es-419"), Locale::Es);
    }

    #[test]
    fn test_unknown_tag_falls_back_to_english() {
        assert_eq!(Locale::from_tag("fr"), Locale::En);
        assert_eq!(Locale::from_tag(""), Locale::En);
    }

    #[test]
    fn test_every_locale_has_distinct_fallbacks() {
        for l in Locale::ALL {
            let tx = l.notice(Notice::TransactionUnavailable);
            let chat = l.notice(Notice::ChatUnavailable);
            assert_ne!(tx, chat, "{l}");
            assert!(l.notice(Notice::RateLimited { retry_after_secs: 42 }).contains("42"));
        }
    }
}
