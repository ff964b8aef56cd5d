//! tally-finance: candidate enrichment, category rules and the CSV ledger

pub mod category_rules;
pub mod enrich;
pub mod ledger;

pub use category_rules::{categorize, smart_category, Category};
pub use enrich::Enricher;
pub use ledger::{Ledger, LedgerError};
