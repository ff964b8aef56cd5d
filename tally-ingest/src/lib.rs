//! tally-ingest: offline extraction of transactions from free text in five locales.

pub mod extractor;
pub mod parsers;
pub mod types;

pub use extractor::{parse, parse_on, LocalExtractor};
pub use types::{rules, LocaleRules};
