//! tally-core: transaction candidates, conversation state and proposal cards for Tally

pub mod budget;
pub mod candidate;
pub mod error;
pub mod frames;
pub mod locale;
pub mod message;
pub mod proposal;
pub mod recurring;
pub mod session;
pub mod store;
pub mod time;

pub use budget::{budget_name, select_budget, Budget};
pub use candidate::{candidates_from_value, ManualValues, ParseOutcome, TransactionCandidate, TxnType};
pub use error::{Error, Result};
pub use frames::{parse_frame, Frame, StreamDecoder};
pub use locale::{Locale, Notice};
pub use message::{
    ConversationMessage, InvocationState, Role, ToolCall, ToolInvocation, ToolInvocations, ToolName,
};
pub use proposal::{CardState, Draft, Origin, ProposalCard, SAVED_BANNER_SECS};
pub use recurring::{apply_rule, find_match, match_candidate, normalize_title, Cadence, RecurringRule};
pub use session::{
    looks_like_transaction, Effect, Event, Extract, QuotaVerdict, RemoteRequest, Session,
    SessionConfig, SubmissionId, LOCAL_PARSE_REQUEST,
};
pub use store::{HistoryEntry, NewTransaction, Store, TransactionId};
