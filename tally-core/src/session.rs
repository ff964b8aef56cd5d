//! Per-conversation request orchestration as an explicit state machine.
//!
//! `Session::handle` is the only mutator: it takes one `Event` plus the current
//! time and returns the `Effect`s the driver must run. I/O never happens here.
//!
//!   Idle → QuotaCheck → Enriching → Idle        (local extraction found candidates)
//!   Idle → RemoteCall → Streaming → Idle        (nothing local, ask the remote)
//!   any  → Idle                                 (abort, timeout, failure)
//!
//! Every submission carries a fresh `SubmissionId`; events for any other id are
//! dropped, so a superseded request can never touch the log.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::candidate::{candidates_from_value, ParseOutcome, TransactionCandidate};
use crate::frames::StreamDecoder;
use crate::locale::{Locale, Notice};
use crate::message::{ConversationMessage, ToolCall, ToolName};
use crate::time::{local_date, MAX_RETRY_AFTER_SECS};

pub type SubmissionId = u64;

/// `requestType` reported to the quota service for local parses
pub const LOCAL_PARSE_REQUEST: &str = "local_parse";

/// Text → candidates, with no I/O
pub trait Extract: Send + Sync {
    fn extract(&self, text: &str, locale: Locale, today: NaiveDate) -> ParseOutcome;
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_id: String,
    pub locale: Locale,
    pub tone: String,
    pub timezone: Tz,
    pub default_cooldown_secs: u64,
}

/// Body of the remote extraction call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRequest {
    pub user_id: String,
    pub message: String,
    pub tone: String,
    pub locale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaVerdict {
    Allowed,
    Denied { retry_after_secs: Option<u64> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Submit { text: String },
    /// User-initiated stop: silent
    Abort,
    QuotaChecked { id: SubmissionId, verdict: QuotaVerdict },
    Enriched { id: SubmissionId, candidates: Vec<TransactionCandidate> },
    Chunk { id: SubmissionId, bytes: Vec<u8> },
    StreamEnded { id: SubmissionId },
    /// A complete `application/json` response body
    JsonBody { id: SubmissionId, body: Vec<u8> },
    HttpFailure { id: SubmissionId, status: u16, retry_after_secs: Option<u64> },
    TransportFailed { id: SubmissionId, error: String },
    TimedOut { id: SubmissionId },
}

impl Event {
    fn submission(&self) -> Option<SubmissionId> {
        match self {
            Event::Submit { .. } | Event::Abort => None,
            Event::QuotaChecked { id, .. }
            | Event::Enriched { id, .. }
            | Event::Chunk { id, .. }
            | Event::StreamEnded { id }
            | Event::JsonBody { id, .. }
            | Event::HttpFailure { id, .. }
            | Event::TransportFailed { id, .. }
            | Event::TimedOut { id } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Cancel the operation running for this submission
    Cancel(SubmissionId),
    CheckQuota {
        id: SubmissionId,
        request_type: &'static str,
        prompt_chars: usize,
    },
    Enrich {
        id: SubmissionId,
        candidates: Vec<TransactionCandidate>,
    },
    CallRemote {
        id: SubmissionId,
        request: RemoteRequest,
    },
    /// The submission reached a terminal state; drop its cancellation handle
    Settled(SubmissionId),
}

#[derive(Debug)]
enum Phase {
    Idle,
    QuotaCheck {
        id: SubmissionId,
        input: String,
        candidates: Vec<TransactionCandidate>,
    },
    Enriching {
        id: SubmissionId,
        input: String,
    },
    RemoteCall {
        id: SubmissionId,
        input: String,
    },
    Streaming {
        id: SubmissionId,
        input: String,
        decoder: StreamDecoder,
        /// The body so far, while it still reads as a JSON object
        raw: Option<Vec<u8>>,
    },
}

impl Phase {
    fn id(&self) -> Option<SubmissionId> {
        match self {
            Phase::Idle => None,
            Phase::QuotaCheck { id, .. }
            | Phase::Enriching { id, .. }
            | Phase::RemoteCall { id, .. }
            | Phase::Streaming { id, .. } => Some(*id),
        }
    }
}

/// Non-streaming replies, discriminated by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum StructuredReply {
    Action {
        #[serde(default)]
        add_transaction: Value,
    },
    Message {
        #[serde(default, alias = "message", alias = "text")]
        content: String,
    },
}

/// Largest streamed body kept for structured-reply detection
const MAX_STRUCTURED_BODY: usize = 1 << 20;

/// Keep buffering only while the body can still be a JSON object
fn buffer_object(raw: Option<Vec<u8>>, bytes: &[u8]) -> Option<Vec<u8>> {
    let mut raw = raw?;
    raw.extend_from_slice(bytes);
    match raw.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | None if raw.len() <= MAX_STRUCTURED_BODY => Some(raw),
        _ => None,
    }
}

/// Digits and letters together read as an attempted transaction
pub fn looks_like_transaction(text: &str) -> bool {
    text.chars().any(char::is_numeric) && text.chars().any(char::is_alphabetic)
}

pub struct Session<E> {
    config: SessionConfig,
    extractor: E,
    phase: Phase,
    messages: Vec<ConversationMessage>,
    submissions: u64,
    message_seq: u64,
    cooldown_until: Option<DateTime<Utc>>,
}

impl<E: Extract> Session<E> {
    pub fn new(config: SessionConfig, extractor: E) -> Self {
        Self {
            config,
            extractor,
            phase: Phase::Idle,
            messages: Vec::new(),
            submissions: 0,
            message_seq: 0,
            cooldown_until: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// True while a submission is in flight (the "thinking" indicator)
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn current(&self) -> Option<SubmissionId> {
        self.phase.id()
    }

    /// The assistant message being streamed, if any
    pub fn pending(&self) -> Option<&ConversationMessage> {
        match &self.phase {
            Phase::Streaming { decoder, .. } => Some(decoder.message()),
            _ => None,
        }
    }

    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| (until - now).num_seconds().max(1) as u64)
    }

    pub fn handle(&mut self, event: Event, now: DateTime<Utc>) -> Vec<Effect> {
        match event {
            Event::Submit { text } => self.submit(text, now),
            Event::Abort => self.abort(),
            event => {
                let Some(id) = event.submission() else {
                    return Vec::new();
                };
                if self.phase.id() != Some(id) {
                    debug!(id, current = ?self.phase.id(), "stale event dropped");
                    return Vec::new();
                }
                self.advance(id, event, now)
            }
        }
    }

    fn submit(&mut self, text: String, now: DateTime<Utc>) -> Vec<Effect> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let Some(previous) = self.phase.id() {
            debug!(previous, "superseding in-flight submission");
            effects.push(Effect::Cancel(previous));
        }
        self.phase = Phase::Idle;

        self.submissions += 1;
        let id = self.submissions;
        let user_id = self.next_message_id();
        self.messages.push(ConversationMessage::user(user_id, text.clone()));

        if let Some(retry_after_secs) = self.cooldown_remaining(now) {
            info!(id, retry_after_secs, "submission during cooldown");
            self.push_notice(Notice::RateLimited { retry_after_secs });
            effects.push(Effect::Settled(id));
            return effects;
        }

        let today = local_date(now, self.config.timezone);
        let candidates = self
            .extractor
            .extract(&text, self.config.locale, today)
            .into_candidates();

        if candidates.is_empty() {
            debug!(id, "no local candidates, escalating to remote");
            effects.push(Effect::CallRemote {
                id,
                request: RemoteRequest {
                    user_id: self.config.user_id.clone(),
                    message: text.clone(),
                    tone: self.config.tone.clone(),
                    locale: self.config.locale.code().to_string(),
                },
            });
            self.phase = Phase::RemoteCall { id, input: text };
        } else {
            debug!(id, count = candidates.len(), "local candidates found");
            effects.push(Effect::CheckQuota {
                id,
                request_type: LOCAL_PARSE_REQUEST,
                prompt_chars: text.chars().count(),
            });
            self.phase = Phase::QuotaCheck {
                id,
                input: text,
                candidates,
            };
        }
        effects
    }

    fn abort(&mut self) -> Vec<Effect> {
        match std::mem::replace(&mut self.phase, Phase::Idle).id() {
            Some(id) => {
                debug!(id, "aborted by user");
                vec![Effect::Cancel(id), Effect::Settled(id)]
            }
            None => Vec::new(),
        }
    }

    fn advance(&mut self, id: SubmissionId, event: Event, now: DateTime<Utc>) -> Vec<Effect> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        match (phase, event) {
            (Phase::QuotaCheck { input, candidates, .. }, Event::QuotaChecked { verdict, .. }) => {
                match verdict {
                    QuotaVerdict::Allowed => {
                        self.phase = Phase::Enriching { id, input };
                        vec![Effect::Enrich { id, candidates }]
                    }
                    QuotaVerdict::Denied { retry_after_secs } => {
                        info!(id, "quota denied for local parse");
                        self.rate_limited(id, retry_after_secs, now)
                    }
                }
            }

            (Phase::Enriching { input, .. }, Event::Enriched { candidates, .. }) => {
                self.finish_with_proposals(id, "local", &input, candidates)
            }

            (Phase::RemoteCall { input, .. }, Event::Chunk { bytes, .. }) => {
                let mut decoder = StreamDecoder::new(self.next_message_id());
                decoder.feed(&bytes);
                let raw = buffer_object(Some(Vec::new()), &bytes);
                self.phase = Phase::Streaming { id, input, decoder, raw };
                Vec::new()
            }
            (Phase::Streaming { input, mut decoder, raw, .. }, Event::Chunk { bytes, .. }) => {
                decoder.feed(&bytes);
                let raw = buffer_object(raw, &bytes);
                self.phase = Phase::Streaming { id, input, decoder, raw };
                Vec::new()
            }

            (Phase::RemoteCall { .. }, Event::StreamEnded { .. }) => {
                let empty = ConversationMessage::assistant(self.next_message_id(), "");
                self.complete(id, empty)
            }
            (Phase::Streaming { input, decoder, raw, .. }, Event::StreamEnded { .. }) => {
                // A `{kind: ...}` reply sent without a JSON content type
                match raw.filter(|body| serde_json::from_slice::<StructuredReply>(body).is_ok()) {
                    Some(body) => self.structured(id, &input, &body),
                    None => self.complete(id, decoder.finish()),
                }
            }

            (
                Phase::RemoteCall { input, .. } | Phase::Streaming { input, .. },
                Event::JsonBody { body, .. },
            ) => self.structured(id, &input, &body),

            (
                Phase::RemoteCall { input, .. } | Phase::Streaming { input, .. },
                Event::HttpFailure { status, retry_after_secs, .. },
            ) => match status {
                429 | 401 | 403 => {
                    info!(id, status, "remote denied by quota or auth");
                    self.rate_limited(id, retry_after_secs, now)
                }
                _ => {
                    warn!(id, status, "remote call failed");
                    self.fallback(id, &input)
                }
            },

            (
                Phase::RemoteCall { input, .. } | Phase::Streaming { input, .. },
                Event::TransportFailed { error, .. },
            ) => {
                warn!(id, %error, "remote transport failure");
                self.fallback(id, &input)
            }

            (_, Event::TimedOut { .. }) => {
                warn!(id, "remote call timed out");
                self.finish_with_notice(id, Notice::TimedOut)
            }

            (phase, event) => {
                debug!(id, ?event, "event does not apply in current phase");
                self.phase = phase;
                Vec::new()
            }
        }
    }

    fn structured(&mut self, id: SubmissionId, input: &str, body: &[u8]) -> Vec<Effect> {
        match serde_json::from_slice::<StructuredReply>(body) {
            Ok(StructuredReply::Action { add_transaction }) => {
                let candidates = candidates_from_value(&add_transaction);
                if candidates.is_empty() {
                    warn!(id, "action reply without a valid transaction");
                    return self.fallback(id, input);
                }
                self.finish_with_proposals(id, "action", input, candidates)
            }
            Ok(StructuredReply::Message { content }) => {
                let msg = ConversationMessage::assistant(self.next_message_id(), content);
                self.complete(id, msg)
            }
            Err(e) if serde_json::from_slice::<Value>(body).is_ok() => {
                warn!(id, error = %e, "malformed structured reply");
                self.fallback(id, input)
            }
            Err(_) => {
                let mut decoder = StreamDecoder::new(self.next_message_id());
                decoder.feed(body);
                self.complete(id, decoder.finish())
            }
        }
    }

    fn finish_with_proposals(
        &mut self,
        id: SubmissionId,
        source: &str,
        input: &str,
        candidates: Vec<TransactionCandidate>,
    ) -> Vec<Effect> {
        if candidates.is_empty() {
            return self.fallback(id, input);
        }
        let mut msg = ConversationMessage::assistant(self.next_message_id(), "");
        let call = ToolCall {
            id: format!("{source}-{id}"),
            name: ToolName::ProposeTransaction,
            args: json!({ "message": input }),
        };
        let result = match serde_json::to_value(ParseOutcome::from_candidates(candidates)) {
            Ok(result) => result,
            Err(e) => {
                warn!(id, error = %e, "proposal result not serializable");
                return self.fallback(id, input);
            }
        };
        msg.tool_invocations.push_result(call, result);
        self.messages.push(msg);
        vec![Effect::Settled(id)]
    }

    /// Append a finished remote message; blanks become the empty-response notice.
    fn complete(&mut self, id: SubmissionId, mut msg: ConversationMessage) -> Vec<Effect> {
        let dropped = msg.tool_invocations.discard_pending();
        if dropped > 0 {
            debug!(id, dropped, "unresolved tool calls discarded");
        }
        if msg.is_blank() {
            return self.finish_with_notice(id, Notice::EmptyResponse);
        }
        self.messages.push(msg);
        vec![Effect::Settled(id)]
    }

    fn rate_limited(
        &mut self,
        id: SubmissionId,
        retry_after_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        let secs = retry_after_secs
            .unwrap_or(self.config.default_cooldown_secs)
            .min(MAX_RETRY_AFTER_SECS);
        self.cooldown_until = Duration::try_seconds(secs as i64).and_then(|d| now.checked_add_signed(d));
        self.finish_with_notice(id, Notice::RateLimited { retry_after_secs: secs })
    }

    fn fallback(&mut self, id: SubmissionId, input: &str) -> Vec<Effect> {
        let notice = if looks_like_transaction(input) {
            Notice::TransactionUnavailable
        } else {
            Notice::ChatUnavailable
        };
        self.finish_with_notice(id, notice)
    }

    fn finish_with_notice(&mut self, id: SubmissionId, notice: Notice) -> Vec<Effect> {
        self.push_notice(notice);
        vec![Effect::Settled(id)]
    }

    fn push_notice(&mut self, notice: Notice) {
        let text = self.config.locale.notice(notice);
        let msg = ConversationMessage::assistant(self.next_message_id(), text);
        self.messages.push(msg);
    }

    fn next_message_id(&mut self) -> String {
        self.message_seq += 1;
        format!("msg-{}", self.message_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::TxnType;
    use crate::message::Role;
    use chrono::TimeZone;

    /// Treats any text ending in a number as "<title> <amount>"
    struct TrailingNumber;

    impl Extract for TrailingNumber {
        fn extract(&self, text: &str, _locale: Locale, today: NaiveDate) -> ParseOutcome {
            let Some((title, amount)) = text.rsplit_once(' ') else {
                return ParseOutcome::no_match();
            };
            match amount.parse::<f64>() {
                Ok(a) => ParseOutcome::from_candidates(
                    TransactionCandidate::new(title, a, TxnType::Expense, today)
                        .into_iter()
                        .collect(),
                ),
                Err(_) => ParseOutcome::no_match(),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap()
    }

    fn session() -> Session<TrailingNumber> {
        Session::new(
            SessionConfig {
                user_id: "u1".into(),
                locale: Locale::En,
                tone: "friendly".into(),
                timezone: chrono_tz::UTC,
                default_cooldown_secs: 60,
            },
            TrailingNumber,
        )
    }

    fn submit(s: &mut Session<TrailingNumber>, text: &str) -> Vec<Effect> {
        s.handle(Event::Submit { text: text.into() }, now())
    }

    fn last(s: &Session<TrailingNumber>) -> &ConversationMessage {
        s.messages().last().unwrap()
    }

    #[test]
    fn test_local_path_never_calls_remote() {
        let mut s = session();
        let effects = submit(&mut s, "gas 500");
        let candidates = match effects.as_slice() {
            [Effect::CheckQuota { id: 1, request_type, prompt_chars: 7 }] => {
                assert_eq!(*request_type, LOCAL_PARSE_REQUEST);
                match &s.phase {
                    Phase::QuotaCheck { candidates, .. } => candidates.clone(),
                    other => panic!("unexpected phase {other:?}"),
                }
            }
            other => panic!("unexpected effects {other:?}"),
        };

        let effects = s.handle(Event::QuotaChecked { id: 1, verdict: QuotaVerdict::Allowed }, now());
        assert_eq!(effects, vec![Effect::Enrich { id: 1, candidates: candidates.clone() }]);

        let effects = s.handle(Event::Enriched { id: 1, candidates }, now());
        assert_eq!(effects, vec![Effect::Settled(1)]);
        assert!(!s.is_busy());

        let reply = last(&s);
        assert_eq!(reply.role, Role::Assistant);
        let proposals = reply.proposals();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].amount(), 500.0);
    }

    #[test]
    fn test_quota_denial_shows_rate_limit_and_no_proposals() {
        let mut s = session();
        submit(&mut s, "gas 500");
        let effects = s.handle(
            Event::QuotaChecked { id: 1, verdict: QuotaVerdict::Denied { retry_after_secs: Some(30) } },
            now(),
        );
        assert_eq!(effects, vec![Effect::Settled(1)]);
        assert!(last(&s).proposals().is_empty());
        assert!(last(&s).content.contains("30"));
        assert_eq!(s.cooldown_remaining(now()), Some(30));

        // During the cooldown nothing leaves the session
        let effects = submit(&mut s, "gas 20");
        assert_eq!(effects, vec![Effect::Settled(2)]);
        assert!(!s.is_busy());
        assert_eq!(s.messages().len(), 4);
    }

    #[test]
    fn test_no_candidates_escalates_to_remote() {
        let mut s = session();
        let effects = submit(&mut s, "let's talk about my week");
        assert_eq!(
            effects,
            vec![Effect::CallRemote {
                id: 1,
                request: RemoteRequest {
                    user_id: "u1".into(),
                    message: "let's talk about my week".into(),
                    tone: "friendly".into(),
                    locale: "en".into(),
                },
            }]
        );

        s.handle(Event::Chunk { id: 1, bytes: b"0:\"Sure, \"\n0:\"tell".to_vec() }, now());
        assert_eq!(s.pending().unwrap().content, "Sure, ");
        s.handle(Event::Chunk { id: 1, bytes: b" me\"\n".to_vec() }, now());
        let effects = s.handle(Event::StreamEnded { id: 1 }, now());
        assert_eq!(effects, vec![Effect::Settled(1)]);
        assert_eq!(last(&s).content, "Sure, tell me");
        assert!(!s.is_busy());
    }

    #[test]
    fn test_new_submission_supersedes_and_ignores_late_frames() {
        let mut s = session();
        submit(&mut s, "how am I doing");
        let effects = submit(&mut s, "what about savings");
        assert_eq!(effects[0], Effect::Cancel(1));
        assert!(matches!(effects[1], Effect::CallRemote { id: 2, .. }));
        assert_eq!(s.current(), Some(2));

        assert!(s.handle(Event::Chunk { id: 1, bytes: b"0:\"late\"\n".to_vec() }, now()).is_empty());
        assert!(s.handle(Event::StreamEnded { id: 1 }, now()).is_empty());
        assert!(s.is_busy());

        s.handle(Event::Chunk { id: 2, bytes: b"0:\"fresh\"\n".to_vec() }, now());
        s.handle(Event::StreamEnded { id: 2 }, now());
        let assistant: Vec<_> = s.messages().iter().filter(|m| m.role == Role::Assistant).collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].content, "fresh");
    }

    #[test]
    fn test_timeout_produces_message_abort_is_silent() {
        let mut s = session();
        submit(&mut s, "hello there");
        s.handle(Event::Chunk { id: 1, bytes: b"9:{\"toolCallId\":\"t\",\"toolName\":\"propose_transaction\",\"args\":{}}\n".to_vec() }, now());
        let effects = s.handle(Event::TimedOut { id: 1 }, now());
        assert_eq!(effects, vec![Effect::Settled(1)]);
        assert_eq!(last(&s).content, Locale::En.notice(Notice::TimedOut));
        assert!(last(&s).tool_invocations.is_empty());

        submit(&mut s, "hello again");
        let before = s.messages().len();
        let effects = s.handle(Event::Abort, now());
        assert_eq!(effects, vec![Effect::Cancel(2), Effect::Settled(2)]);
        assert_eq!(s.messages().len(), before);
        assert!(!s.is_busy());
        assert!(s.handle(Event::Abort, now()).is_empty());
    }

    #[test]
    fn test_quota_and_auth_statuses_rate_limit() {
        for status in [429u16, 401, 403] {
            let mut s = session();
            submit(&mut s, "hi");
            s.handle(Event::HttpFailure { id: 1, status, retry_after_secs: None }, now());
            assert_eq!(
                last(&s).content,
                Locale::En.notice(Notice::RateLimited { retry_after_secs: 60 })
            );
            assert!(!s.is_busy());
        }
    }

    #[test]
    fn test_generic_failure_wording_depends_on_input() {
        let mut s = session();
        submit(&mut s, "paid twelve for 2 coffees");
        s.handle(Event::HttpFailure { id: 1, status: 500, retry_after_secs: None }, now());
        assert_eq!(last(&s).content, Locale::En.notice(Notice::TransactionUnavailable));

        submit(&mut s, "how is my month going");
        s.handle(Event::TransportFailed { id: 2, error: "connection reset".into() }, now());
        assert_eq!(last(&s).content, Locale::En.notice(Notice::ChatUnavailable));
    }

    #[test]
    fn test_json_action_and_message_replies() {
        let mut s = session();
        submit(&mut s, "the usual rent");
        let body = br#"{"kind":"action","add_transaction":{"title":"Rent","amount":900,"date":"2026-05-01"}}"#;
        s.handle(Event::JsonBody { id: 1, body: body.to_vec() }, now());
        assert_eq!(last(&s).proposals()[0].title(), "Rent");

        submit(&mut s, "thanks");
        s.handle(Event::JsonBody { id: 2, body: br#"{"kind":"message","content":"Anytime!"}"#.to_vec() }, now());
        assert_eq!(last(&s).content, "Anytime!");

        submit(&mut s, "what");
        s.handle(Event::JsonBody { id: 3, body: br#"{"status":"weird"}"#.to_vec() }, now());
        assert_eq!(last(&s).content, Locale::En.notice(Notice::ChatUnavailable));
    }

    #[test]
    fn test_blank_stream_replaced_by_notice() {
        let mut s = session();
        submit(&mut s, "anything?");
        s.handle(
            Event::Chunk { id: 1, bytes: b"9:{\"toolCallId\":\"1\",\"toolName\":\"propose_transaction\",\"args\":{}}\n".to_vec() },
            now(),
        );
        s.handle(Event::StreamEnded { id: 1 }, now());
        assert_eq!(last(&s).content, Locale::En.notice(Notice::EmptyResponse));

        submit(&mut s, "and now?");
        s.handle(Event::StreamEnded { id: 2 }, now());
        assert_eq!(last(&s).content, Locale::En.notice(Notice::EmptyResponse));
    }

    #[test]
    fn test_structured_reply_recognised_in_plain_stream() {
        let mut s = session();
        submit(&mut s, "the usual rent");
        s.handle(Event::Chunk { id: 1, bytes: br#"{"kind":"action","add_"#.to_vec() }, now());
        s.handle(
            Event::Chunk { id: 1, bytes: br#"transaction":{"title":"Rent","amount":900}}"#.to_vec() },
            now(),
        );
        s.handle(Event::StreamEnded { id: 1 }, now());
        let proposals = last(&s).proposals();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].title(), "Rent");

        submit(&mut s, "thanks");
        s.handle(Event::Chunk { id: 2, bytes: b" {\"kind\":\"message\",\"content\":\"Anytime!\"}".to_vec() }, now());
        s.handle(Event::StreamEnded { id: 2 }, now());
        assert_eq!(last(&s).content, "Anytime!");

        // Framed text that merely starts with a brace stays text
        submit(&mut s, "and?");
        s.handle(Event::Chunk { id: 3, bytes: b"0:\"{ok}\"\n".to_vec() }, now());
        s.handle(Event::StreamEnded { id: 3 }, now());
        assert_eq!(last(&s).content, "{ok}");
        assert!(last(&s).proposals().is_empty());
    }

    #[test]
    fn test_oversized_retry_after_is_capped() {
        let mut s = session();
        submit(&mut s, "hi");
        s.handle(Event::HttpFailure { id: 1, status: 429, retry_after_secs: Some(u64::MAX) }, now());
        assert_eq!(s.cooldown_remaining(now()), Some(MAX_RETRY_AFTER_SECS));
        assert_eq!(
            last(&s).content,
            Locale::En.notice(Notice::RateLimited { retry_after_secs: MAX_RETRY_AFTER_SECS })
        );
        assert!(!s.is_busy());
    }

    #[test]
    fn test_looks_like_transaction() {
        assert!(looks_like_transaction("taxi 12"));
        assert!(!looks_like_transaction("hello"));
        assert!(!looks_like_transaction("12 34"));
    }
}
