//! Tokio driver for `tally_core::Session`.
//!
//! The session decides, this module does the I/O. Each effect that needs the
//! network runs in a spawned task owning a `CancellationToken`; results come
//! back as `Event`s over an unbounded channel and are applied in arrival order.
//! At most one task is in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tally_core::{Effect, Event, Extract, QuotaVerdict, RemoteRequest, Session, SubmissionId};
use tally_finance::Enricher;

use crate::llm::{RemoteClient, RemoteReply};
use crate::llm_stream;
use crate::quota::QuotaClient;

struct InFlight {
    id: SubmissionId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Orchestrator<E> {
    session: Session<E>,
    remote: Arc<RemoteClient>,
    quota: Arc<QuotaClient>,
    enricher: Arc<Enricher>,
    timeout: Duration,
    events: UnboundedSender<Event>,
    in_flight: Option<InFlight>,
}

impl<E: Extract> Orchestrator<E> {
    pub fn new(
        session: Session<E>,
        remote: Arc<RemoteClient>,
        quota: Arc<QuotaClient>,
        enricher: Arc<Enricher>,
        timeout: Duration,
    ) -> (Self, UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            session,
            remote,
            quota,
            enricher,
            timeout,
            events,
            in_flight: None,
        };
        (orchestrator, rx)
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn enricher(&self) -> &Arc<Enricher> {
        &self.enricher
    }

    pub fn submit(&mut self, text: impl Into<String>) {
        self.apply(Event::Submit { text: text.into() });
    }

    /// User-initiated stop. Produces no message.
    pub fn stop(&mut self) {
        self.apply(Event::Abort);
    }

    pub fn apply(&mut self, event: Event) {
        for effect in self.session.handle(event, Utc::now()) {
            self.run(effect);
        }
    }

    /// Apply events until the session is idle again.
    pub async fn settle(&mut self, rx: &mut UnboundedReceiver<Event>) {
        while self.session.is_busy() {
            match rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Cancel(id) => {
                if self.in_flight.as_ref().is_some_and(|f| f.id == id) {
                    if let Some(old) = self.in_flight.take() {
                        debug!(id, "cancelling in-flight task");
                        old.token.cancel();
                    }
                }
            }
            Effect::Settled(id) => {
                if self.in_flight.as_ref().is_some_and(|f| f.id == id) {
                    self.in_flight = None;
                }
            }
            Effect::CheckQuota {
                id,
                request_type,
                prompt_chars,
            } => {
                let quota = Arc::clone(&self.quota);
                let tx = self.events.clone();
                let timeout = self.timeout;
                self.spawn(id, async move {
                    let check = quota.check(request_type, prompt_chars);
                    // Same fail-open policy as an unreachable quota service
                    let verdict = tokio::time::timeout(timeout, check).await.unwrap_or_else(|_| {
                        warn!(id, "quota check timed out, allowing");
                        QuotaVerdict::Allowed
                    });
                    let _ = tx.send(Event::QuotaChecked { id, verdict });
                });
            }
            Effect::Enrich { id, candidates } => {
                let enricher = Arc::clone(&self.enricher);
                let tx = self.events.clone();
                self.spawn(id, async move {
                    let candidates = enricher.enrich(candidates).await;
                    let _ = tx.send(Event::Enriched { id, candidates });
                });
            }
            Effect::CallRemote { id, request } => {
                let remote = Arc::clone(&self.remote);
                let tx = self.events.clone();
                let timeout = self.timeout;
                self.spawn(id, call_remote(remote, request, id, timeout, tx));
            }
        }
    }

    fn spawn<F>(&mut self, id: SubmissionId, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => debug!(id, "task cancelled"),
                _ = work => {}
            }
        });
        // Replace first, then cancel what was there
        if let Some(old) = self.in_flight.replace(InFlight { id, token, handle }) {
            old.token.cancel();
        }
    }
}

impl<E> Drop for Orchestrator<E> {
    fn drop(&mut self) {
        if let Some(f) = self.in_flight.take() {
            f.token.cancel();
            f.handle.abort();
        }
    }
}

async fn call_remote(
    remote: Arc<RemoteClient>,
    request: RemoteRequest,
    id: SubmissionId,
    timeout: Duration,
    tx: UnboundedSender<Event>,
) {
    let work = async {
        match remote.send(&request).await? {
            RemoteReply::Failed {
                status,
                retry_after_secs,
            } => {
                let _ = tx.send(Event::HttpFailure {
                    id,
                    status,
                    retry_after_secs,
                });
            }
            RemoteReply::Json(body) => {
                let _ = tx.send(Event::JsonBody { id, body });
            }
            RemoteReply::Stream(resp) => llm_stream::pump(resp, id, &tx).await?,
        }
        Ok::<_, anyhow::Error>(())
    };

    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = tx.send(Event::TransportFailed {
                id,
                error: format!("{e:#}"),
            });
        }
        Err(_) => {
            let _ = tx.send(Event::TimedOut { id });
        }
    }
}
