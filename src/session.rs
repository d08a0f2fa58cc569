//! Session controller: owns the draft, the loading latch, the last error and
//! the conversation history, and drives one completion request at a time.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::events::Exchange;
use crate::history::HistoryStore;
use crate::llm::{CompletionClient, CompletionError};

/// The only failure text the user ever sees
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to get response. Please check your API key.";

/// Externally observable session flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pending_query: String,
    is_loading: bool,
    last_error: Option<String>,
}

impl SessionState {
    /// Draft text not yet submitted
    pub fn pending_query(&self) -> &str {
        &self.pending_query
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
impl SessionState {
    pub(crate) fn with_flags(is_loading: bool, last_error: Option<&str>) -> Self {
        Self {
            pending_query: String::new(),
            is_loading,
            last_error: last_error.map(str::to_string),
        }
    }
}

/// Why a submission was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty or whitespace-only input
    EmptyInput,
    /// A request is already in flight
    RequestInFlight,
}

/// Result of calling [`SessionController::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Ignored(Rejection),
}

/// How an in-flight request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Success,
    Failure,
}

/// Completion result sent back from the request task
#[derive(Debug)]
struct Settlement {
    request_id: Uuid,
    outcome: Result<String, CompletionError>,
}

#[derive(Debug)]
struct InFlight {
    request_id: Uuid,
    query: String,
    started_at: Instant,
}

/// Owns the conversation state for one session
pub struct SessionController {
    state: SessionState,
    history: HistoryStore,
    client: Arc<dyn CompletionClient>,
    in_flight: Option<InFlight>,
    settlement_tx: mpsc::UnboundedSender<Settlement>,
    settlement_rx: mpsc::UnboundedReceiver<Settlement>,
}

impl SessionController {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let (settlement_tx, settlement_rx) = mpsc::unbounded_channel();

        Self {
            state: SessionState::default(),
            history: HistoryStore::new(),
            client,
            in_flight: None,
            settlement_tx,
            settlement_rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Query of the request currently in flight, if any
    pub fn in_flight_query(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|request| request.query.as_str())
    }

    /// Replace the draft. Allowed while a request is in flight.
    pub fn set_pending_query(&mut self, text: impl Into<String>) {
        self.state.pending_query = text.into();
    }

    /// Submit `raw_text` to the completion client.
    ///
    /// Blank input and submissions made while a request is in flight are
    /// ignored without touching any state. Must be called from within a
    /// tokio runtime; the request runs on a spawned task and its result is
    /// applied by [`poll_settlements`](Self::poll_settlements) or
    /// [`settle_next`](Self::settle_next).
    pub fn submit(&mut self, raw_text: &str) -> SubmitOutcome {
        let prompt = raw_text.trim();
        if prompt.is_empty() {
            debug!("Ignoring blank submission");
            return SubmitOutcome::Ignored(Rejection::EmptyInput);
        }

        if let Some(request) = &self.in_flight {
            debug!(request_id = %request.request_id, "Ignoring submission while a request is in flight");
            return SubmitOutcome::Ignored(Rejection::RequestInFlight);
        }

        let request_id = Uuid::new_v4();
        self.state.is_loading = true;
        self.state.last_error = None;
        self.in_flight = Some(InFlight {
            request_id,
            query: raw_text.to_string(),
            started_at: Instant::now(),
        });

        info!(%request_id, prompt_chars = prompt.chars().count(), "Submitting query");

        let client = Arc::clone(&self.client);
        let prompt = prompt.to_string();
        let tx = self.settlement_tx.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(client.complete(&prompt))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(CompletionError::TaskFailed(panic_message(&*panic))));
            // The receiver lives in the controller; if it is gone the session is over.
            let _ = tx.send(Settlement {
                request_id,
                outcome,
            });
        });

        SubmitOutcome::Accepted
    }

    /// Apply every settlement that has already arrived. Never blocks.
    pub fn poll_settlements(&mut self) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Ok(settlement) = self.settlement_rx.try_recv() {
            if let Some(result) = self.apply(settlement) {
                settled.push(result);
            }
        }
        settled
    }

    /// Wait for the in-flight request to settle and apply it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn settle_next(&mut self) -> Option<Settled> {
        while self.in_flight.is_some() {
            let settlement = self.settlement_rx.recv().await?;
            if let Some(result) = self.apply(settlement) {
                return Some(result);
            }
        }
        None
    }

    fn apply(&mut self, settlement: Settlement) -> Option<Settled> {
        let request = match self.in_flight.take() {
            Some(request) if request.request_id == settlement.request_id => request,
            other => {
                warn!(request_id = %settlement.request_id, "Discarding settlement for unknown request");
                self.in_flight = other;
                return None;
            }
        };

        let elapsed_ms = u64::try_from(request.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = settlement.outcome.and_then(|text| {
            if text.trim().is_empty() {
                Err(CompletionError::EmptyResponse)
            } else {
                Ok(text)
            }
        });

        self.state.is_loading = false;

        match outcome {
            Ok(text) => {
                info!(request_id = %request.request_id, elapsed_ms, response_chars = text.chars().count(), "Query settled");
                self.history.append(Exchange::new(request.query, text));
                self.state.pending_query.clear();
                Some(Settled::Success)
            }
            Err(err) => {
                error!(request_id = %request.request_id, elapsed_ms, error = %err, "Query failed");
                self.state.last_error = Some(UPSTREAM_FAILURE_MESSAGE.to_string());
                Some(Settled::Failure)
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic in completion client".to_string())
}
