//! Request Orchestrator
//!
//! The single-flight gate in front of the model. It accepts chat and journal
//! requests from the interactive side, runs them one at a time on a
//! dedicated worker thread, and publishes the outcome as a
//! [`RequestState`].
//!
//! # Lifecycle of a request
//!
//! ```text
//!  submit() ──► Loading ──► worker: rollover → prompt → ensure_ready → infer
//!                                │
//!                     ┌──────────┴──────────┐
//!                     ▼                     ▼
//!              record turns            (nothing recorded)
//!              Success(text)            Error(message)
//!              persist (optional)
//! ```
//!
//! # Design Philosophy
//!
//! The worker thread owns the [`InferenceSession`]; nothing else can touch
//! the handle. Admission is decided under the state lock, so while one
//! request is `Loading` every other submission is dropped rather than
//! queued. Chat and journal share the gate, and therefore the handle.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Local};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn};

use crate::backend::ModelLoader;
use crate::clock::{Clock, SystemClock};
use crate::config::CompanionConfig;
use crate::error::CompanionError;
use crate::history::{ConversationHistory, Turn, TurnRole};
use crate::prompt::{build_chat_prompt, build_journal_prompt, JournalStats};
use crate::session::InferenceSession;
use crate::state::{RequestState, StateBroadcaster, StateReceiver};

// =============================================================================
// Requests
// =============================================================================

/// Request identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new unique request ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which feature a request comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A chat message
    Chat,
    /// A diary entry
    Journal,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Journal => write!(f, "journal"),
        }
    }
}

/// Per-user request settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Key of the user the result belongs to
    pub identity: String,
    /// Model file to run; requests without one fail on the worker
    pub model_path: Option<String>,
}

impl RequestConfig {
    /// Settings for `identity` running the model at `model_path`
    pub fn new(identity: impl Into<String>, model_path: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            model_path: Some(model_path.into()),
        }
    }
}

/// A chat message to answer in persona
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// User and model settings
    pub config: RequestConfig,
    /// Persona instructions
    pub base_prompt: String,
    /// What the user said
    pub message: String,
}

impl ChatRequest {
    /// Check the message is worth sending to the model
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError::EmptyInput`] if the message is blank.
    pub fn validate(&self) -> Result<(), CompanionError> {
        if self.message.trim().is_empty() {
            return Err(CompanionError::EmptyInput);
        }
        Ok(())
    }
}

/// A diary entry to write
#[derive(Clone, Debug)]
pub struct JournalRequest {
    /// User and model settings
    pub config: RequestConfig,
    /// The pet's day
    pub stats: JournalStats,
    /// Last entry's text; never `Some("")`
    pub previous_entry: Option<String>,
}

impl JournalRequest {
    /// Build a journal request, treating a blank previous entry as none
    #[must_use]
    pub fn new(config: RequestConfig, stats: JournalStats, previous_entry: Option<String>) -> Self {
        Self {
            config,
            stats,
            previous_entry: previous_entry.filter(|text| !text.trim().is_empty()),
        }
    }
}

/// Work accepted by the orchestrator
#[derive(Clone, Debug)]
pub enum Request {
    /// Chat message
    Chat(ChatRequest),
    /// Journal entry
    Journal(JournalRequest),
}

impl Request {
    /// Feature this request belongs to
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Chat(_) => RequestKind::Chat,
            Self::Journal(_) => RequestKind::Journal,
        }
    }

    /// User and model settings
    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        match self {
            Self::Chat(r) => &r.config,
            Self::Journal(r) => &r.config,
        }
    }
}

/// What happened to a submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Queued on the worker
    Accepted(RequestId),
    /// Dropped because another request is in flight
    Busy,
    /// Answered immediately without the model (empty message)
    Answered(String),
    /// Dropped because the orchestrator was torn down
    Closed,
}

/// Durable storage for completed results
///
/// Called on the worker thread after `Success` has been published. Errors are
/// logged and do not change the published state.
pub trait ResultSink: Send + Sync {
    /// Store `text` produced for `identity` at `at`
    fn persist(
        &self,
        identity: &str,
        kind: RequestKind,
        text: &str,
        at: DateTime<Local>,
    ) -> anyhow::Result<()>;
}

// =============================================================================
// Orchestrator
// =============================================================================

/// State shared between the interactive side and the worker
struct Shared {
    states: StateBroadcaster,
    history: RwLock<ConversationHistory>,
    clock: Arc<dyn Clock>,
}

struct Job {
    id: RequestId,
    request: Request,
}

/// Builder for [`RequestOrchestrator`]
pub struct OrchestratorBuilder {
    loader: Arc<dyn ModelLoader>,
    config: CompanionConfig,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl OrchestratorBuilder {
    /// Use `config` instead of defaults
    #[must_use]
    pub fn config(mut self, config: &CompanionConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Use `clock` instead of the system clock
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist successful results through `sink`
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start the worker thread
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError::WorkerSpawn`] if the thread cannot be created.
    pub fn spawn(self) -> Result<RequestOrchestrator, CompanionError> {
        let shared = Arc::new(Shared {
            states: StateBroadcaster::new(),
            history: RwLock::new(ConversationHistory::with_max_turns(
                self.clock.clone(),
                self.config.max_turns,
            )),
            clock: self.clock,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            shared: shared.clone(),
            session: InferenceSession::new(self.loader, self.config.model.clone()),
            sink: self.sink,
        };
        let handle = std::thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || worker.run(rx))?;

        info!(
            thread = %self.config.worker_thread_name,
            max_turns = self.config.max_turns,
            "Request orchestrator started"
        );

        Ok(RequestOrchestrator {
            shared,
            jobs: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            empty_input_reply: self.config.empty_input_reply,
        })
    }
}

/// Single-flight front end for the model
///
/// Construct once per host application and hand it to every screen that
/// needs the model; dropping it (or calling [`Self::teardown`]) waits for
/// the in-flight request and releases the handle.
pub struct RequestOrchestrator {
    shared: Arc<Shared>,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    empty_input_reply: String,
}

impl RequestOrchestrator {
    /// Start configuring an orchestrator around `loader`
    pub fn builder(loader: Arc<dyn ModelLoader>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            loader,
            config: CompanionConfig::default(),
            clock: Arc::new(SystemClock),
            sink: None,
        }
    }

    /// Submit a request
    ///
    /// Never blocks on the model. Returns [`Submission::Busy`] without side
    /// effects while another request is `Loading`. Empty chat messages are
    /// answered with the canned reply and never reach the model or history.
    pub fn submit(&self, request: Request) -> Submission {
        // Held for the whole admission so teardown cannot interleave
        let jobs = self.jobs.lock();
        let Some(tx) = jobs.as_ref() else {
            debug!(kind = %request.kind(), "Orchestrator closed, request ignored");
            return Submission::Closed;
        };

        if let Request::Chat(chat) = &request {
            if chat.validate().is_err() {
                if self.shared.states.current().is_loading() {
                    debug!("Already loading, request ignored");
                    return Submission::Busy;
                }
                debug!("Empty message, answering without the model");
                let reply = self.empty_input_reply.clone();
                self.shared
                    .states
                    .publish(RequestState::Success(reply.clone()));
                return Submission::Answered(reply);
            }
        }

        if !self.shared.states.try_begin() {
            debug!(kind = %request.kind(), "Already loading, request ignored");
            return Submission::Busy;
        }

        let id = RequestId::new();
        info!(id = %id, kind = %request.kind(), identity = %request.config().identity, "Request accepted");

        if tx
            .send(Job {
                id: id.clone(),
                request,
            })
            .is_err()
        {
            error!(id = %id, "Inference worker is gone");
            self.shared
                .states
                .publish(RequestState::Error("inference worker stopped".to_string()));
            return Submission::Closed;
        }

        Submission::Accepted(id)
    }

    /// Submit a chat message
    pub fn submit_chat(
        &self,
        config: &RequestConfig,
        base_prompt: impl Into<String>,
        message: impl Into<String>,
    ) -> Submission {
        self.submit(Request::Chat(ChatRequest {
            config: config.clone(),
            base_prompt: base_prompt.into(),
            message: message.into(),
        }))
    }

    /// Submit a journal entry request
    pub fn submit_journal(
        &self,
        config: &RequestConfig,
        stats: JournalStats,
        previous_entry: Option<String>,
    ) -> Submission {
        self.submit(Request::Journal(JournalRequest::new(
            config.clone(),
            stats,
            previous_entry,
        )))
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.shared.states.current()
    }

    /// Observe state changes, starting with the current state
    #[must_use]
    pub fn subscribe(&self) -> StateReceiver {
        self.shared.states.subscribe()
    }

    /// Today's turns, oldest first
    ///
    /// Empty if the stored turns belong to an earlier day. Does not modify
    /// the history; the worker clears stale turns on its next request.
    #[must_use]
    pub fn history_snapshot(&self) -> Vec<Turn> {
        let history = self.shared.history.read();
        if history.day_stamp() != self.shared.clock.today() {
            return Vec::new();
        }
        history.snapshot()
    }

    /// Forget today's conversation
    pub fn clear_history(&self) {
        self.shared.history.write().clear();
    }

    /// Whether [`Self::teardown`] has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Stop accepting work, wait for the in-flight request, release the model
    ///
    /// Idempotent. Blocks the caller until the worker has exited.
    pub fn teardown(&self) {
        let sender = self.jobs.lock().take();
        if sender.is_none() {
            return;
        }
        // Closing the channel lets the worker exit after its current job
        drop(sender);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Inference worker panicked");
            }
        }
        info!("Request orchestrator torn down");
    }
}

impl Drop for RequestOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Runs on the dedicated thread; sole owner of the session
struct Worker {
    shared: Arc<Shared>,
    session: InferenceSession,
    sink: Option<Arc<dyn ResultSink>>,
}

impl Worker {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Job>) {
        debug!("Inference worker running");
        while let Some(job) = rx.blocking_recv() {
            self.handle(job);
        }
        self.session.release();
        debug!("Inference worker stopped");
    }

    fn handle(&mut self, job: Job) {
        let kind = job.request.kind();
        let span = info_span!("request", id = %job.id, kind = %kind);
        let _enter = span.enter();

        let identity = job.request.config().identity.clone();
        let outcome = match catch_unwind(AssertUnwindSafe(|| match &job.request {
            Request::Chat(chat) => self.run_chat(chat),
            Request::Journal(journal) => self.run_journal(journal),
        })) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Model runtime panicked, discarding handle");
                // A handle that panicked cannot be trusted; close may panic too
                let _ = catch_unwind(AssertUnwindSafe(|| self.session.release()));
                Err(CompanionError::Panicked(message))
            }
        };

        match outcome {
            Ok(text) => {
                info!(response_len = text.len(), "Request succeeded");
                self.shared
                    .states
                    .publish(RequestState::Success(text.clone()));
                self.persist(&identity, kind, &text);
            }
            Err(e) => {
                error!(error = %e, "Request failed");
                self.shared.states.publish(RequestState::Error(e.to_string()));
            }
        }
    }

    fn run_chat(&mut self, chat: &ChatRequest) -> Result<String, CompanionError> {
        let prompt = {
            let mut history = self.shared.history.write();
            history.rollover_if_new_day();
            build_chat_prompt(&chat.base_prompt, &history, &chat.message)
        };
        debug!(prompt_len = prompt.len(), "Chat prompt built");

        let text = self.run_model(&chat.config, &prompt)?;

        let mut history = self.shared.history.write();
        history.rollover_if_new_day();
        history.record_turn(TurnRole::User, chat.message.clone());
        history.record_turn(TurnRole::Assistant, text.clone());
        debug!(turns = history.len(), "Exchange recorded");

        Ok(text)
    }

    fn run_journal(&mut self, journal: &JournalRequest) -> Result<String, CompanionError> {
        let prompt = build_journal_prompt(&journal.stats, journal.previous_entry.as_deref());
        debug!(prompt_len = prompt.len(), "Journal prompt built");
        self.run_model(&journal.config, &prompt)
    }

    fn run_model(&mut self, config: &RequestConfig, prompt: &str) -> Result<String, CompanionError> {
        let model_path = config
            .model_path
            .as_deref()
            .ok_or(CompanionError::NoModelPath)?;
        self.session.ensure_ready(model_path)?;
        self.session.infer(prompt)
    }

    fn persist(&self, identity: &str, kind: RequestKind, text: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        let at = self.shared.clock.now();
        match catch_unwind(AssertUnwindSafe(|| sink.persist(identity, kind, text, at))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(identity, error = %e, "Failed to persist result"),
            Err(payload) => warn!(
                identity,
                panic = %panic_message(payload.as_ref()),
                "Result sink panicked"
            ),
        }
    }
}

/// Best-effort text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}
