//! Shared fixtures for the orchestrator tests
//!
//! [`ScriptedLoader`] hands out handles whose `generate` blocks until the
//! test pushes a reply, so tests decide exactly when a request finishes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use companion_core::{
    ModelHandle, ModelLoader, ModelOptions, RequestKind, RequestState, ResultSink, StateReceiver,
};

/// What the next `generate` call returns
pub enum Reply {
    Text(String),
    Fail(String),
    Panic(String),
}

/// Observable record of everything the runtime was asked to do
#[derive(Default)]
pub struct RuntimeLog {
    pub events: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl RuntimeLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

pub struct ScriptedLoader {
    pub log: Arc<RuntimeLog>,
    replies: Arc<Mutex<std_mpsc::Receiver<Reply>>>,
    fail_load: Mutex<bool>,
}

/// Test-side controls for a [`ScriptedLoader`]
pub struct Script {
    pub log: Arc<RuntimeLog>,
    tx: std_mpsc::Sender<Reply>,
}

impl Script {
    // Sends are ignored once the worker has dropped the loader
    pub fn reply(&self, text: &str) {
        let _ = self.tx.send(Reply::Text(text.to_string()));
    }

    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Reply::Fail(message.to_string()));
    }

    pub fn crash(&self, message: &str) {
        let _ = self.tx.send(Reply::Panic(message.to_string()));
    }
}

impl ScriptedLoader {
    pub fn new() -> (Arc<Self>, Script) {
        let (tx, rx) = std_mpsc::channel();
        let log = Arc::new(RuntimeLog::default());
        let loader = Arc::new(Self {
            log: log.clone(),
            replies: Arc::new(Mutex::new(rx)),
            fail_load: Mutex::new(false),
        });
        (loader, Script { log, tx })
    }

    pub fn set_fail_load(&self, fail: bool) {
        *self.fail_load.lock() = fail;
    }
}

struct ScriptedHandle {
    path: String,
    log: Arc<RuntimeLog>,
    replies: Arc<Mutex<std_mpsc::Receiver<Reply>>>,
}

impl ModelHandle for ScriptedHandle {
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String> {
        let now = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.prompts.lock().push(prompt.to_string());
        self.log.events.lock().push(format!("generate {}", self.path));

        let reply = self.replies.lock().recv();
        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Ok(Reply::Text(text)) => Ok(text),
            Ok(Reply::Fail(message)) => Err(anyhow!(message)),
            Ok(Reply::Panic(message)) => panic!("{message}"),
            Err(_) => Err(anyhow!("script ended")),
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.log.events.lock().push(format!("close {}", self.path));
        Ok(())
    }
}

impl ModelLoader for ScriptedLoader {
    fn name(&self) -> &str {
        "scripted"
    }

    fn load(&self, model_path: &str, _options: &ModelOptions) -> anyhow::Result<Box<dyn ModelHandle>> {
        self.log.events.lock().push(format!("load {model_path}"));
        if *self.fail_load.lock() {
            anyhow::bail!("model file missing");
        }
        Ok(Box::new(ScriptedHandle {
            path: model_path.to_string(),
            log: self.log.clone(),
            replies: self.replies.clone(),
        }))
    }
}

/// A stored result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stored {
    pub identity: String,
    pub kind: RequestKind,
    pub text: String,
}

#[derive(Default)]
pub struct MemorySink {
    pub stored: Mutex<Vec<Stored>>,
    pub fail: bool,
}

impl ResultSink for MemorySink {
    fn persist(
        &self,
        identity: &str,
        kind: RequestKind,
        text: &str,
        _at: chrono::DateTime<chrono::Local>,
    ) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("disk full");
        }
        self.stored.lock().push(Stored {
            identity: identity.to_string(),
            kind,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Receive until the next terminal state
pub async fn next_terminal(rx: &mut StateReceiver) -> RequestState {
    loop {
        let state = rx.recv().await.expect("state channel closed");
        if state.is_terminal() {
            return state;
        }
    }
}

/// Receive until `Loading` is observed
pub async fn wait_loading(rx: &mut StateReceiver) {
    loop {
        let state = rx.recv().await.expect("state channel closed");
        if state.is_loading() {
            return;
        }
    }
}
