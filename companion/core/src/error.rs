//! Error Types
//!
//! Failures the core can run into. None of these cross the observable
//! boundary as errors: the orchestrator turns every one of them into a
//! [`RequestState::Error`](crate::state::RequestState::Error) message, or,
//! for release failures, a log line.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the companion core
#[derive(Debug, Error)]
pub enum CompanionError {
    /// The user message was empty or only whitespace
    #[error("message is empty")]
    EmptyInput,

    /// The model handle could not be constructed
    #[error("failed to load model from {model_path}: {source}")]
    SessionInit {
        /// Path the load was attempted from
        model_path: String,
        /// Error reported by the model runtime
        #[source]
        source: anyhow::Error,
    },

    /// The request named no model file
    #[error("no model path configured")]
    NoModelPath,

    /// `infer` was called with no handle loaded
    #[error("no model is loaded")]
    NotReady,

    /// The model failed while generating
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    /// The model runtime panicked while loading or generating
    #[error("model runtime panicked: {0}")]
    Panicked(String),

    /// Closing the model handle failed
    #[error("failed to release model handle: {0}")]
    Release(#[source] anyhow::Error),

    /// The inference worker thread could not be started
    #[error("failed to start inference worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}
