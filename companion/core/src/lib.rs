//! Companion Core - Conversational Engine for chatpet
//!
//! This crate holds everything between a pet-care app's screens and an
//! on-device language model: the day's conversation memory, prompt
//! assembly, the model handle lifecycle, and a single-flight request gate
//! that keeps inference off the interactive thread.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Host Screens                            │
//! │      chat view            journal view         settings      │
//! │          │                     │                             │
//! │   submit_chat()         submit_journal()     subscribe()     │
//! └──────────┼─────────────────────┼──────────────────▲──────────┘
//!            │                     │                  │ RequestState
//! ┌──────────┼─────────────────────┼──────────────────┼──────────┐
//! │          ▼    COMPANION CORE   ▼                  │          │
//! │  ┌────────────────────────────────────────────────┴───────┐  │
//! │  │                 RequestOrchestrator                     │  │
//! │  │   gate (Idle/Loading/Success/Error) + observer fanout   │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              │ one job at a time             │
//! │  ┌───────────────────────────▼────────────────────────────┐  │
//! │  │                   worker thread                         │  │
//! │  │  ConversationHistory → PromptBuilder → InferenceSession │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              ▼                               │
//! │                    ModelLoader / ModelHandle                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`RequestOrchestrator`]: Accepts requests and publishes their outcome
//! - [`RequestState`]: The observable result of the latest request
//! - [`ConversationHistory`]: Today's bounded conversation memory
//! - [`InferenceSession`]: Lazily-built, reusable model handle
//! - [`ModelLoader`]: The seam a model runtime plugs into
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use companion_core::{load_config, RequestOrchestrator};
//!
//! let config = load_config()?;
//! let orchestrator = RequestOrchestrator::builder(Arc::new(MyRuntime::new()))
//!     .config(&config)
//!     .spawn()?;
//!
//! let mut states = orchestrator.subscribe();
//! orchestrator.submit_chat(&config.request_config("alice"), "You are a cat.", "hi");
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Model runtime abstraction
//! - [`clock`]: Wall-clock source, replaceable in tests
//! - [`config`]: TOML and environment configuration
//! - [`error`]: Error types
//! - [`history`]: Conversation history with daily reset
//! - [`logging`]: Subscriber setup for hosts
//! - [`orchestrator`]: Request gate and worker
//! - [`prompt`]: Chat, journal, and persona prompt templates
//! - [`session`]: Model handle lifecycle
//! - [`state`]: Request state and observer fanout

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod state;

pub use backend::{ModelHandle, ModelLoader, ModelOptions, DEFAULT_MAX_TOP_K};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CompanionError;
pub use history::{ConversationHistory, Turn, TurnRole, DEFAULT_MAX_TURNS};
pub use orchestrator::{
    ChatRequest, JournalRequest, OrchestratorBuilder, Request, RequestConfig, RequestId,
    RequestKind, RequestOrchestrator, ResultSink, Submission,
};
pub use prompt::{
    build_chat_prompt, build_journal_prompt, persona_prompt, JournalStats, LifeStage, PetKind,
    PromptContext,
};
pub use session::InferenceSession;
pub use state::{RequestState, StateBroadcaster, StateReceiver};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, CompanionConfig, CompanionToml,
    ConfigError, ConfigSource,
};
