//! Request State
//!
//! The observable result of the orchestrator: one [`RequestState`] value is
//! live at a time, and every change is pushed to each subscribed observer.
//!
//! # Delivery
//!
//! Observers receive the current state on subscription, then every later
//! transition in the order it happened. Channels are unbounded, so a slow
//! observer never causes a transition to be skipped. Observers whose
//! receiver was dropped are pruned on the next publish.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// State of the current (or last) request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum RequestState {
    /// Nothing has been requested yet
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The last request produced text
    Success(String),
    /// The last request failed
    Error(String),
}

impl RequestState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Loading => "Thinking...",
            Self::Success(_) => "Done",
            Self::Error(_) => "Something went wrong",
        }
    }

    /// Whether a request is outstanding
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether this state ends a request
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Result text, if successful
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success(text) => Some(text),
            _ => None,
        }
    }

    /// Error message, if failed
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Receiving end of a state subscription
pub type StateReceiver = mpsc::UnboundedReceiver<RequestState>;

struct Inner {
    current: RequestState,
    observers: Vec<mpsc::UnboundedSender<RequestState>>,
}

/// Holds the live state and fans transitions out to observers
///
/// All reads and writes go through one lock, so the order observers see
/// matches the order transitions were made, even across threads.
pub struct StateBroadcaster {
    inner: Mutex<Inner>,
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBroadcaster {
    /// Start in [`RequestState::Idle`] with no observers
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: RequestState::Idle,
                observers: Vec::new(),
            }),
        }
    }

    /// Current state
    #[must_use]
    pub fn current(&self) -> RequestState {
        self.inner.lock().current.clone()
    }

    /// Register an observer; it first receives the current state
    #[must_use]
    pub fn subscribe(&self) -> StateReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // Cannot fail: we hold the receiver
        let _ = tx.send(inner.current.clone());
        inner.observers.push(tx);
        rx
    }

    /// Replace the state and notify observers
    pub fn publish(&self, state: RequestState) {
        let mut inner = self.inner.lock();
        Self::publish_locked(&mut inner, state);
    }

    /// Move to [`RequestState::Loading`] unless already there
    ///
    /// Returns `false` (and changes nothing) if a request is in flight. The
    /// check and the transition happen under one lock, so two callers can
    /// never both succeed.
    pub fn try_begin(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.current.is_loading() {
            return false;
        }
        Self::publish_locked(&mut inner, RequestState::Loading);
        true
    }

    /// Number of live observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.observers.retain(|tx| !tx.is_closed());
        inner.observers.len()
    }

    fn publish_locked(inner: &mut Inner, state: RequestState) {
        tracing::trace!(state = ?state, "Publishing request state");
        inner.current = state;
        let current = &inner.current;
        inner.observers.retain(|tx| tx.send(current.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut StateReceiver) -> Vec<RequestState> {
        let mut out = Vec::new();
        while let Ok(state) = rx.try_recv() {
            out.push(state);
        }
        out
    }

    #[test]
    fn test_subscribe_receives_current_state() {
        let states = StateBroadcaster::new();
        states.publish(RequestState::Success("meow".to_string()));

        let mut rx = states.subscribe();
        assert_eq!(drain(&mut rx), vec![RequestState::Success("meow".to_string())]);
    }

    #[test]
    fn test_transitions_delivered_in_order_to_all() {
        let states = StateBroadcaster::new();
        let mut a = states.subscribe();
        let mut b = states.subscribe();

        assert!(states.try_begin());
        states.publish(RequestState::Error("boom".to_string()));
        assert!(states.try_begin());
        states.publish(RequestState::Success("ok".to_string()));

        let expected = vec![
            RequestState::Idle,
            RequestState::Loading,
            RequestState::Error("boom".to_string()),
            RequestState::Loading,
            RequestState::Success("ok".to_string()),
        ];
        assert_eq!(drain(&mut a), expected);
        assert_eq!(drain(&mut b), expected);
    }

    #[test]
    fn test_try_begin_rejects_while_loading() {
        let states = StateBroadcaster::new();
        let mut rx = states.subscribe();

        assert!(states.try_begin());
        assert!(!states.try_begin());
        assert_eq!(states.current(), RequestState::Loading);

        // The rejected attempt published nothing
        assert_eq!(drain(&mut rx), vec![RequestState::Idle, RequestState::Loading]);
    }

    #[test]
    fn test_dropped_observers_are_pruned() {
        let states = StateBroadcaster::new();
        let kept = states.subscribe();
        let dropped = states.subscribe();
        assert_eq!(states.observer_count(), 2);

        drop(dropped);
        states.publish(RequestState::Loading);
        assert_eq!(states.observer_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_state_accessors() {
        let ok = RequestState::Success("meow".to_string());
        assert_eq!(ok.text(), Some("meow"));
        assert!(ok.is_terminal());
        assert!(!ok.is_loading());

        let err = RequestState::Error("no model".to_string());
        assert_eq!(err.error_message(), Some("no model"));
        assert_eq!(err.text(), None);
        assert_eq!(RequestState::Loading.description(), "Thinking...");
        assert_eq!(RequestState::default(), RequestState::Idle);
    }

    #[test]
    fn test_state_serialization_shape() {
        let json = serde_json::to_string(&RequestState::Success("meow".to_string())).unwrap();
        assert_eq!(json, r#"{"state":"success","payload":"meow"}"#);

        let idle: RequestState = serde_json::from_str(r#"{"state":"idle"}"#).unwrap();
        assert_eq!(idle, RequestState::Idle);
    }
}
