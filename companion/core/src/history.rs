//! Conversation History
//!
//! A bounded, day-scoped log of the turns exchanged between the user and
//! their pet. The orchestrator owns one of these and feeds it back into every
//! chat prompt so the pet remembers what was said earlier today.
//!
//! # Invariants
//!
//! - At most `max_turns` turns are held. Appending past the limit evicts the
//!   oldest turn first, regardless of role.
//! - Every held turn was recorded on `day_stamp`. Callers run
//!   [`ConversationHistory::rollover_if_new_day`] before reading or writing,
//!   which drops yesterday's turns the first time the date is seen to change.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Default number of turns kept (five user/assistant exchanges)
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// The person chatting with their pet
    User,
    /// The model speaking as the pet
    Assistant,
}

impl TurnRole {
    /// Label used when rendering transcripts
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who sent it
    pub role: TurnRole,
    /// Message text
    pub text: String,
    /// Local time of day it was recorded
    pub occurred_at: NaiveTime,
}

/// Bounded, day-scoped conversation log
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    day_stamp: NaiveDate,
    max_turns: usize,
    clock: Arc<dyn Clock>,
}

impl ConversationHistory {
    /// Create an empty history stamped with today's date
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_turns(clock, DEFAULT_MAX_TURNS)
    }

    /// Create an empty history holding at most `max_turns` turns
    ///
    /// A limit of zero is raised to one.
    pub fn with_max_turns(clock: Arc<dyn Clock>, max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns),
            day_stamp: clock.today(),
            max_turns,
            clock,
        }
    }

    /// Append a turn stamped with the current time, evicting the oldest
    /// turn if the log is full
    pub fn record_turn(&mut self, role: TurnRole, text: impl Into<String>) {
        if self.turns.len() >= self.max_turns {
            if let Some(evicted) = self.turns.pop_front() {
                tracing::debug!(
                    role = evicted.role.label(),
                    remaining = self.turns.len(),
                    "Evicted oldest turn"
                );
            }
        }

        self.turns.push_back(Turn {
            role,
            text: text.into(),
            occurred_at: self.clock.time_of_day(),
        });
    }

    /// Clear the log if the date changed since the last touch
    ///
    /// Returns `true` when a reset happened.
    pub fn rollover_if_new_day(&mut self) -> bool {
        let today = self.clock.today();
        if today == self.day_stamp {
            return false;
        }

        tracing::info!(
            previous = %self.day_stamp,
            today = %today,
            dropped = self.turns.len(),
            "New day detected, cleared conversation history"
        );
        self.turns.clear();
        self.day_stamp = today;
        true
    }

    /// Role-labelled transcript of all turns, oldest first
    ///
    /// Each turn renders as `"<Role>: <text>\n"`. Empty when there are no
    /// turns.
    #[must_use]
    pub fn render_as_context(&self) -> String {
        let mut context = String::new();
        for turn in &self.turns {
            // Writing into a String cannot fail
            let _ = writeln!(context, "{}: {}", turn.role.label(), turn.text);
        }
        context
    }

    /// Independent copy of the held turns, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Drop all turns, keeping the day stamp
    pub fn clear(&mut self) {
        self.turns.clear();
        tracing::debug!("Conversation history manually cleared");
    }

    /// Number of held turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether there are no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Date every held turn was recorded on
    #[must_use]
    pub fn day_stamp(&self) -> NaiveDate {
        self.day_stamp
    }

    /// Configured turn limit
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

impl std::fmt::Debug for ConversationHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHistory")
            .field("turns", &self.turns)
            .field("day_stamp", &self.day_stamp)
            .field("max_turns", &self.max_turns)
            .finish_non_exhaustive()
    }
}
