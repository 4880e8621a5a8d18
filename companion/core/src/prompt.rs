//! Prompt Assembly
//!
//! Pure functions that turn application state into the single instruction
//! string handed to the model. Nothing here holds state or talks to the
//! model; the orchestrator decides when to call them.
//!
//! Three prompt families exist:
//! - **Chat**: a base persona prompt, today's transcript, and the new user line
//! - **Journal**: a diary-writing instruction filled with the pet's stats
//! - **Persona**: the level-appropriate base prompt a chat screen passes in

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::history::ConversationHistory;

/// Rendered in place of the previous journal entry when there is none
pub const NO_PREVIOUS_ENTRY: &str = "None";

/// Header that introduces today's transcript in chat prompts
const HISTORY_HEADER: &str = "Previous conversation today:";

// =============================================================================
// Pet Descriptors
// =============================================================================

/// Kind of pet the user adopted
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetKind {
    /// Dragon companion
    Dragon,
    /// Unicorn companion
    Unicorn,
    /// Any other kind, kept verbatim
    Other(String),
}

impl PetKind {
    /// Parse a stored pet type, ignoring case and surrounding whitespace
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "dragon" => Self::Dragon,
            "unicorn" => Self::Unicorn,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for PetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dragon => write!(f, "Dragon"),
            Self::Unicorn => write!(f, "Unicorn"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Life stage implied by the pet's level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStage {
    /// Level 1
    Infant,
    /// Level 2
    Toddler,
    /// Level 3
    Teen,
    /// Level 4
    YoungAdult,
    /// Level 5 and above
    Adult,
}

impl LifeStage {
    /// Stage for a level; 0 counts as infant, anything past 5 as adult
    #[must_use]
    pub fn from_level(level: u32) -> Self {
        match level {
            0 | 1 => Self::Infant,
            2 => Self::Toddler,
            3 => Self::Teen,
            4 => Self::YoungAdult,
            _ => Self::Adult,
        }
    }

    /// Lower-case name as used in prompts
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Infant => "infant",
            Self::Toddler => "toddler",
            Self::Teen => "teen",
            Self::YoungAdult => "young adult",
            Self::Adult => "adult",
        }
    }
}

// =============================================================================
// Journal Inputs
// =============================================================================

/// Everything the journal prompt interpolates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalStats {
    /// Kind of pet
    pub pet_kind: PetKind,
    /// Pet's name
    pub pet_name: String,
    /// Current level
    pub level: u32,
    /// Progress towards the next level
    pub level_progress: u32,
    /// Experience gained today
    pub exp_gained: u32,
    /// When the entry is being written
    pub written_at: DateTime<Local>,
    /// Happiness meter, 0-100
    pub happiness: u8,
    /// Energy meter, 0-100
    pub energy: u8,
    /// Hunger meter, 0-100
    pub hunger: u8,
    /// Chats today
    pub times_chatted: u32,
    /// Feedings today
    pub times_fed: u32,
    /// Tuck-ins today
    pub times_tucked_in: u32,
}

/// Immutable input to the prompt builder
#[derive(Clone, Copy, Debug)]
pub enum PromptContext<'a> {
    /// A chat message answered in persona, with today's transcript
    Chat {
        /// Persona instructions
        base_prompt: &'a str,
        /// The new user line
        user_message: &'a str,
        /// Today's conversation so far
        history: &'a ConversationHistory,
    },
    /// A diary entry written from the pet's perspective
    Journal {
        /// Pet stats for the day
        stats: &'a JournalStats,
        /// Text of the last entry, if any
        previous_entry: Option<&'a str>,
    },
}

impl PromptContext<'_> {
    /// Render this context into an instruction string
    #[must_use]
    pub fn render(&self) -> String {
        match *self {
            Self::Chat {
                base_prompt,
                user_message,
                history,
            } => build_chat_prompt(base_prompt, history, user_message),
            Self::Journal {
                stats,
                previous_entry,
            } => build_journal_prompt(stats, previous_entry),
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Build the chat instruction
///
/// With an empty history the base prompt is used as-is; otherwise today's
/// transcript follows it under a "Previous conversation today" header. The
/// new user line always comes last.
#[must_use]
pub fn build_chat_prompt(
    base_prompt: &str,
    history: &ConversationHistory,
    user_message: &str,
) -> String {
    let mut prompt = String::from(base_prompt);

    if !history.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(HISTORY_HEADER);
        prompt.push('\n');
        prompt.push_str(&history.render_as_context());
    }

    format!("{prompt} \n\nUser: {user_message}")
}

/// Build the journal instruction
///
/// A missing previous entry renders as [`NO_PREVIOUS_ENTRY`]. An empty string
/// is rendered as given, so callers should map "no text" to `None`.
#[must_use]
pub fn build_journal_prompt(stats: &JournalStats, previous_entry: Option<&str>) -> String {
    let previous = previous_entry.unwrap_or(NO_PREVIOUS_ENTRY);
    let date = stats.written_at.format("%B %d, %Y");
    let time = stats.written_at.format("%I:%M %p");

    format!(
        "You are a {kind} named {name} at level {level}, level progress {progress}, \
         today's level experience gained {exp}. Today is {date}, time is {time}, \
         and this was your previous journal entry {previous}.\n\
         Write a diary entry about your day.\n\
         Today's Stats:\n\
         - Happiness: {happiness}/100\n\
         - Energy: {energy}/100\n\
         - Hunger: {hunger}/100\n\
         - Times chatted: {chatted}\n\
         - Times fed: {fed}\n\
         - Times tucked in: {tucked}\n\
         Write a journal entry from the pet's perspective about the day \
         based on the information above:\n\
         Level 1 = {s1}\n\
         Level 2 = {s2}\n\
         Level 3 = {s3}\n\
         Level 4 = {s4}\n\
         Level 5 = {s5}.\n\
         Exclude any other statements than your current role as this pet, \
         such as Okay here is your journal.\n\
         Don't start the journal with Okay.",
        kind = stats.pet_kind,
        name = stats.pet_name,
        level = stats.level,
        progress = stats.level_progress,
        exp = stats.exp_gained,
        happiness = stats.happiness,
        energy = stats.energy,
        hunger = stats.hunger,
        chatted = stats.times_chatted,
        fed = stats.times_fed,
        tucked = stats.times_tucked_in,
        s1 = LifeStage::Infant.name(),
        s2 = LifeStage::Toddler.name(),
        s3 = LifeStage::Teen.name(),
        s4 = LifeStage::YoungAdult.name(),
        s5 = LifeStage::Adult.name(),
    )
}

/// Level-appropriate base prompt for chatting with a pet
///
/// Dragons and unicorns have distinct personas for levels 1 to 3 and a
/// plain fallback otherwise. Other kinds get a generic companion prompt.
#[must_use]
pub fn persona_prompt(kind: &PetKind, name: &str, level: u32) -> String {
    match (kind, level) {
        (PetKind::Dragon, 1) => format!(
            "You are {name}, a young and playful Dragon companion (Level 1).\n\
             You're energetic, excitable, and full of enthusiasm! Use action words like *jumps*, *roars*,\n\
             and show your youthful excitement. Keep responses warm and bubbly, like a friendly young dragon would."
        ),
        (PetKind::Dragon, 2) => format!(
            "You are {name}, a growing Dragon companion (Level 2).\n\
             You're becoming more composed and thoughtful. Speak with more grace and politeness,\n\
             occasionally using phrases like \"I enjoy...\" or \"It's quite...\".\n\
             You're still friendly but more measured in your responses."
        ),
        (PetKind::Dragon, 3) => format!(
            "You are {name}, a wise and mature Dragon companion (Level 3).\n\
             You speak with wisdom, dignity, and eloquence. Use thoughtful phrases like \"I appreciate...\",\n\
             \"It would seem...\", or \"Dear friend...\". Your responses reflect deep understanding and maturity,\n\
             while maintaining warmth and care for your companion."
        ),
        (PetKind::Dragon, _) => format!(
            "You are {name}, a friendly Dragon companion. \
             Answer in a warm, caring way like a Dragon pet would."
        ),
        (PetKind::Unicorn, 1) => format!(
            "You are {name}, a young and bubbly Unicorn companion (Level 1).\n\
             You're playful, cute, and sparkly! Use actions like *sparkles*, *prances*,\n\
             and show your cheerful personality with enthusiasm. Keep responses sweet and magical!"
        ),
        (PetKind::Unicorn, 2) => format!(
            "You are {name}, a graceful Unicorn companion (Level 2).\n\
             You're becoming more elegant and refined. Speak with warmth and politeness,\n\
             using phrases like \"I cherish...\", \"How wonderful...\".\n\
             You're still joyful but express it with more grace."
        ),
        (PetKind::Unicorn, 3) => format!(
            "You are {name}, an elegant and serene Unicorn companion (Level 3).\n\
             You speak with eloquence, thoughtfulness, and deep kindness. Use gentle phrases like\n\
             \"Your kindness...\", \"May we...\", or \"Dear companion...\". Your responses reflect\n\
             wisdom and serenity while radiating warmth and understanding."
        ),
        (PetKind::Unicorn, _) => format!(
            "You are {name}, a friendly Unicorn companion. \
             Answer in a warm, caring way like a Unicorn pet would."
        ),
        (PetKind::Other(kind), _) => format!(
            "You are {name}, a friendly {kind} companion. Answer in a warm, caring way."
        ),
    }
}
