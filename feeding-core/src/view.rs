//! What the bot shows. The gateway turns a [`View`] into text and buttons.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::session::{CompletedFeeding, FeedingSession};

/// Button layouts offered under a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyboard {
    /// A single "start feeding" button.
    Start,
    /// "Finish" and "cancel" side by side.
    FinishOrCancel,
}

/// Which volume a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Prepared,
    Eaten,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Command overview with the start button.
    Help,
    /// The anchor card of a running feeding.
    Started {
        initiator: String,
        started_at: DateTime<FixedOffset>,
        prepared_ml: Option<u32>,
    },
    /// The anchor card after the eaten volume arrived.
    Completed(CompletedFeeding),
    /// The anchor card after a cancel.
    Cancelled,
    /// A request for a numeric reply.
    Prompt(PromptKind),
}

impl View {
    pub fn started(session: &FeedingSession) -> Self {
        Self::Started {
            initiator: session.initiator().display_name.clone(),
            started_at: session.started_at(),
            prepared_ml: session.prepared_ml(),
        }
    }

    pub fn keyboard(&self) -> Option<Keyboard> {
        match self {
            Self::Help | Self::Completed(_) | Self::Cancelled => Some(Keyboard::Start),
            Self::Started { .. } => Some(Keyboard::FinishOrCancel),
            Self::Prompt(_) => None,
        }
    }
}
