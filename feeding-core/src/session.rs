//! Feeding session model.
//!
//! A live [`FeedingSession`] never carries an eaten volume: the eaten volume
//! is the last input of a feeding and only ever appears on the terminal
//! [`CompletedFeeding`] record produced when the session is destroyed.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::ids::{Actor, ChatId, MessageId};

/// Which numeric reply the session expects next.
///
/// The awaiting variants carry the id of the prompt message, so a session
/// can never wait for input without a prompt on screen (or the reverse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InputState {
    #[default]
    None,
    AwaitingPrepared { prompt: MessageId },
    AwaitingEaten { prompt: MessageId },
}

impl InputState {
    /// The outstanding prompt message, if any.
    pub fn prompt(&self) -> Option<MessageId> {
        match self {
            Self::None => None,
            Self::AwaitingPrepared { prompt } | Self::AwaitingEaten { prompt } => Some(*prompt),
        }
    }

    pub fn is_awaiting(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The single active feeding of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingSession {
    chat_id: ChatId,
    anchor: MessageId,
    initiator: Actor,
    started_at: DateTime<FixedOffset>,
    prepared_ml: Option<u32>,
    input: InputState,
}

impl FeedingSession {
    pub fn new(
        chat_id: ChatId,
        anchor: MessageId,
        initiator: Actor,
        started_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            chat_id,
            anchor,
            initiator,
            started_at,
            prepared_ml: None,
            input: InputState::None,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// The message that is edited in place as the feeding progresses.
    pub fn anchor(&self) -> MessageId {
        self.anchor
    }

    pub fn initiator(&self) -> &Actor {
        &self.initiator
    }

    pub fn started_at(&self) -> DateTime<FixedOffset> {
        self.started_at
    }

    pub fn prepared_ml(&self) -> Option<u32> {
        self.prepared_ml
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub(crate) fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    pub(crate) fn record_prepared(&mut self, ml: u32) {
        self.prepared_ml = Some(ml);
        self.input = InputState::None;
    }

    /// Consume the session into its completion record.
    pub(crate) fn complete(
        self,
        finisher: Actor,
        ended_at: DateTime<FixedOffset>,
        eaten_ml: u32,
    ) -> CompletedFeeding {
        CompletedFeeding {
            chat_id: self.chat_id,
            anchor: self.anchor,
            initiator: self.initiator,
            finisher,
            started_at: self.started_at,
            ended_at,
            prepared_ml: self.prepared_ml,
            eaten_ml,
        }
    }
}

/// A finished feeding, as shown on the completion card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedFeeding {
    pub chat_id: ChatId,
    pub anchor: MessageId,
    pub initiator: Actor,
    pub finisher: Actor,
    pub started_at: DateTime<FixedOffset>,
    pub ended_at: DateTime<FixedOffset>,
    pub prepared_ml: Option<u32>,
    pub eaten_ml: u32,
}

impl CompletedFeeding {
    /// Whole minutes between start and end, truncated. Never negative.
    pub fn duration_minutes(&self) -> i64 {
        (self.ended_at - self.started_at).num_seconds().max(0) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 10, h, m, s)
            .unwrap()
    }

    fn session() -> FeedingSession {
        FeedingSession::new(ChatId(1), MessageId(10), Actor::new(UserId(7), "Anna"), at(10, 0, 0))
    }

    #[test]
    fn new_session_waits_for_nothing() {
        let s = session();
        assert_eq!(s.input(), InputState::None);
        assert_eq!(s.input().prompt(), None);
        assert_eq!(s.prepared_ml(), None);
    }

    #[test]
    fn recording_prepared_clears_input() {
        let mut s = session();
        s.set_input(InputState::AwaitingPrepared {
            prompt: MessageId(11),
        });
        assert!(s.input().is_awaiting());
        assert_eq!(s.input().prompt(), Some(MessageId(11)));

        s.record_prepared(150);
        assert_eq!(s.prepared_ml(), Some(150));
        assert_eq!(s.input(), InputState::None);
    }

    #[test]
    fn duration_truncates_to_whole_minutes() {
        let done = session().complete(Actor::new(UserId(8), "Boris"), at(10, 5, 59), 80);
        assert_eq!(done.duration_minutes(), 5);

        let done = session().complete(Actor::new(UserId(8), "Boris"), at(10, 0, 59), 80);
        assert_eq!(done.duration_minutes(), 0);
    }

    #[test]
    fn duration_counts_past_a_day() {
        let done = session().complete(
            Actor::new(UserId(7), "Anna"),
            at(10, 0, 0) + Duration::hours(25),
            10,
        );
        assert_eq!(done.duration_minutes(), 25 * 60);
    }

    #[test]
    fn duration_never_negative() {
        let done = session().complete(Actor::new(UserId(7), "Anna"), at(9, 59, 0), 10);
        assert_eq!(done.duration_minutes(), 0);
    }

    #[test]
    fn completion_keeps_initiator_and_start() {
        let mut s = session();
        s.record_prepared(100);
        let done = s.complete(Actor::new(UserId(8), "Boris"), at(10, 30, 0), 90);
        assert_eq!(done.initiator.display_name, "Anna");
        assert_eq!(done.finisher.display_name, "Boris");
        assert_eq!(done.started_at, at(10, 0, 0));
        assert_eq!(done.prepared_ml, Some(100));
        assert_eq!(done.eaten_ml, 90);
        assert_eq!(done.anchor, MessageId(10));
    }
}
