//! The feeding session state machine.
//!
//! ```text
//! Idle ──start──► Active/AwaitingPrepared ──reply──► Active/None
//!                        │                              │
//!                        └──────────finish──────────────┴──► Active/AwaitingEaten ──reply──► Idle
//!
//! cancel: any Active/* ──► Idle
//! ```
//!
//! Each operation holds the chat's slot for its whole duration, gateway calls
//! included. The in-memory session is the source of truth: a failed send,
//! edit or delete is logged and never rolls the state back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{Action, FeedingError};
use crate::gateway::{ChannelError, ChannelResult, Messenger};
use crate::ids::{Actor, ChatId, MessageId};
use crate::permission::PermissionOracle;
use crate::session::{CompletedFeeding, FeedingSession, InputState};
use crate::store::{ChatSlot, SessionStore};
use crate::view::{PromptKind, View};

/// Upper bound for a single gateway call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(15);

/// Inbound events, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedingEvent {
    Start {
        actor: Actor,
    },
    Finish {
        actor: Actor,
    },
    Cancel {
        actor: Actor,
    },
    TextReply {
        actor: Actor,
        text: String,
        message: MessageId,
    },
}

/// What a successful event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started { anchor: MessageId },
    AwaitingEaten,
    PreparedRecorded { ml: u32 },
    Completed(CompletedFeeding),
    Cancelled,
    /// Text that was not an answer to a prompt.
    Ignored,
}

pub struct FeedingMachine {
    store: Arc<SessionStore>,
    oracle: PermissionOracle,
    clock: Arc<dyn Clock>,
    messenger: Arc<dyn Messenger>,
    io_timeout: Duration,
}

impl FeedingMachine {
    pub fn new(
        store: Arc<SessionStore>,
        oracle: PermissionOracle,
        clock: Arc<dyn Clock>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            store,
            oracle,
            clock,
            messenger,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Route an event to its operation.
    pub async fn handle(&self, chat: ChatId, event: FeedingEvent) -> Result<Outcome, FeedingError> {
        match event {
            FeedingEvent::Start { actor } => self.request_start(chat, actor).await,
            FeedingEvent::Finish { actor } => self.request_finish(chat, &actor).await,
            FeedingEvent::Cancel { actor } => self.request_cancel(chat, &actor).await,
            FeedingEvent::TextReply {
                actor,
                text,
                message,
            } => self.submit_numeric_reply(chat, actor, &text, message).await,
        }
    }

    /// Open a feeding: post the anchor card, then ask for the prepared volume.
    pub async fn request_start(&self, chat: ChatId, actor: Actor) -> Result<Outcome, FeedingError> {
        let mut slot = self.store.lock(chat).await;
        if slot.session().is_some() {
            return Err(FeedingError::AlreadyActive);
        }

        let started_at = self.clock.now();
        let card = View::Started {
            initiator: actor.display_name.clone(),
            started_at,
            prepared_ml: None,
        };
        let Some(anchor) = self.send(chat, &card).await else {
            return Err(FeedingError::Delivery);
        };

        let mut session = FeedingSession::new(chat, anchor, actor, started_at);
        if let Some(prompt) = self.send(chat, &View::Prompt(PromptKind::Prepared)).await {
            session.set_input(InputState::AwaitingPrepared { prompt });
        }

        tracing::info!(
            chat_id = %chat,
            user_id = %session.initiator().id,
            anchor = %anchor,
            "Feeding started"
        );
        slot.put(session);
        Ok(Outcome::Started { anchor })
    }

    /// Ask for the eaten volume. The feeding completes on the reply.
    pub async fn request_finish(&self, chat: ChatId, actor: &Actor) -> Result<Outcome, FeedingError> {
        let mut slot = self.store.lock(chat).await;
        let superseded = self.authorized_session(&slot, chat, actor, Action::Finish).await?;

        if let Some(prompt) = superseded {
            self.delete(chat, prompt).await;
        }
        let input = match self.send(chat, &View::Prompt(PromptKind::Eaten)).await {
            Some(prompt) => InputState::AwaitingEaten { prompt },
            None => InputState::None,
        };
        if let Some(session) = slot.session_mut() {
            session.set_input(input);
        }

        tracing::info!(chat_id = %chat, user_id = %actor.id, "Feeding finish requested");
        Ok(Outcome::AwaitingEaten)
    }

    /// Drop the feeding without a record.
    pub async fn request_cancel(&self, chat: ChatId, actor: &Actor) -> Result<Outcome, FeedingError> {
        let mut slot = self.store.lock(chat).await;
        self.authorized_session(&slot, chat, actor, Action::Cancel).await?;

        let Some(session) = slot.take() else {
            return Err(FeedingError::NoActiveSession);
        };
        if let Some(prompt) = session.input().prompt() {
            self.delete(chat, prompt).await;
        }
        self.edit(chat, session.anchor(), &View::Cancelled).await;

        tracing::info!(chat_id = %chat, user_id = %actor.id, "Feeding cancelled");
        Ok(Outcome::Cancelled)
    }

    /// Treat free text as the answer to the outstanding prompt, if there is one.
    pub async fn submit_numeric_reply(
        &self,
        chat: ChatId,
        actor: Actor,
        raw: &str,
        message: MessageId,
    ) -> Result<Outcome, FeedingError> {
        let mut slot = self.store.lock(chat).await;
        let Some(session) = slot.session() else {
            return Ok(Outcome::Ignored);
        };
        let input = session.input();
        if !input.is_awaiting() {
            return Ok(Outcome::Ignored);
        }

        let Some(ml) = parse_volume(raw) else {
            tracing::debug!(chat_id = %chat, user_id = %actor.id, "Rejected volume reply");
            return Err(FeedingError::InvalidInput);
        };

        match input {
            InputState::AwaitingPrepared { prompt } => {
                let (anchor, card) = match slot.session_mut() {
                    Some(session) => {
                        session.record_prepared(ml);
                        (session.anchor(), View::started(session))
                    }
                    None => return Ok(Outcome::Ignored),
                };
                self.edit(chat, anchor, &card).await;
                self.delete(chat, prompt).await;
                self.delete(chat, message).await;

                tracing::info!(chat_id = %chat, prepared_ml = ml, "Prepared volume recorded");
                Ok(Outcome::PreparedRecorded { ml })
            }
            InputState::AwaitingEaten { prompt } => {
                let Some(session) = slot.take() else {
                    return Ok(Outcome::Ignored);
                };
                let completed = session.complete(actor, self.clock.now(), ml);

                self.edit(chat, completed.anchor, &View::Completed(completed.clone()))
                    .await;
                self.delete(chat, prompt).await;
                self.delete(chat, message).await;

                tracing::info!(
                    chat_id = %chat,
                    initiator = %completed.initiator.id,
                    finisher = %completed.finisher.id,
                    duration_minutes = completed.duration_minutes(),
                    prepared_ml = ?completed.prepared_ml,
                    eaten_ml = completed.eaten_ml,
                    "Feeding completed"
                );
                Ok(Outcome::Completed(completed))
            }
            InputState::None => Ok(Outcome::Ignored),
        }
    }

    /// Existence and permission checks shared by finish and cancel.
    /// Returns the prompt that the caller may have to retire.
    async fn authorized_session(
        &self,
        slot: &ChatSlot,
        chat: ChatId,
        actor: &Actor,
        action: Action,
    ) -> Result<Option<MessageId>, FeedingError> {
        let session = slot.session().ok_or(FeedingError::NoActiveSession)?;
        let owner = session.initiator().id;
        if !self.oracle.authorize(chat, actor.id, owner).await {
            tracing::info!(chat_id = %chat, user_id = %actor.id, %action, "Permission denied");
            return Err(FeedingError::PermissionDenied(action));
        }
        Ok(session.input().prompt())
    }

    async fn bounded<T>(&self, call: impl Future<Output = ChannelResult<T>>) -> ChannelResult<T> {
        tokio::time::timeout(self.io_timeout, call)
            .await
            .unwrap_or(Err(ChannelError::Timeout))
    }

    async fn send(&self, chat: ChatId, view: &View) -> Option<MessageId> {
        match self.bounded(self.messenger.send(chat, view)).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(chat_id = %chat, error = %e, "Failed to send message");
                None
            }
        }
    }

    async fn edit(&self, chat: ChatId, message: MessageId, view: &View) {
        if let Err(e) = self.bounded(self.messenger.edit(chat, message, view)).await {
            tracing::warn!(chat_id = %chat, message_id = %message, error = %e, "Failed to edit message");
        }
    }

    async fn delete(&self, chat: ChatId, message: MessageId) {
        if let Err(e) = self.bounded(self.messenger.delete(chat, message)).await {
            tracing::warn!(chat_id = %chat, message_id = %message, error = %e, "Failed to delete message");
        }
    }
}

/// A volume reply: a base-10 whole number of millilitres, zero allowed.
pub fn parse_volume(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}
