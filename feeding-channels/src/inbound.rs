//! Turning raw Telegram updates into feeding events.

use feeding_core::{Actor, ChatId, FeedingEvent, MessageId, UserId};

use crate::render::{CANCEL_FEEDING, FINISH_FEEDING, START_FEEDING};
use crate::telegram::types::{Update, User};

/// Where an event came from, which decides how the bot answers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A slash command; errors are replied to the command message.
    Command { message: MessageId },
    /// An inline button; the callback query must always be answered.
    Button { callback_id: String },
    /// Free text; only meaningful while a prompt is outstanding.
    Text { message: MessageId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Help,
    Feeding(FeedingEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat: ChatId,
    pub origin: Origin,
    pub request: Request,
}

fn actor(user: &User) -> Actor {
    Actor::new(UserId(user.id), user.full_name())
}

/// Classify an update. Updates the bot has nothing to do with yield `None`.
pub fn classify(update: Update) -> Option<Inbound> {
    if let Some(cb) = update.callback_query {
        let chat = ChatId(cb.message.as_ref()?.chat.id);
        let actor = actor(&cb.from);
        let event = match cb.data.as_deref()? {
            START_FEEDING => FeedingEvent::Start { actor },
            FINISH_FEEDING => FeedingEvent::Finish { actor },
            CANCEL_FEEDING => FeedingEvent::Cancel { actor },
            other => {
                tracing::debug!(chat_id = %chat, data = other, "Unknown callback data");
                return None;
            }
        };
        return Some(Inbound {
            chat,
            origin: Origin::Button { callback_id: cb.id },
            request: Request::Feeding(event),
        });
    }

    let message = update.message?;
    let text = message.text?;
    let from = message.from.as_ref()?;
    let chat = ChatId(message.chat.id);
    let id = MessageId(message.message_id);
    let actor = actor(from);

    if let Some(command) = parse_command(&text) {
        let request = match command {
            "start" | "help" => Some(Request::Help),
            "feeding" => Some(Request::Feeding(FeedingEvent::Start {
                actor: actor.clone(),
            })),
            "end_feeding" => Some(Request::Feeding(FeedingEvent::Finish {
                actor: actor.clone(),
            })),
            "cancel" => Some(Request::Feeding(FeedingEvent::Cancel {
                actor: actor.clone(),
            })),
            _ => None,
        };
        if let Some(request) = request {
            return Some(Inbound {
                chat,
                origin: Origin::Command { message: id },
                request,
            });
        }
    }

    Some(Inbound {
        chat,
        origin: Origin::Text { message: id },
        request: Request::Feeding(FeedingEvent::TextReply {
            actor,
            text,
            message: id,
        }),
    })
}

/// `/name` or `/name@BotName`, followed by optional arguments.
pub fn parse_command(text: &str) -> Option<&str> {
    let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
