//! Feeding Core - the per-chat feeding session state machine.
//!
//! A chat holds at most one feeding at a time. Someone starts it, the bot asks
//! how much milk was prepared, someone with the right to do so finishes it,
//! the bot asks how much was eaten and then posts the completion card.
//!
//! ## Architecture
//!
//! ```text
//! gateway event → FeedingMachine ──► PermissionOracle ──► MembershipLookup
//!                      │  │
//!                      │  └──► Clock
//!                      ├──► SessionStore (per-chat lock)
//!                      └──► Messenger (send / edit / delete)
//! ```
//!
//! The core is transport-agnostic: the gateway implements [`Messenger`] and
//! [`MembershipLookup`] and turns [`View`]s into whatever its chat surface
//! understands.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod clock;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod machine;
pub mod permission;
pub mod session;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Action, FeedingError};
pub use gateway::{ChannelError, ChannelResult, Messenger};
pub use ids::{Actor, ChatId, MessageId, UserId};
pub use machine::{FeedingEvent, FeedingMachine, Outcome};
pub use permission::{MemberRole, MembershipLookup, PermissionOracle};
pub use session::{CompletedFeeding, FeedingSession, InputState};
pub use store::{ChatSlot, SessionStore};
pub use view::{Keyboard, PromptKind, View};
