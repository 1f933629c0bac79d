//! User-facing outcomes that stop a transition.

use std::fmt;

/// A transition that requires owner-or-admin rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Finish,
    Cancel,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finish => f.write_str("finish"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

/// Why a feeding event was refused.
///
/// All of these are expected and recoverable; the gateway shows them to the
/// actor and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedingError {
    #[error("a feeding is already in progress in this chat")]
    AlreadyActive,

    #[error("there is no feeding in progress in this chat")]
    NoActiveSession,

    #[error("only the initiator or a chat administrator may {0} the feeding")]
    PermissionDenied(Action),

    #[error("expected a non-negative whole number of millilitres")]
    InvalidInput,

    /// The feeding card could not be posted, so no session was created.
    #[error("the feeding card could not be delivered")]
    Delivery,
}
