//! Who may finish or cancel someone else's feeding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::gateway::{ChannelError, ChannelResult};
use crate::ids::{ChatId, UserId};

/// Role of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

/// External "get chat member" lookup.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn member_role(&self, chat: ChatId, user: UserId) -> ChannelResult<MemberRole>;
}

/// Owner-or-admin policy, failing closed.
#[derive(Clone)]
pub struct PermissionOracle {
    lookup: Arc<dyn MembershipLookup>,
    timeout: Duration,
}

impl PermissionOracle {
    pub fn new(lookup: Arc<dyn MembershipLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// May `actor` act on a feeding owned by `owner`?
    ///
    /// The owner is always allowed without a lookup. Anybody else must be an
    /// administrator or the creator of the chat; a failed or slow lookup
    /// counts as "no".
    pub async fn authorize(&self, chat: ChatId, actor: UserId, owner: UserId) -> bool {
        if actor == owner {
            return true;
        }

        let role = match tokio::time::timeout(self.timeout, self.lookup.member_role(chat, actor))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout),
        };

        match role {
            Ok(role) => {
                tracing::debug!(chat_id = %chat, user_id = %actor, ?role, "Member role resolved");
                role.is_admin()
            }
            Err(e) => {
                tracing::warn!(
                    chat_id = %chat,
                    user_id = %actor,
                    error = %e,
                    "Member role lookup failed, denying"
                );
                false
            }
        }
    }
}
