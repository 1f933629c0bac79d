//! Fakes for the gateway ports.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::gateway::{ChannelError, ChannelResult, Messenger};
use crate::ids::{ChatId, MessageId, UserId};
use crate::permission::{MemberRole, MembershipLookup};
use crate::view::View;

/// One outbound call the machine made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Send {
        chat: ChatId,
        id: MessageId,
        view: View,
    },
    Edit {
        chat: ChatId,
        message: MessageId,
        view: View,
    },
    Delete {
        chat: ChatId,
        message: MessageId,
    },
}

/// Records every call; message ids count up from 100.
pub struct RecordingMessenger {
    next_id: AtomicI64,
    log: Mutex<Vec<Directive>>,
    fail_sends: Mutex<HashSet<usize>>,
    sends: AtomicUsize,
    fail_everything: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            log: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(HashSet::new()),
            sends: AtomicUsize::new(0),
            fail_everything: false,
        }
    }

    /// Every send, edit and delete fails.
    pub fn broken() -> Self {
        Self {
            fail_everything: true,
            ..Self::new()
        }
    }

    /// Make the n-th send (0-based, counted from now on) fail.
    pub fn fail_send(&self, nth_from_now: usize) {
        let base = self.sends.load(Ordering::SeqCst);
        self.fail_sends.lock().unwrap().insert(base + nth_from_now);
    }

    pub fn directives(&self) -> Vec<Directive> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<(MessageId, View)> {
        self.directives()
            .into_iter()
            .filter_map(|d| match d {
                Directive::Send { id, view, .. } => Some((id, view)),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageId, View)> {
        self.directives()
            .into_iter()
            .filter_map(|d| match d {
                Directive::Edit { message, view, .. } => Some((message, view)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.directives()
            .into_iter()
            .filter_map(|d| match d {
                Directive::Delete { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat: ChatId, view: &View) -> ChannelResult<MessageId> {
        let nth = self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail_everything || self.fail_sends.lock().unwrap().contains(&nth) {
            return Err(ChannelError::Connection("send refused".into()));
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.log.lock().unwrap().push(Directive::Send {
            chat,
            id,
            view: view.clone(),
        });
        Ok(id)
    }

    async fn edit(&self, chat: ChatId, message: MessageId, view: &View) -> ChannelResult<()> {
        self.log.lock().unwrap().push(Directive::Edit {
            chat,
            message,
            view: view.clone(),
        });
        if self.fail_everything {
            return Err(ChannelError::Connection("edit refused".into()));
        }
        Ok(())
    }

    async fn delete(&self, chat: ChatId, message: MessageId) -> ChannelResult<()> {
        self.log.lock().unwrap().push(Directive::Delete { chat, message });
        if self.fail_everything {
            return Err(ChannelError::Connection("delete refused".into()));
        }
        Ok(())
    }
}

/// Answers role lookups from a fixed table; unknown users are members.
pub struct ScriptedMembership {
    roles: HashMap<UserId, MemberRole>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedMembership {
    pub fn new() -> Self {
        Self {
            roles: HashMap::new(),
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_role(mut self, user: UserId, role: MemberRole) -> Self {
        self.roles.insert(user, role);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipLookup for ScriptedMembership {
    async fn member_role(&self, _chat: ChatId, user: UserId) -> ChannelResult<MemberRole> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ChannelError::Api {
                method: "getChatMember".into(),
                description: "Bad Request: chat not found".into(),
            });
        }
        Ok(self.roles.get(&user).copied().unwrap_or(MemberRole::Member))
    }
}
