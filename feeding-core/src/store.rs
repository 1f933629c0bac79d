//! In-memory session store with one async lock per chat.
//!
//! Every transition runs while holding its chat's [`ChatSlot`], so the
//! check-mutate-persist sequence of one chat never interleaves with another
//! event for the same chat. Chats never wait on each other. A chat's slot is
//! dropped from the map once it is empty and nobody is waiting on it.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ids::ChatId;
use crate::session::FeedingSession;

type Slot = Arc<Mutex<Option<FeedingSession>>>;

/// Process-wide map from chat to its (at most one) active feeding.
#[derive(Default)]
pub struct SessionStore {
    slots: Arc<DashMap<ChatId, Slot>>,
    active: Arc<AtomicUsize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take exclusive access to a chat's slot, waiting for any event of the
    /// same chat that is still in flight.
    pub async fn lock(&self, chat: ChatId) -> ChatSlot {
        // Clone the Arc out so the map shard is not held across the await.
        let slot = self.slots.entry(chat).or_default().clone();
        ChatSlot {
            chat,
            guard: Some(slot.lock_owned().await),
            slots: self.slots.clone(),
            active: self.active.clone(),
        }
    }

    /// Snapshot of a chat's session.
    pub async fn get(&self, chat: ChatId) -> Option<FeedingSession> {
        self.lock(chat).await.session().cloned()
    }

    /// Store a session, replacing whatever the chat had.
    pub async fn put(&self, chat: ChatId, session: FeedingSession) {
        self.lock(chat).await.put(session);
    }

    /// Remove and return a chat's session.
    pub async fn delete(&self, chat: ChatId) -> Option<FeedingSession> {
        self.lock(chat).await.take()
    }

    pub async fn contains(&self, chat: ChatId) -> bool {
        self.lock(chat).await.session().is_some()
    }

    /// Number of chats with a feeding in progress.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Number of chats that currently own a slot.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive handle on one chat's session, released on drop.
#[derive(Debug)]
pub struct ChatSlot {
    chat: ChatId,
    // Only `None` while dropping.
    guard: Option<OwnedMutexGuard<Option<FeedingSession>>>,
    slots: Arc<DashMap<ChatId, Slot>>,
    active: Arc<AtomicUsize>,
}

impl ChatSlot {
    pub fn session(&self) -> Option<&FeedingSession> {
        self.guard.as_deref().and_then(Option::as_ref)
    }

    pub fn session_mut(&mut self) -> Option<&mut FeedingSession> {
        self.guard.as_deref_mut().and_then(Option::as_mut)
    }

    pub fn put(&mut self, session: FeedingSession) {
        if let Some(guard) = self.guard.as_mut() {
            if guard.replace(session).is_none() {
                self.active.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn take(&mut self) -> Option<FeedingSession> {
        let session = self.guard.as_mut().and_then(|guard| guard.take());
        if session.is_some() {
            self.active.fetch_sub(1, Ordering::Relaxed);
        }
        session
    }
}

impl Drop for ChatSlot {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let vacant = guard.is_none();
        drop(guard);

        // A waiter clones the slot before it awaits the lock, so a count of
        // one means the map holds the only reference.
        if vacant {
            self.slots
                .remove_if(&self.chat, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}
