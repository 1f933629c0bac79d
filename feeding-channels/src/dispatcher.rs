//! Routing inbound updates to the feeding machine and answering the actor.
//!
//! Updates are pulled by a single long-poll loop and pushed onto one queue per
//! chat, so a chat's events are handled in arrival order while different
//! chats proceed concurrently. A chat's worker retires once its queue runs
//! dry; on shutdown every worker finishes what it already received.

use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use feeding_core::{
    ChatId, FeedingError, FeedingEvent, FeedingMachine, Keyboard, MessageId, Outcome, View,
};

use crate::inbound::{classify, Inbound, Origin, Request};
use crate::render::{self, CANCEL_ACCEPTED, FINISH_ACCEPTED};
use crate::telegram::types::Update;
use crate::telegram::TelegramChannel;

/// Pause after a failed getUpdates call.
pub const POLL_BACKOFF: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    machine: Arc<FeedingMachine>,
    telegram: Arc<TelegramChannel>,
    allowed_chats: HashSet<ChatId>,
    queues: DashMap<ChatId, mpsc::UnboundedSender<Inbound>>,
    workers: Mutex<JoinSet<()>>,
}

impl Dispatcher {
    pub fn new(
        machine: Arc<FeedingMachine>,
        telegram: Arc<TelegramChannel>,
        allowed_chats: &[i64],
    ) -> Self {
        Self {
            machine,
            telegram,
            allowed_chats: allowed_chats.iter().copied().map(ChatId).collect(),
            queues: DashMap::new(),
            workers: Mutex::new(JoinSet::new()),
        }
    }

    pub fn telegram(&self) -> &Arc<TelegramChannel> {
        &self.telegram
    }

    pub fn machine(&self) -> &Arc<FeedingMachine> {
        &self.machine
    }

    /// Chats with a live worker.
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// An empty whitelist admits every chat.
    pub fn is_allowed(&self, chat: ChatId) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat)
    }

    /// Handle one event to completion, including the reply to the actor.
    pub async fn handle(&self, inbound: Inbound) {
        let Inbound {
            chat,
            origin,
            request,
        } = inbound;

        let event = match request {
            Request::Help => {
                self.reply(chat, &render::render(&View::Help), Some(Keyboard::Start), None)
                    .await;
                return;
            }
            Request::Feeding(event) => event,
        };

        let label = event_label(&event);
        let result = self.machine.handle(chat, event).await;
        tracing::debug!(chat_id = %chat, event = label, ?result, "Feeding event handled");
        self.respond(chat, &origin, result).await;
    }

    async fn respond(&self, chat: ChatId, origin: &Origin, result: Result<Outcome, FeedingError>) {
        match (origin, result) {
            (Origin::Button { callback_id }, Ok(outcome)) => {
                let toast = match outcome {
                    Outcome::AwaitingEaten => Some(FINISH_ACCEPTED),
                    Outcome::Cancelled => Some(CANCEL_ACCEPTED),
                    _ => None,
                };
                self.answer(callback_id, toast, false).await;
            }
            (Origin::Button { callback_id }, Err(err)) => {
                self.answer(callback_id, Some(render::error_text(&err)), true)
                    .await;
            }
            (Origin::Command { message }, Err(err)) => {
                self.reply(chat, render::error_text(&err), None, Some(*message))
                    .await;
            }
            (Origin::Text { message }, Err(err @ FeedingError::InvalidInput)) => {
                self.reply(chat, render::error_text(&err), None, Some(*message))
                    .await;
            }
            (Origin::Text { .. }, Err(err)) => {
                tracing::debug!(chat_id = %chat, error = %err, "Text reply refused");
            }
            (Origin::Command { .. } | Origin::Text { .. }, Ok(_)) => {}
        }
    }

    async fn reply(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
        reply_to: Option<MessageId>,
    ) {
        if let Err(e) = self
            .telegram
            .send_message(chat, text, keyboard, reply_to)
            .await
        {
            tracing::warn!(chat_id = %chat, error = %e, "Failed to send reply");
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>, show_alert: bool) {
        if let Err(e) = self
            .telegram
            .answer_callback_query(callback_id, text, show_alert)
            .await
        {
            tracing::warn!(callback_id, error = %e, "Failed to answer callback query");
        }
    }

    /// Queue an event behind earlier events of the same chat.
    pub fn dispatch(self: &Arc<Self>, inbound: Inbound) {
        let chat = inbound.chat;
        if !self.is_allowed(chat) {
            tracing::debug!(chat_id = %chat, "Ignoring update from chat outside the whitelist");
            return;
        }

        // Send while holding the entry so a retiring worker cannot miss it.
        let mut sender = self
            .queues
            .entry(chat)
            .or_insert_with(|| self.spawn_worker(chat));
        if let Err(mpsc::error::SendError(inbound)) = sender.send(inbound) {
            tracing::warn!(chat_id = %chat, "Chat worker gone, restarting");
            let fresh = self.spawn_worker(chat);
            if fresh.send(inbound).is_err() {
                tracing::error!(chat_id = %chat, "Dropped update, chat worker unavailable");
            }
            *sender = fresh;
        }
    }

    fn spawn_worker(self: &Arc<Self>, chat: ChatId) -> mpsc::UnboundedSender<Inbound> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Inbound>();
        let dispatcher = Arc::clone(self);

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        while workers.try_join_next().is_some() {}
        workers.spawn(async move {
            while let Some(inbound) = rx.recv().await {
                dispatcher.handle(inbound).await;
                if rx.is_empty()
                    && dispatcher
                        .queues
                        .remove_if(&chat, |_, _| rx.is_empty())
                        .is_some()
                {
                    break;
                }
            }
            tracing::debug!(chat_id = %chat, "Chat worker stopped");
        });
        tx
    }

    /// Route one polled update. Button presses the bot cannot act on are
    /// still answered so the client stops its spinner.
    pub async fn handle_update(self: &Arc<Self>, update: Update) {
        let callback_id = update.callback_query.as_ref().map(|cb| cb.id.clone());
        match classify(update) {
            Some(inbound) => self.dispatch(inbound),
            None => {
                if let Some(callback_id) = callback_id {
                    self.answer(&callback_id, None, false).await;
                }
            }
        }
    }

    /// Wait for every chat worker to finish its queue.
    async fn drain_workers(&self) {
        // Dropping the senders ends each worker once its queue is empty.
        self.queues.clear();
        let mut workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));

        let pending = workers.len();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Chat worker failed");
            }
        }
        tracing::debug!(workers = pending, "Chat workers drained");
    }

    /// Long-poll for updates until `shutdown` resolves.
    pub async fn run_polling(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset: i64 = 0;

        tracing::info!("Telegram bot listening for updates...");

        loop {
            let polled = tokio::select! {
                () = &mut shutdown => break,
                polled = self.telegram.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram poll error");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
            }
        }

        self.drain_workers().await;
        tracing::info!(
            active_feedings = self.machine.store().active_count(),
            "Telegram bot stopped polling"
        );
    }
}

fn event_label(event: &FeedingEvent) -> &'static str {
    match event {
        FeedingEvent::Start { .. } => "start",
        FeedingEvent::Finish { .. } => "finish",
        FeedingEvent::Cancel { .. } => "cancel",
        FeedingEvent::TextReply { .. } => "text_reply",
    }
}
