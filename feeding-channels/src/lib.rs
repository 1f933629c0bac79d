//! Feeding Channels - the Telegram gateway of the feeding bot.
//!
//! ## Architecture
//!
//! ```text
//! getUpdates → classify → per-chat queue → Dispatcher → FeedingMachine
//!                                              │              │
//!                    answerCallbackQuery ◄─────┘              ▼
//!                    sendMessage (errors, help)     TelegramChannel (Messenger)
//! ```
//!
//! The same [`TelegramChannel`] serves as the machine's [`feeding_core::Messenger`]
//! and as the membership lookup behind its permission checks.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dispatcher;
pub mod inbound;
pub mod render;
pub mod telegram;

pub use dispatcher::Dispatcher;
pub use inbound::{classify, Inbound, Origin, Request};
pub use telegram::TelegramChannel;

use std::sync::Arc;

use feeding_common::config::Config;
use feeding_core::{Clock, FeedingMachine, PermissionOracle, SessionStore, SystemClock};

/// Wire the gateway and the state machine together.
pub fn build_dispatcher(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<Dispatcher>> {
    let telegram = Arc::new(TelegramChannel::new(&config.telegram)?);
    let timeout = telegram.request_timeout();

    let oracle = PermissionOracle::new(telegram.clone(), timeout);
    let machine = FeedingMachine::new(
        Arc::new(SessionStore::new()),
        oracle,
        clock,
        telegram.clone(),
    )
    .with_io_timeout(timeout);

    Ok(Arc::new(Dispatcher::new(
        Arc::new(machine),
        telegram,
        &config.telegram.allowed_chats,
    )))
}

/// Run the bot until Ctrl-C.
pub async fn start_bot(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let clock = Arc::new(SystemClock::new(config.clock.offset()?));
    let dispatcher = build_dispatcher(config, clock)?;

    let me = dispatcher.telegram().get_me().await?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        utc_offset = %config.clock.utc_offset,
        allowed_chats = config.telegram.allowed_chats.len(),
        "Connected to Telegram"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    dispatcher.run_polling(shutdown).await;
    Ok(())
}
