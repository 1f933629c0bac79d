//! Telegram channel adapter.
//!
//! Provides the `TelegramChannel` implementation for receiving updates and
//! sending, editing and deleting messages through the Telegram Bot API.

pub mod types;

use async_trait::async_trait;
use feeding_common::TelegramConfig;
use feeding_core::{
    ChannelError, ChannelResult, ChatId, Keyboard, MemberRole, MembershipLookup, MessageId,
    Messenger, UserId, View,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::render;
use types::{ApiResponse, ChatMember, Update, User};

/// Telegram channel - long-polls the Bot API for updates.
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
    poll_timeout: Duration,
    request_timeout: Duration,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    pub fn new(config: &TelegramConfig) -> ChannelResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        Ok(Self {
            bot_token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Call a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> ChannelResult<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout
                } else {
                    ChannelError::Connection(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            ChannelError::InvalidResponse(format!("{method} returned {status}: {e}"))
        })?;

        if !envelope.ok {
            return Err(ChannelError::Api {
                method: method.to_string(),
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            });
        }

        envelope
            .result
            .ok_or_else(|| ChannelError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Verify the token and return the bot's own user.
    pub async fn get_me(&self) -> ChannelResult<User> {
        self.call("getMe", &serde_json::json!({}), self.request_timeout)
            .await
    }

    /// Send a text message, optionally with buttons and as a reply.
    pub async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
        reply_to: Option<MessageId>,
    ) -> ChannelResult<MessageId> {
        let mut body = serde_json::json!({
            "chat_id": chat.0,
            "text": text,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = render::reply_markup(kb);
        }
        if let Some(reply_to) = reply_to {
            body["reply_parameters"] = serde_json::json!({
                "message_id": reply_to.0,
                "allow_sending_without_reply": true
            });
        }

        let sent: types::Message = self.call("sendMessage", &body, self.request_timeout).await?;
        tracing::debug!(chat_id = %chat, message_id = sent.message_id, "Telegram message sent");
        Ok(MessageId(sent.message_id))
    }

    /// Edit the text of an existing message. Without a keyboard the buttons are removed.
    pub async fn edit_message_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> ChannelResult<()> {
        let mut body = serde_json::json!({
            "chat_id": chat.0,
            "message_id": message.0,
            "text": text,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = render::reply_markup(kb);
        }

        // Result is the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self
            .call("editMessageText", &body, self.request_timeout)
            .await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat: ChatId, message: MessageId) -> ChannelResult<()> {
        let body = serde_json::json!({
            "chat_id": chat.0,
            "message_id": message.0,
        });
        let _: bool = self.call("deleteMessage", &body, self.request_timeout).await?;
        Ok(())
    }

    /// Answer a callback query (acknowledge button click)
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> ChannelResult<()> {
        let mut body = serde_json::json!({
            "callback_query_id": callback_query_id,
            "show_alert": show_alert
        });
        if let Some(t) = text {
            body["text"] = serde_json::Value::String(t.to_string());
        }

        let _: bool = self
            .call("answerCallbackQuery", &body, self.request_timeout)
            .await?;
        Ok(())
    }

    pub async fn get_chat_member(&self, chat: ChatId, user: UserId) -> ChannelResult<MemberRole> {
        let body = serde_json::json!({
            "chat_id": chat.0,
            "user_id": user.0,
        });
        let member: ChatMember = self.call("getChatMember", &body, self.request_timeout).await?;
        Ok(member.status)
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> ChannelResult<Vec<Update>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"]
        });
        // The server holds the request for up to poll_timeout.
        self.call("getUpdates", &body, self.poll_timeout + self.request_timeout)
            .await
    }
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn send(&self, chat: ChatId, view: &View) -> ChannelResult<MessageId> {
        self.send_message(chat, &render::render(view), view.keyboard(), None)
            .await
    }

    async fn edit(&self, chat: ChatId, message: MessageId, view: &View) -> ChannelResult<()> {
        self.edit_message_text(chat, message, &render::render(view), view.keyboard())
            .await
    }

    async fn delete(&self, chat: ChatId, message: MessageId) -> ChannelResult<()> {
        self.delete_message(chat, message).await
    }
}

#[async_trait]
impl MembershipLookup for TelegramChannel {
    async fn member_role(&self, chat: ChatId, user: UserId) -> ChannelResult<MemberRole> {
        self.get_chat_member(chat, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(api_base: &str) -> TelegramChannel {
        let config = TelegramConfig {
            bot_token: "123:ABC".into(),
            api_base: api_base.into(),
            ..TelegramConfig::default()
        };
        TelegramChannel::new(&config).unwrap()
    }

    #[test]
    fn telegram_api_url() {
        let ch = channel("https://api.telegram.org");
        assert_eq!(
            ch.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn api_base_trailing_slash_is_dropped() {
        let ch = channel("http://127.0.0.1:8081/");
        assert_eq!(
            ch.api_url("sendMessage"),
            "http://127.0.0.1:8081/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn timeouts_come_from_config() {
        let ch = channel("https://api.telegram.org");
        assert_eq!(ch.request_timeout(), Duration::from_secs(10));
        assert_eq!(ch.poll_timeout, Duration::from_secs(30));
    }
}
