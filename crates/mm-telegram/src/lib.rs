//! Telegram adapter (teloxide).
//!
//! Converts incoming updates into [`IncomingMessage`]s and implements the
//! `mm-core` [`ModerationPort`] over the Telegram Bot API.
//!
//! [`IncomingMessage`]: mm_core::messaging::types::IncomingMessage

use async_trait::async_trait;

use teloxide::{prelude::*, ApiError, RequestError};

use tokio::time::sleep;
use tracing::debug;

pub mod convert;
pub mod router;

use mm_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::port::ModerationPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramModerator {
    bot: Bot,
}

impl TelegramModerator {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(RequestError::RetryAfter(secs)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(secs).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[async_trait]
impl ModerationPort for TelegramModerator {
    async fn delete_message(&self, msg: MessageRef, reason: &str) -> Result<()> {
        let res = self
            .with_retry(|| {
                self.bot
                    .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            })
            .await;

        match res {
            // The Bot API has no audit reason; it only goes to our log.
            Ok(_) => {
                debug!(
                    chat_id = msg.chat_id.0,
                    message_id = msg.message_id.0,
                    reason,
                    "message deleted"
                );
                Ok(())
            }
            Err(RequestError::Api(ApiError::MessageToDeleteNotFound)) => {
                debug!(message_id = msg.message_id.0, "message already gone");
                Ok(())
            }
            Err(e) => Err(Self::map_err(e)),
        }
    }
}
