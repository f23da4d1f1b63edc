use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{domain::MessageRef, messaging::types::IncomingMessage, Result};

/// Outbound moderation port.
///
/// Telegram is the first implementation; other backends fit behind the same
/// interface. `reason` is attached to the deletion where the backend supports
/// it and logged otherwise.
#[async_trait]
pub trait ModerationPort: Send + Sync {
    async fn delete_message(&self, msg: MessageRef, reason: &str) -> Result<()>;
}

/// Inbound message feed.
///
/// Yields `None` once the feed is closed.
#[async_trait]
pub trait MessageSource: Send {
    async fn next_message(&mut self) -> Option<IncomingMessage>;
}

#[async_trait]
impl MessageSource for mpsc::Receiver<IncomingMessage> {
    async fn next_message(&mut self) -> Option<IncomingMessage> {
        self.recv().await
    }
}
