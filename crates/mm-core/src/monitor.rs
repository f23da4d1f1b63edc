//! Glue between the inbound feed, the validator and the moderation sink.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::DELETE_REASON,
    domain::ChatId,
    messaging::{
        port::{MessageSource, ModerationPort},
        types::IncomingMessage,
    },
    policy::Policy,
    validator::{self, Verdict},
};

pub struct Monitor {
    watched_chat: ChatId,
    policy: Arc<Policy>,
    moderator: Arc<dyn ModerationPort>,
    audit: Option<Arc<AuditLogger>>,
}

impl Monitor {
    pub fn new(
        watched_chat: ChatId,
        policy: Arc<Policy>,
        moderator: Arc<dyn ModerationPort>,
    ) -> Self {
        Self {
            watched_chat,
            policy,
            moderator,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn watched_chat(&self) -> ChatId {
        self.watched_chat
    }

    /// Drain `source` until it closes, handling messages in arrival order.
    pub async fn run<S: MessageSource>(&self, mut source: S) {
        info!(chat_id = self.watched_chat.0, "monitor started");
        while let Some(message) = source.next_message().await {
            self.handle(&message).await;
        }
        info!("message source closed, monitor stopping");
    }

    /// Evaluate one message; log the verdict; delete it if rejected.
    ///
    /// Returns `None` for messages outside the watched chat.
    pub async fn handle(&self, message: &IncomingMessage) -> Option<Verdict> {
        if message.msg.chat_id != self.watched_chat {
            debug!(
                chat_id = message.msg.chat_id.0,
                "ignoring message outside watched chat"
            );
            return None;
        }

        let stats = validator::tally(message, &self.policy);
        let verdict = stats.verdict();

        let author = message
            .author
            .as_ref()
            .map(|a| a.display())
            .unwrap_or_else(|| "unknown".to_string());
        let attachments = message.attachment_names().join(", ");
        if verdict.is_valid() {
            info!(
                chat_id = message.msg.chat_id.0,
                message_id = message.msg.message_id.0,
                author = %author,
                content = %message.content,
                attachments = %attachments,
                "message permitted"
            );
        } else {
            info!(
                chat_id = message.msg.chat_id.0,
                message_id = message.msg.message_id.0,
                author = %author,
                content = %message.content,
                attachments = %attachments,
                urls = stats.urls,
                valid_urls = stats.valid_urls,
                valid_attachments = stats.valid_attachments,
                "deleting message"
            );
        }

        let reason = (!verdict.is_valid()).then_some(DELETE_REASON);
        self.write_audit(AuditEvent::verdict(message, verdict, stats, reason));

        if let Some(reason) = reason {
            if let Err(e) = self.moderator.delete_message(message.msg, reason).await {
                warn!(
                    message_id = message.msg.message_id.0,
                    error = %e,
                    "failed to delete message"
                );
                self.write_audit(AuditEvent::delete_failed(message, &e.to_string()));
            }
        }

        Some(verdict)
    }

    /// Synchronous append on the handler task: one short line per message.
    fn write_audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            warn!(path = %audit.path().display(), error = %e, "failed to write audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        errors::Error,
        Result,
    };
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    const WATCHED: ChatId = ChatId(-1001);

    #[derive(Default)]
    struct FakeModerator {
        deleted: Mutex<Vec<(MessageRef, String)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ModerationPort for FakeModerator {
        async fn delete_message(&self, msg: MessageRef, reason: &str) -> Result<()> {
            if self.fail {
                return Err(Error::External("message can't be deleted".to_string()));
            }
            self.deleted.lock().unwrap().push((msg, reason.to_string()));
            Ok(())
        }
    }

    fn monitor(moderator: Arc<FakeModerator>) -> Monitor {
        let policy = Arc::new(Policy::new(["png", "gif"], ["youtube.com"]));
        Monitor::new(WATCHED, policy, moderator)
    }

    fn msg(chat: ChatId, id: i32, content: &str) -> IncomingMessage {
        IncomingMessage::new(
            MessageRef {
                chat_id: chat,
                message_id: MessageId(id),
            },
            content,
        )
    }

    fn tmp_file(prefix: &str) -> std::path::PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::path::PathBuf::from(format!("/tmp/{prefix}-{}-{ts}.log", std::process::id()))
    }

    #[tokio::test]
    async fn ignores_other_chats() {
        let fake = Arc::new(FakeModerator::default());
        let m = monitor(fake.clone());
        assert_eq!(m.handle(&msg(ChatId(42), 1, "hello friends")).await, None);
        assert!(fake.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deletes_rejected_with_fixed_reason() {
        let fake = Arc::new(FakeModerator::default());
        let m = monitor(fake.clone());
        let verdict = m.handle(&msg(WATCHED, 7, "hello friends")).await;
        assert_eq!(verdict, Some(Verdict::Rejected));

        let deleted = fake.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].0.message_id, MessageId(7));
        assert_eq!(deleted[0].1, "Not a link or media file");
    }

    #[tokio::test]
    async fn keeps_permitted_messages() {
        let fake = Arc::new(FakeModerator::default());
        let m = monitor(fake.clone());
        let link = msg(WATCHED, 1, "https://youtube.com/watch?v=1");
        let media = msg(WATCHED, 2, "").with_attachment("a.gif");
        assert_eq!(m.handle(&link).await, Some(Verdict::Permitted));
        assert_eq!(m.handle(&media).await, Some(Verdict::Permitted));
        assert!(fake.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_failure_is_audited_and_not_fatal() {
        let fake = Arc::new(FakeModerator {
            fail: true,
            ..Default::default()
        });
        let audit = Arc::new(AuditLogger::new(tmp_file("mm-monitor-fail"), true));
        let m = monitor(fake).with_audit(audit.clone());

        let verdict = m.handle(&msg(WATCHED, 3, "nope")).await;
        assert_eq!(verdict, Some(Verdict::Rejected));

        let written = std::fs::read_to_string(audit.path()).unwrap();
        let events: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "verdict");
        assert_eq!(events[0]["verdict"], "rejected");
        assert_eq!(events[1]["event"], "delete_failed");
        assert!(events[1]["error"]
            .as_str()
            .unwrap()
            .contains("can't be deleted"));

        let _ = std::fs::remove_file(audit.path());
    }

    #[tokio::test]
    async fn permitted_verdicts_are_audited_without_reason() {
        let fake = Arc::new(FakeModerator::default());
        let audit = Arc::new(AuditLogger::new(tmp_file("mm-monitor-ok"), true));
        let m = monitor(fake).with_audit(audit.clone());

        m.handle(&msg(WATCHED, 4, "")).await;

        let written = std::fs::read_to_string(audit.path()).unwrap();
        let ev: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(ev["verdict"], "permitted");
        assert!(ev.get("reason").is_none());
        assert_eq!(ev["stats"]["content_is_empty"], true);

        let _ = std::fs::remove_file(audit.path());
    }

    #[tokio::test]
    async fn run_drains_source_in_order() {
        let fake = Arc::new(FakeModerator::default());
        let m = monitor(fake.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send(msg(WATCHED, 1, "chatter")).await.unwrap();
        tx.send(msg(ChatId(5), 2, "elsewhere")).await.unwrap();
        tx.send(msg(WATCHED, 3, "https://youtube.com/x")).await.unwrap();
        tx.send(msg(WATCHED, 4, "more chatter")).await.unwrap();
        drop(tx);

        m.run(rx).await;

        let ids: Vec<i32> = fake
            .deleted
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.message_id.0)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }
}
