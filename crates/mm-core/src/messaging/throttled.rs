use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{domain::MessageRef, messaging::port::ModerationPort, Result};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* moderation API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls for the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// ModerationPort decorator that spaces out outbound delete calls.
///
/// A burst of rejected messages (e.g. a spammer) would otherwise hit the
/// backend's flood limits. This does not guarantee zero 429s.
pub struct ThrottledModerator {
    inner: Arc<dyn ModerationPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledModerator {
    pub fn new(inner: Arc<dyn ModerationPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl ModerationPort for ThrottledModerator {
    async fn delete_message(&self, msg: MessageRef, reason: &str) -> Result<()> {
        self.throttle_chat(msg.chat_id.0).await;
        self.inner.delete_message(msg, reason).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId};

    #[derive(Default)]
    struct Recorder {
        calls: std::sync::Mutex<Vec<(MessageRef, String, Instant)>>,
    }

    #[async_trait::async_trait]
    impl ModerationPort for Recorder {
        async fn delete_message(&self, msg: MessageRef, reason: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((msg, reason.to_string(), Instant::now()));
            Ok(())
        }
    }

    fn msg_ref(chat: i64, id: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(chat),
            message_id: MessageId(id),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_deletes_in_same_chat() {
        let rec = Arc::new(Recorder::default());
        let throttled = ThrottledModerator::new(
            rec.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_chat_min_interval: Duration::from_millis(500),
            },
        );

        throttled.delete_message(msg_ref(-1, 1), "r").await.unwrap();
        throttled.delete_message(msg_ref(-1, 2), "r").await.unwrap();

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "r");
        let gap = calls[1].2.duration_since(calls[0].2);
        assert!(gap >= Duration::from_millis(500), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn other_chats_only_wait_for_global_slot() {
        let rec = Arc::new(Recorder::default());
        let throttled = ThrottledModerator::new(
            rec.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_chat_min_interval: Duration::from_millis(500),
            },
        );

        throttled.delete_message(msg_ref(-1, 1), "r").await.unwrap();
        throttled.delete_message(msg_ref(-2, 1), "r").await.unwrap();

        let calls = rec.calls.lock().unwrap();
        let gap = calls[1].2.duration_since(calls[0].2);
        assert!(gap < Duration::from_millis(500), "gap was {gap:?}");
    }
}
