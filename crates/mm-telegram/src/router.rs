use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::sync::mpsc;
use tracing::{info, warn};

use mm_core::{
    audit::AuditLogger,
    config::Config,
    messaging::{
        port::ModerationPort,
        throttled::{ThrottleConfig, ThrottledModerator},
        types::IncomingMessage,
    },
    monitor::Monitor,
};

use crate::{convert::incoming_from_telegram, TelegramModerator};

/// Connect to Telegram and moderate the watched chat until Ctrl-C.
pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(bot = %me.username(), "connected to telegram"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        chat_id = cfg.channel_id.0,
        extensions = cfg.policy.permitted_extensions().count(),
        domains = cfg.policy.permitted_domains().len(),
        "watching chat"
    );
    if cfg.policy.permitted_extensions().next().is_none() {
        warn!("no permitted file extensions configured; every attachment will be deleted");
    }
    if cfg.policy.permitted_domains().is_empty() {
        warn!("no permitted domains configured; every link will be deleted");
    }

    // Space out deletes so a flood of rejected messages does not trip 429s.
    // RetryAfter is still retried once at the adapter layer.
    let raw: Arc<dyn ModerationPort> = Arc::new(TelegramModerator::new(bot.clone()));
    let moderator: Arc<dyn ModerationPort> = Arc::new(ThrottledModerator::new(
        raw,
        ThrottleConfig {
            per_chat_min_interval: cfg.delete_min_interval,
            ..ThrottleConfig::default()
        },
    ));

    let mut monitor = Monitor::new(cfg.channel_id, Arc::new(cfg.policy.clone()), moderator);
    if let Some(path) = &cfg.audit_log_path {
        monitor = monitor.with_audit(Arc::new(AuditLogger::new(path, cfg.audit_log_json)));
    }

    let (tx, rx) = mpsc::channel::<IncomingMessage>(cfg.queue_capacity);
    let worker = tokio::spawn(async move { monitor.run(rx).await });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(forward_message))
        .branch(Update::filter_channel_post().endpoint(forward_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // The dispatcher owned the last sender; the worker finishes the backlog and exits.
    worker.await?;
    info!("shut down");
    Ok(())
}

async fn forward_message(msg: Message, tx: mpsc::Sender<IncomingMessage>) -> ResponseResult<()> {
    if tx.send(incoming_from_telegram(&msg)).await.is_err() {
        warn!(message_id = msg.id.0, "monitor stopped; dropping message");
    }
    Ok(())
}
