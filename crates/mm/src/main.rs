use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use mm_core::config::Config;

/// Delete messages in a Telegram chat that are not permitted media or links.
#[derive(Debug, Parser)]
#[command(name = "mm", version)]
struct Args {
    /// Dotenv-style config file (defaults to ./.env when present).
    config: Option<PathBuf>,
}

fn main() -> Result<(), mm_core::Error> {
    let args = Args::parse();
    mm_core::logging::init("mm")?;

    // Config loading may set env vars, so it runs before the runtime spawns workers.
    let cfg = Arc::new(Config::load(args.config.as_deref())?);
    tracing::debug!(config = ?cfg, "configuration loaded");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(mm_telegram::router::run_polling(cfg))
        .map_err(|e| mm_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
