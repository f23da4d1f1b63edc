use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::ChatId, errors::Error, policy::Policy, Result};

/// Fixed justification attached to every deletion.
pub const DELETE_REASON: &str = "Not a link or media file";

/// Typed configuration for the monitor.
///
/// Everything is read once at startup; the resulting `policy` is immutable.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub channel_id: ChatId,
    pub policy: Policy,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,

    // Runtime
    pub delete_min_interval: Duration,
    pub queue_capacity: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("policy", &self.policy)
            .field("audit_log_path", &self.audit_log_path)
            .field("audit_log_json", &self.audit_log_json)
            .field("delete_min_interval", &self.delete_min_interval)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    ///
    /// `config_file` is a dotenv-style file whose entries fill in variables not
    /// already set. When `None`, `./.env` is used if present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "config file does not exist: {}",
                        path.display()
                    )));
                }
                load_dotenv(path)?;
            }
            None => {
                let default = Path::new(".env");
                if default.is_file() {
                    load_dotenv(default)?;
                }
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;

        let channel_raw = lookup("CHANNEL_ID").and_then(non_empty).ok_or_else(|| {
            Error::Config("CHANNEL_ID environment variable is required".to_string())
        })?;
        let channel_id = channel_raw
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| Error::Config(format!("CHANNEL_ID is not a chat id ({channel_raw}): {e}")))?;

        // Both lists must be present; an empty list is allowed.
        let extensions = lookup("VALID_FILE_EXTENSIONS").ok_or_else(|| {
            Error::Config("VALID_FILE_EXTENSIONS environment variable is required".to_string())
        })?;
        let domains = lookup("VALID_DOMAIN_NAMES").ok_or_else(|| {
            Error::Config("VALID_DOMAIN_NAMES environment variable is required".to_string())
        })?;
        let policy = Policy::new(parse_csv(&extensions), parse_csv(&domains));

        let audit_log_path = lookup("AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let audit_log_json = lookup("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        let delete_min_interval = Duration::from_millis(
            lookup("DELETE_MIN_INTERVAL_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1050),
        );
        let queue_capacity = lookup("QUEUE_CAPACITY")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(256);

        Ok(Self {
            bot_token,
            channel_id,
            policy,
            audit_log_path,
            audit_log_json,
            delete_min_interval,
            queue_capacity,
        })
    }
}

/// Set every variable from `path` that is not already in the environment.
///
/// Must run before any other thread reads the environment (i.e. before the
/// async runtime starts).
fn load_dotenv(path: &Path) -> Result<()> {
    for (key, val) in read_dotenv(path)? {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
    Ok(())
}

fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    iter.map(|item| {
        item.map_err(|e| Error::Config(format!("invalid entry in {}: {e}", path.display())))
    })
    .collect()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
