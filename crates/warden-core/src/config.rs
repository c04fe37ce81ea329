use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::UserId, errors::Error, Result};

/// Typed configuration for the bot, loaded from the environment
/// (with optional `.env` support).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    /// The single distinguished identity with global administrative rights.
    pub owner_id: UserId,

    /// Path of the durable state snapshot.
    pub state_file: PathBuf,

    /// Auto-delete delay applied to chats without an explicit `/settimer`.
    pub default_delete_delay: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let owner_id = env_str("OWNER_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(UserId)
            .ok_or_else(|| {
                Error::Config("OWNER_ID environment variable is required (numeric user id)".to_string())
            })?;

        let state_file =
            env_path("STATE_FILE").unwrap_or_else(|| PathBuf::from("warden-state.json"));

        let default_delete_delay =
            Duration::from_secs(env_u64("DELETE_DELAY_MINUTES").unwrap_or(30) * 60);

        Ok(Self {
            telegram_bot_token,
            owner_id,
            state_file,
            default_delete_delay,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}
