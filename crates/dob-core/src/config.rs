use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, executor::ExecutorConfig, registry::CommandId, Result};

/// Placeholder shipped in sample env files; treated the same as a missing token.
pub const PLACEHOLDER_TOKEN: &str = "your_bot_token_here";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Logging
    pub log_file: PathBuf,
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Executor policy
    pub executor: ExecutorConfig,
}

impl Config {
    /// Load from the process environment (after `.env`, which never overrides
    /// variables that are already set).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let src = Source(&lookup);

        let telegram_bot_token = src.str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let token = telegram_bot_token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is not set".to_string(),
            ));
        }

        let log_file = src
            .path("LOG_FILE")
            .unwrap_or_else(|| PathBuf::from("bot.log"));
        let audit_log_path = src
            .path("AUDIT_LOG_PATH")
            .unwrap_or_else(|| env::temp_dir().join("dark-ops-bot-audit.log"));
        let audit_log_json = src.bool("AUDIT_LOG_JSON").unwrap_or(false);

        let defaults = ExecutorConfig::default();
        let instant_deadline = src
            .u64("INSTANT_OPERATION_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.instant_deadline);
        let file_deadline = src
            .u64("FILE_OPERATION_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.file_deadline);
        let cancel_grace = src
            .u64("CANCEL_GRACE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.cancel_grace);
        // 0 (or unset) means no global cap.
        let max_in_flight = src.u64("MAX_IN_FLIGHT").filter(|n| *n > 0).map(|n| n as usize);
        let shards = src
            .u64("ACTIVE_TABLE_SHARDS")
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(defaults.shards);

        let mut deadline_overrides = HashMap::new();
        for id in CommandId::ALL {
            let key = format!("DEADLINE_{}_SECS", id.as_str().to_uppercase());
            if let Some(secs) = src.u64(&key) {
                deadline_overrides.insert(id, Duration::from_secs(secs));
            }
        }

        Ok(Self {
            telegram_bot_token: token.to_string(),
            log_file,
            audit_log_path,
            audit_log_json,
            executor: ExecutorConfig {
                instant_deadline,
                file_deadline,
                deadline_overrides,
                cancel_grace,
                max_in_flight,
                shards,
            },
        })
    }
}

struct Source<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Source<'_> {
    fn str(&self, key: &str) -> Option<String> {
        (self.0)(key).and_then(non_empty)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.str(key).map(|s| {
            matches!(
                s.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn u64(&self, key: &str) -> Option<u64> {
        self.str(key).and_then(|s| s.trim().parse::<u64>().ok())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.str(key).map(PathBuf::from)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        out.push((key.to_string(), val.to_string()));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
