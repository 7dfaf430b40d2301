use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, messaging::types::ParseMode, Result};

const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CALLBACK_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_UPDATE_BUFFER: usize = 100;

/// Typed configuration for the bridge.
///
/// Nothing here is persisted: the resume offset and poll timeout are supplied
/// by the caller on every start.
#[derive(Clone, Debug)]
pub struct Config {
    /// Token issued by BotFather.
    pub telegram_bot_token: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub update_timeout: Duration,
    /// First update id to fetch; 0 means "whatever Telegram has pending".
    pub update_resume_from: i32,
    /// Formatting applied to outgoing text.
    pub parse_mode: ParseMode,
    /// How long a button's callback stays registered.
    pub callback_ttl: Duration,
    /// Capacity of the channel between the poller and the dispatch loop.
    pub update_buffer: usize,
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            telegram_bot_token: token.into(),
            update_timeout: Duration::from_secs(DEFAULT_UPDATE_TIMEOUT_SECS),
            update_resume_from: 0,
            parse_mode: ParseMode::Plain,
            callback_ttl: Duration::from_secs(DEFAULT_CALLBACK_TTL_SECS),
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    pub fn with_update_resume_from(mut self, update_id: i32) -> Self {
        self.update_resume_from = update_id;
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn with_callback_ttl(mut self, ttl: Duration) -> Self {
        self.callback_ttl = ttl;
        self
    }

    pub fn with_update_buffer(mut self, capacity: usize) -> Self {
        self.update_buffer = capacity.max(1);
        self
    }

    /// Load from the environment, after merging `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"))?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = get("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let mut cfg = Self::new(token.trim());

        if let Some(secs) = parse_num::<u64>(&get, "TELEGRAM_UPDATE_TIMEOUT_SECS")? {
            cfg = cfg.with_update_timeout(Duration::from_secs(secs));
        }
        if let Some(id) = parse_num::<i32>(&get, "TELEGRAM_UPDATE_RESUME_FROM")? {
            cfg = cfg.with_update_resume_from(id);
        }
        if let Some(mode) = get("TELEGRAM_PARSE_MODE") {
            cfg = cfg.with_parse_mode(mode.parse()?);
        }
        if let Some(secs) = parse_num::<u64>(&get, "CALLBACK_TTL_SECS")? {
            cfg = cfg.with_callback_ttl(Duration::from_secs(secs));
        }
        if let Some(cap) = parse_num::<usize>(&get, "UPDATE_BUFFER")? {
            cfg = cfg.with_update_buffer(cap);
        }

        Ok(cfg)
    }
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a number, got {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
    Ok(())
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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
