use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{errors::Error, Result};

const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Typed bot configuration, loaded once at startup and read-only afterwards.
///
/// The document uses upper-snake keys
/// (`PREFIX`, `OWNER_NUMBER`, ...). Transport secrets only come from the
/// environment.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(rename = "OWNER_NUMBER")]
    pub owner: String,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default = "default_quota")]
    pub max_commands_per_minute: u32,
    #[serde(default = "default_language")]
    pub language: String,

    // Presentation
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_bot_version")]
    pub bot_version: String,
    #[serde(default)]
    pub bot_number: String,

    // Files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_lang_dir")]
    pub lang_dir: PathBuf,

    // Transport
    #[serde(skip)]
    pub telegram_bot_token: Option<String>,
}

impl BotConfig {
    /// Load `.env` (if present), the config document and env overrides, then validate.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let path = env_path("BOT_CONFIG").unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut cfg = Self::from_file(&path)?;
        cfg.apply_env(|key| env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&txt).map_err(|e| match e {
            Error::Json(e) => Error::InvalidDocument {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => other,
        })
    }

    /// Language codes are normalized like pack file stems (trimmed, lower-cased).
    pub fn from_json_str(txt: &str) -> Result<Self> {
        let mut cfg: Self = serde_json::from_str(txt)?;
        cfg.language = normalize_language(&cfg.language);
        Ok(cfg)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = Some(token);
        }
        if let Some(dir) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("LANG_DIR") {
            self.lang_dir = PathBuf::from(dir);
        }
        if let Some(lang) = get("BOT_LANGUAGE") {
            self.language = normalize_language(&lang);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::Config("PREFIX must not be empty".to_string()));
        }
        if self.max_commands_per_minute < 1 {
            return Err(Error::Config(
                "MAX_COMMANDS_PER_MINUTE must be at least 1".to_string(),
            ));
        }
        if self.owner.trim().is_empty() {
            return Err(Error::Config("OWNER_NUMBER is required".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::Config("LANGUAGE must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn logs_file(&self) -> PathBuf {
        self.data_dir.join("logs.json")
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_quota() -> u32 {
    10
}

fn default_language() -> String {
    "en".to_string()
}

fn normalize_language(code: &str) -> String {
    code.trim().to_lowercase()
}

fn default_bot_name() -> String {
    "CmdBot".to_string()
}

fn default_bot_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_lang_dir() -> PathBuf {
    PathBuf::from("./lang")
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
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(v: &str) -> &str {
    let quoted = v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"'))
            || (v.starts_with('\'') && v.ends_with('\'')));
    if quoted {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
