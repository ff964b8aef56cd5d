use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tally_core::{time::parse_timezone, Locale, SessionConfig};

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub chat: ChatSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub base_url: String,
    /// Streaming extraction endpoint
    pub chat_path: String,
    /// Usage quota endpoint consulted before local parses
    pub quota_path: String,
    pub timeout_secs: u64,
    pub tone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub locale: Locale,
    /// IANA name used to decide what "today" is
    pub timezone: String,
    /// Cooldown when a 429 carries no Retry-After
    pub default_cooldown_secs: u64,
    /// Past transactions consulted for category suggestions
    pub history_limit: usize,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            chat_path: "/api/chat".to_string(),
            quota_path: "/api/usage/consume".to_string(),
            timeout_secs: 30,
            tone: "friendly".to_string(),
        }
    }
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            timezone: "UTC".to_string(),
            default_cooldown_secs: 60,
            history_limit: 50,
        }
    }
}

impl RemoteSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Config {
    pub fn session_config(&self, user_id: &str, locale: Option<Locale>) -> Result<SessionConfig> {
        let timezone = parse_timezone(&self.chat.timezone)
            .with_context(|| format!("chat.timezone in {}", config_path_display()))?;
        Ok(SessionConfig {
            user_id: user_id.to_string(),
            locale: locale.unwrap_or(self.chat.locale),
            tone: self.remote.tone.clone(),
            timezone,
            default_cooldown_secs: self.chat.default_cooldown_secs,
        })
    }
}

fn config_path_display() -> String {
    config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "config.toml".to_string())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: Config = toml::from_str("[remote]\nbase_url = \"https://api.example.com/\"\n").unwrap();
        assert_eq!(cfg.remote.chat_path, "/api/chat");
        assert_eq!(cfg.remote.url("/api/chat"), "https://api.example.com/api/chat");
        assert_eq!(cfg.remote.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.chat.default_cooldown_secs, 60);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.chat.locale, Locale::En);
        assert_eq!(back.remote.tone, "friendly");
    }

    #[test]
    fn test_session_config_locale_override() {
        let mut cfg = Config::default();
        cfg.chat.timezone = "Europe/Kyiv".to_string();
        let s = cfg.session_config("u1", Some(Locale::Uk)).unwrap();
        assert_eq!(s.locale, Locale::Uk);
        assert_eq!(s.timezone, chrono_tz::Europe::Kyiv);

        cfg.chat.timezone = "Mars/Base".to_string();
        assert!(cfg.session_config("u1", None).is_err());
    }
}
