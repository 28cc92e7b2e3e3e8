//! Client connection config, loaded the same way the server loads its
//! own (`serde` + `toml`), per §3/§6's defaults.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Mirrors the server's `Config { server, limits }` shape (§3: "mirroring
/// the server's config shape so both crates read TOML the same way").
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_tls")]
    pub tls: bool,
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Rate-limiter overrides (§4.5 defaults: capacity 4, refill every 2s).
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,
    #[serde(default = "default_rate_fill_interval_secs")]
    pub rate_fill_interval_secs: u64,
}

fn default_host() -> String {
    "chat.freenode.net".to_string()
}

fn default_port() -> u16 {
    6697
}

fn default_tls() -> bool {
    true
}

fn default_nick() -> String {
    "irc_client".to_string()
}

fn default_user() -> String {
    "irc_client".to_string()
}

fn default_realname() -> String {
    "irc_client".to_string()
}

fn default_rate_capacity() -> u32 {
    crate::ratelimit::DEFAULT_CAPACITY
}

fn default_rate_fill_interval_secs() -> u64 {
    crate::ratelimit::DEFAULT_FILL_INTERVAL.as_secs()
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: default_host(),
            port: default_port(),
            tls: default_tls(),
            nick: default_nick(),
            user: default_user(),
            realname: default_realname(),
            password: None,
            rate_capacity: default_rate_capacity(),
            rate_fill_interval_secs: default_rate_fill_interval_secs(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn rate_fill_interval(&self) -> Duration {
        Duration::from_secs(self.rate_fill_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_endpoint() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "chat.freenode.net");
        assert_eq!(config.port, 6697);
        assert!(config.tls);
        assert_eq!(config.rate_capacity, 4);
        assert_eq!(config.rate_fill_interval_secs, 2);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: ClientConfig = toml::from_str(r#"host = "irc.example.org""#).unwrap();
        assert_eq!(config.host, "irc.example.org");
        assert_eq!(config.port, 6697);
        assert!(config.tls);
        assert_eq!(config.nick, "irc_client");
    }

    #[test]
    fn full_toml_overrides_every_field() {
        let config: ClientConfig = toml::from_str(
            r#"
            host = "irc.example.org"
            port = 6667
            tls = false
            nick = "bot"
            user = "bot"
            realname = "A Bot"
            password = "hunter2"
            rate_capacity = 8
            rate_fill_interval_secs = 1
        "#,
        )
        .unwrap();
        assert_eq!(config.nick, "bot");
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.rate_capacity, 8);
    }
}
