//! Server configuration, `serde` + `toml` per the teacher's existing
//! idiom (§6, §10): `Config { server, limits }`, falling back to the
//! documented defaults when a key or the whole file is absent.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub bind_host: String,
    pub bind_port: u16,
    /// Leading characters that classify a target as a channel (§6).
    pub chantypes: String,
    pub motd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: "test.irc".to_string(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 6667,
            chantypes: "#&".to_string(),
            motd: "Welcome to the testnet, please don't break anything".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.chantypes.contains(c))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

/// Connection-size and flood tunables (§10). `max_message_length` is
/// enforced by [`crate::connection`]'s line decoder, which closes the
/// connection over [`crate::constants::BAD_LINE_BANNER`] on an oversized
/// line; `rate_capacity`/`rate_fill_interval_secs` configure its per-connection
/// token bucket.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_message_length: usize,
    pub rate_capacity: u32,
    pub rate_fill_interval_secs: u64,
}

impl LimitsConfig {
    pub fn rate_fill_interval(&self) -> Duration {
        Duration::from_secs(self.rate_fill_interval_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_message_length: 512,
            rate_capacity: 10,
            rate_fill_interval_secs: 1,
        }
    }
}

impl Config {
    /// Loads and parses the TOML configuration file; any field absent
    /// from the file falls back to its §6 default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_endpoint() {
        let config = Config::default();
        assert_eq!(config.server.name, "test.irc");
        assert_eq!(config.server.chantypes, "#&");
        assert_eq!(config.server.bind_addr(), "127.0.0.1:6667");
    }

    #[test]
    fn is_channel_checks_the_leading_byte() {
        let config = Config::default();
        assert!(config.server.is_channel("#general"));
        assert!(config.server.is_channel("&local"));
        assert!(!config.server.is_channel("nick"));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "myserver.test"
        "#,
        )
        .unwrap();
        assert_eq!(config.server.name, "myserver.test");
        assert_eq!(config.server.chantypes, "#&");
        assert_eq!(config.limits.max_message_length, 512);
    }
}
