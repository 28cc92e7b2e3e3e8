//! `register`/`join`/`say` (§4.9), grounded on the reference client's
//! `IRCClient.register`/`join`/`say`, including the exact
//! `join_max_length` chunking algorithm from its `utils.py`.

use irc_proto::{ICaseStr, Message, join_max_length};

use crate::cap::CapNegotiator;
use crate::client::Client;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::handlers::{self, Features};

/// Bundles the low-level [`Client`] with capability negotiation and
/// ISUPPORT feature tracking, the way the reference client wraps an
/// `IRCConnection` with `cap`/`sasl`/`state` extensions.
pub struct Session {
    pub client: Client,
    pub caps: CapNegotiator,
    pub features: Features,
}

impl Session {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        let client = Client::new(host, port, tls);
        Self::wrap(client)
    }

    /// As [`Session::new`], but takes connection settings and rate-limiter
    /// overrides from a loaded [`ClientConfig`] (§3).
    pub fn from_config(config: &ClientConfig) -> Self {
        let client = Client::from_config(config);
        Self::wrap(client)
    }

    fn wrap(mut client: Client) -> Self {
        let caps = CapNegotiator::new();
        let features = Features::new();

        caps.register_with(&mut client.dispatcher);
        handlers::install(&mut client, features.clone());

        Session {
            client,
            caps,
            features,
        }
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.client.connect().await
    }

    /// Registers using the `nick`/`user`/`realname`/`password` carried by
    /// a loaded [`ClientConfig`], per §4.9.
    pub async fn register_from_config(&mut self, config: &ClientConfig) -> Result<(), ClientError> {
        self.register(
            &config.nick,
            &config.user,
            &config.realname,
            config.password.as_deref(),
        )
        .await
    }

    /// Requests capability `cap`, per §4.6.
    pub async fn req_cap(&mut self, cap: &str) -> Result<bool, ClientError> {
        self.caps.req(&mut self.client, cap).await
    }

    /// SASL PLAIN authentication (§4.7). Precondition: `req_cap("sasl")`
    /// already returned `true`.
    pub async fn authenticate_plain(&mut self, user: &str, password: &str) -> Result<(), ClientError> {
        crate::sasl::authenticate_plain(&mut self.client, user, password).await
    }

    /// Sends `CAP END`, optional `PASS`, `NICK`, `USER`, and waits for
    /// `001 RPL_WELCOME`.
    pub async fn register(
        &mut self,
        nick: &str,
        user: &str,
        realname: &str,
        password: Option<&str>,
    ) -> Result<(), ClientError> {
        self.caps.end(&mut self.client).await?;

        if let Some(password) = password {
            self.client
                .conn
                .send(vec!["PASS".into(), password.into()])
                .await?;
        }
        self.client.conn.send(vec!["NICK".into(), nick.into()]).await?;
        self.client
            .conn
            .send(vec![
                "USER".into(),
                user.into(),
                user.into(),
                user.into(),
                realname.into(),
            ])
            .await?;

        self.client
            .match_patterns(&[Message::for_verb("001")])
            .await?;
        Ok(())
    }

    /// Joins `channels`, chunking `JOIN` frames so each stays at or under
    /// 400 bytes, then waits until a `JOIN` frame naming each channel has
    /// been observed.
    pub async fn join(&mut self, channels: &[&str]) -> Result<(), ClientError> {
        let mut remaining: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        while !remaining.is_empty() {
            let (current, rest) = join_max_length(&remaining, ",", 400);
            remaining = rest;
            self.client
                .conn
                .send(vec!["JOIN".into(), current.into()])
                .await?;
        }

        let mut not_joined: std::collections::HashSet<ICaseStr> =
            channels.iter().map(|c| ICaseStr::from(*c)).collect();
        while !not_joined.is_empty() {
            let msg = self
                .client
                .match_patterns(&[Message::for_verb("JOIN")])
                .await?;
            if let Some(joined) = msg.args.first() {
                not_joined.remove(joined);
            }
        }
        Ok(())
    }

    /// Sends `text` to `dest`, splitting into `PRIVMSG` frames of at most
    /// 350 bytes each. Splits on whitespace when every word is under 350
    /// bytes, else falls back to a raw character split.
    pub async fn say(&mut self, dest: &str, text: &str) -> Result<(), ClientError> {
        let words: Vec<&str> = text.split(' ').collect();
        if words.iter().all(|w| w.len() < 350) {
            let mut remaining: Vec<String> = words.iter().map(|w| w.to_string()).collect();
            while !remaining.is_empty() {
                let (current, rest) = join_max_length(&remaining, " ", 350);
                remaining = rest;
                self.send_privmsg(dest, &current).await?;
            }
        } else {
            let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
            let mut remaining = chars;
            while !remaining.is_empty() {
                let (current, rest) = join_max_length(&remaining, "", 350);
                remaining = rest;
                self.send_privmsg(dest, &current).await?;
            }
        }
        Ok(())
    }

    async fn send_privmsg(&mut self, dest: &str, text: &str) -> Result<(), ClientError> {
        self.client
            .send_limited(vec!["PRIVMSG".into(), dest.into(), text.into()])
            .await
    }
}
