//! Built-in low-level handlers (§4.8), grounded on the reference client's
//! `IRCHandler`: logging, PING/PONG, ISUPPORT (005) feature tracking, and
//! raising the higher-level `"message"` event for PRIVMSG.

use std::sync::Arc;

use irc_proto::{ICaseMap, Message};
use tokio::sync::Mutex;

use crate::client::Client;
use crate::event::ClientEvent;

/// Server-advertised features from `005 RPL_ISUPPORT`, shared so the rest
/// of the client can read what the server supports.
#[derive(Clone, Default)]
pub struct Features(pub Arc<Mutex<ICaseMap<String>>>);

impl Features {
    pub fn new() -> Self {
        Features(Arc::new(Mutex::new(ICaseMap::new())))
    }
}

/// Registers every built-in handler on `client`. Must be called once,
/// before `connect()`'s caller starts reading.
pub fn install(client: &mut Client, features: Features) {
    client
        .dispatcher
        .subscribe(Message::any(), |msg: &Message| {
            let msg = msg.clone();
            async move {
                log::debug!("<- {:?}", msg);
            }
        });

    let outbound_for_ping = client.outbound.clone();
    client
        .dispatcher
        .subscribe(Message::for_verb("PING"), move |msg: &Message| {
            let outbound = outbound_for_ping.clone();
            let token = msg.arg(0).map(|s| s.to_string()).unwrap_or_else(|| "PONG".to_string());
            async move {
                log::trace!("PING -> PONG ({token})");
                outbound.push(vec!["PONG".into(), token.into()]).await;
            }
        });

    let features_for_005 = features.clone();
    client
        .dispatcher
        .subscribe(Message::for_verb("005"), move |msg: &Message| {
            let features = features_for_005.clone();
            let params: Vec<String> = msg
                .args
                .iter()
                .skip(1)
                .map(|a| a.as_str().to_string())
                .collect();
            async move {
                let mut features = features.lock().await;
                for param in &params {
                    // the trailing ":are supported" arg itself isn't a
                    // key=value pair; skip anything without the shape.
                    if param.contains("are supported") {
                        continue;
                    }
                    match param.split_once('=') {
                        Some((k, v)) => {
                            features.insert(k.to_string(), v.to_string());
                        }
                        None => {
                            // a bare key (no `=`) is present with value `true` (§4.8).
                            features.insert(param.clone(), "true".to_string());
                        }
                    }
                }
            }
        });
}

/// Raises the `"message"` event for an inbound PRIVMSG.
pub async fn raise_message_event(client: &mut Client, msg: &Message) {
    if msg.verb_str() != Some("PRIVMSG") {
        return;
    }
    let Some(target) = msg.arg(0) else { return };
    let Some(text) = msg.arg(1) else { return };
    let event = ClientEvent::Message {
        raw: msg.clone(),
        prefix: msg.prefix.clone(),
        target: target.to_string(),
        text: text.to_string(),
    };
    client.events.fire("message", &event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    #[tokio::test]
    async fn ping_with_a_token_is_answered_with_the_same_token() {
        let mut client = Client::new("example.test", 6667, false);
        install(&mut client, Features::new());
        client
            .dispatcher
            .dispatch(&Message::new("PING", vec!["abc123".into()]))
            .await;
        let queued = client.outbound.drain().await;
        assert_eq!(queued, vec![vec!["PONG".into(), "abc123".into()]]);
    }

    #[tokio::test]
    async fn ping_with_no_token_falls_back_to_pong() {
        let mut client = Client::new("example.test", 6667, false);
        install(&mut client, Features::new());
        client.dispatcher.dispatch(&Message::new("PING", vec![])).await;
        let queued = client.outbound.drain().await;
        assert_eq!(queued, vec![vec!["PONG".into(), "PONG".into()]]);
    }

    #[tokio::test]
    async fn isupport_merges_key_value_pairs_and_true_for_bare_flags() {
        let mut client = Client::new("example.test", 6667, false);
        let features = Features::new();
        install(&mut client, features.clone());

        client
            .dispatcher
            .dispatch(&Message::new(
                "005",
                vec![
                    "nick".into(),
                    "CHANTYPES=#&".into(),
                    "EXCEPTS".into(),
                    "are supported by this server".into(),
                ],
            ))
            .await;

        let features = features.0.lock().await;
        assert_eq!(features.get("CHANTYPES"), Some(&"#&".to_string()));
        assert_eq!(features.get("EXCEPTS"), Some(&"true".to_string()));
        assert_eq!(features.get("are supported by this server"), None);
    }
}
