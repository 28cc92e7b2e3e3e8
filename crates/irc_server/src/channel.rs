//! Channel record and set (§3 "Channel"), grounded on the teacher's
//! `channels.rs`/`channels_models.rs` shape but rebuilt around a
//! `tokio::sync::broadcast` fan-out per §5: "each channel holds a
//! `tokio::sync::broadcast::Sender<BroadcastMessage>` that new members
//! subscribe a receiver to".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};

use irc_proto::ICaseStr;

use crate::client::ClientId;

/// Per-member channel mode flags; only `o` (operator) is assigned today
/// (§3: "the first member receives operator status").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub operator: bool,
}

/// One line fanned out to every subscribed member. `except` lets the
/// sender's own connection skip re-delivering its own line (the
/// "broadcast exclusion" property in §8).
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub line: String,
    pub except: Option<ClientId>,
}

pub struct Channel {
    pub name: ICaseStr,
    pub created_at: SystemTime,
    pub topic: Option<String>,
    pub topic_set_by: Option<String>,
    pub topic_set_at: Option<SystemTime>,
    pub members: HashMap<ClientId, ModeFlags>,
    pub modes: HashMap<char, Option<String>>,
    sender: broadcast::Sender<BroadcastMessage>,
}

impl Channel {
    fn new(name: ICaseStr) -> Self {
        let (sender, _) = broadcast::channel(256);
        Channel {
            name,
            created_at: SystemTime::now(),
            topic: None,
            topic_set_by: None,
            topic_set_at: None,
            members: HashMap::new(),
            modes: HashMap::new(),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    /// Sends `line` to every current subscriber except `except`'s own
    /// connection. A lagging/dropped receiver is the receiving side's
    /// problem (§5: "a lagging receiver is treated as a slow-consumer
    /// disconnect"), so send errors here (no subscribers left) are ignored.
    pub fn broadcast(&self, line: String, except: Option<ClientId>) {
        let _ = self.sender.send(BroadcastMessage { line, except });
    }

    /// Adds `id` as a member, granting operator status if it is the first
    /// one in (§3).
    pub fn add_member(&mut self, id: ClientId) -> ModeFlags {
        let flags = ModeFlags {
            operator: self.members.is_empty(),
        };
        self.members.insert(id, flags.clone());
        flags
    }

    pub fn remove_member(&mut self, id: ClientId) {
        self.members.remove(&id);
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub type ChannelHandle = Arc<RwLock<Channel>>;

/// Owns every channel, keyed by its case-folded name (§5: the channel set
/// lives behind a concurrent map so broadcasting from one connection never
/// blocks another).
#[derive(Default)]
pub struct ChannelSet {
    channels: DashMap<ICaseStr, ChannelHandle>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &ICaseStr) -> Option<ChannelHandle> {
        self.channels.get(name).map(|entry| entry.clone())
    }

    pub fn get_or_create(&self, name: &ICaseStr) -> ChannelHandle {
        self.channels
            .entry(name.clone())
            .or_insert_with(|| Arc::new(RwLock::new(Channel::new(name.clone()))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_member_becomes_operator() {
        let mut channel = Channel::new(ICaseStr::from("#test"));
        let a = ClientId::new();
        let b = ClientId::new();
        assert!(channel.add_member(a).operator);
        assert!(!channel.add_member(b).operator);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let channel = Channel::new(ICaseStr::from("#test"));
        let mut r1 = channel.subscribe();
        let mut r2 = channel.subscribe();
        channel.broadcast("hi".to_string(), None);
        assert_eq!(r1.recv().await.unwrap().line, "hi");
        assert_eq!(r2.recv().await.unwrap().line, "hi");
    }
}
