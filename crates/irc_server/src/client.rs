//! Server-side client record (§3 "Server-side Client record") and the
//! manager that owns every connected client, grounded on the teacher's
//! `dashmap`-based server state (`server_state.rs`) generalized from a
//! single global table to a typed manager.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use irc_proto::ICaseStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        ClientId(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable per-client state. Reachable from other connections' tasks (e.g.
/// to build a `NAMES` listing or a `NICK` hostmask), so it lives behind a
/// `RwLock` rather than being owned outright by its connection task.
#[derive(Debug)]
pub struct ClientData {
    pub id: ClientId,
    pub peer_host: String,
    pub nick: Option<ICaseStr>,
    pub ident: Option<String>,
    pub realname: Option<String>,
    pub modes: HashSet<char>,
    pub channels: HashSet<ICaseStr>,
    pub registered: bool,
    nick_done: bool,
    user_done: bool,
    pub outbound: mpsc::UnboundedSender<String>,
}

impl ClientData {
    fn new(peer_host: String, outbound: mpsc::UnboundedSender<String>) -> Self {
        ClientData {
            id: ClientId::new(),
            peer_host,
            nick: None,
            ident: None,
            realname: None,
            modes: HashSet::new(),
            channels: HashSet::new(),
            registered: false,
            nick_done: false,
            user_done: false,
            outbound,
        }
    }

    /// Current hostmask, e.g. `nick!ident@peer_host`. Falls back to `*` for
    /// any piece not yet known, which should only happen pre-registration.
    pub fn hostmask(&self) -> String {
        format!(
            "{}!{}@{}",
            self.nick_str(),
            self.ident.as_deref().unwrap_or("*"),
            self.peer_host
        )
    }

    pub fn nick_str(&self) -> &str {
        self.nick.as_ref().map(ICaseStr::as_str).unwrap_or("*")
    }

    pub fn send_line(&self, line: String) {
        let _ = self.outbound.send(line);
    }

    /// Marks the `NICK` step complete. Returns `true` the moment both
    /// registration steps have fired (§3 "registered=true once both
    /// nick_done and user_done have fired").
    pub fn complete_nick(&mut self) -> bool {
        self.nick_done = true;
        self.maybe_register()
    }

    pub fn complete_user(&mut self) -> bool {
        self.user_done = true;
        self.maybe_register()
    }

    fn maybe_register(&mut self) -> bool {
        if !self.registered && self.nick_done && self.user_done {
            self.registered = true;
            true
        } else {
            false
        }
    }
}

pub type ClientHandle = Arc<RwLock<ClientData>>;

/// Owns every connected client's record plus the nick → id lookup,
/// generalizing the teacher's single global `DashMap` into a typed table
/// shared across per-connection tasks without a lock around the whole
/// thing (§5 "Cross-connection shared state... lives behind concurrent
/// maps").
#[derive(Default)]
pub struct ClientManager {
    clients: DashMap<ClientId, ClientHandle>,
    nicks: DashMap<ICaseStr, ClientId>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer_host: String, outbound: mpsc::UnboundedSender<String>) -> ClientHandle {
        let data = ClientData::new(peer_host, outbound);
        let id = data.id;
        let handle = Arc::new(RwLock::new(data));
        self.clients.insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: ClientId) -> Option<ClientHandle> {
        self.clients.get(&id).map(|entry| entry.clone())
    }

    pub fn nick_taken(&self, nick: &ICaseStr) -> bool {
        self.nicks.contains_key(nick)
    }

    pub fn by_nick(&self, nick: &ICaseStr) -> Option<ClientId> {
        self.nicks.get(nick).map(|entry| *entry)
    }

    /// Records `id` under `nick`, evicting any previous nick this client
    /// held.
    pub fn set_nick(&self, id: ClientId, old: Option<&ICaseStr>, new: ICaseStr) {
        if let Some(old) = old {
            self.nicks.remove(old);
        }
        self.nicks.insert(new, id);
    }

    /// Removes the client on disconnect (§3: "destroyed on EOF, QUIT, or
    /// write error; destruction removes it from the manager").
    pub fn remove(&self, id: ClientId, nick: Option<&ICaseStr>) {
        self.clients.remove(&id);
        if let Some(nick) = nick {
            self.nicks.remove(nick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registration_completes_only_once_both_steps_fire() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut data = ClientData::new("host".to_string(), tx);
        assert!(!data.complete_nick());
        assert!(data.complete_user());
        assert!(data.registered);
    }

    #[tokio::test]
    async fn manager_tracks_nick_ownership() {
        let manager = ClientManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = manager.insert("host".to_string(), tx);
        let id = handle.read().await.id;
        let nick = ICaseStr::from("Alice");
        manager.set_nick(id, None, nick.clone());
        assert!(manager.nick_taken(&ICaseStr::from("alice")));
        assert_eq!(manager.by_nick(&nick), Some(id));
    }
}
