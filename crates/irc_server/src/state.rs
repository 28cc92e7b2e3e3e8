//! The server aggregate (§9 "Global mutable state... re-architect as
//! values owned by a `Server` aggregate created at startup and threaded to
//! handlers explicitly"), bundling the client manager, channel set, and
//! config loaded once at startup. Generalizes the teacher's bare
//! `DashMap<String, IrcChannel>` / `DashMap<UserId, User>` pair into typed
//! owners (`ClientManager`, `ChannelSet`).

use std::sync::Arc;

use crate::channel::ChannelSet;
use crate::client::ClientManager;
use crate::config::Config;

pub struct ServerState {
    pub config: Config,
    pub clients: ClientManager,
    pub channels: ChannelSet,
}

impl ServerState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(ServerState {
            config,
            clients: ClientManager::new(),
            channels: ChannelSet::new(),
        })
    }
}
