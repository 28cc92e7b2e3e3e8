//! Per-verb command dispatch (§4.10), grounded on the teacher's
//! `handlers/` modules but collapsed into one table-driven function per
//! the spec's verb table, operating on the [`ServerState`] aggregate
//! instead of module-level globals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;
use tokio::task::JoinHandle;

use irc_proto::{ICaseStr, Message, join_max_length};

use crate::client::{ClientHandle, ClientId};
use crate::constants::*;
use crate::mode::{parse_mode, CHANNEL_MODES, USER_MODES};
use crate::replies::{from_prefix, numeric};
use crate::state::ServerState;

/// Per-connection table of channel subscriptions, so their forwarder tasks
/// can be aborted on disconnect. Owned by the connection task, not by the
/// shared [`crate::client::ClientData`] (§5: per-connection state needs no
/// lock).
pub type Subscriptions = HashMap<ICaseStr, JoinHandle<()>>;

pub enum Outcome {
    Continue,
    Close,
}

fn is_nick_valid(nick: &str) -> bool {
    let mut chars = nick.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    nick.len() <= 15 && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Every other client that shares at least one channel with `id` (used to
/// fan out NICK changes and QUIT notices, which span more than one
/// channel's own broadcast group).
async fn co_channel_clients(state: &Arc<ServerState>, id: ClientId, my_channels: &HashSet<ICaseStr>) -> Vec<ClientHandle> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in my_channels {
        let Some(channel) = state.channels.get(name) else {
            continue;
        };
        let channel = channel.read().await;
        for member_id in channel.members.keys() {
            if *member_id != id && seen.insert(*member_id) {
                if let Some(handle) = state.clients.get(*member_id) {
                    out.push(handle);
                }
            }
        }
    }
    out
}

async fn require_registered(state: &Arc<ServerState>, handle: &ClientHandle) -> bool {
    let client = handle.read().await;
    if client.registered {
        true
    } else {
        client.send_line(numeric(
            &state.config.server.name,
            ERR_NOTREGISTERED,
            client.nick_str(),
            &["You have not registered"],
        ));
        false
    }
}

async fn send_welcome(state: &Arc<ServerState>, handle: &ClientHandle) {
    let client = handle.read().await;
    let name = &state.config.server.name;
    let nick = client.nick_str();
    client.send_line(numeric(name, RPL_WELCOME, nick, &[&format!("Welcome to {name}, {nick}")]));
    client.send_line(numeric(name, RPL_YOURHOST, nick, &[&format!("Your host is {name}, running version 1.0")]));
    client.send_line(numeric(name, RPL_ISUPPORT, nick, &[&format!("CHANTYPES={}", state.config.server.chantypes), "are supported by this server"]));
    client.send_line(numeric(name, RPL_MOTDSTART, nick, &[&format!("- {name} Message of the Day -")]));
    client.send_line(numeric(name, RPL_MOTD, nick, &[&state.config.server.motd]));
    client.send_line(numeric(name, RPL_ENDOFMOTD, nick, &["End of /MOTD command."]));
}

async fn handle_nick(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    let Some(new_nick) = msg.args.first().map(|a| a.as_str().to_string()) else {
        return;
    };
    let id;
    let old_nick;
    {
        let client = handle.read().await;
        id = client.id;
        old_nick = client.nick.clone();
    }

    if !is_nick_valid(&new_nick) {
        let client = handle.read().await;
        client.send_line(numeric(
            &state.config.server.name,
            ERR_ERRONEUSNICKNAME,
            client.nick_str(),
            &[&new_nick, "Erroneous nickname"],
        ));
        return;
    }

    let folded = ICaseStr::from(new_nick.as_str());
    let already_mine = old_nick.as_ref() == Some(&folded);
    if !already_mine && state.clients.nick_taken(&folded) {
        let client = handle.read().await;
        client.send_line(numeric(
            &state.config.server.name,
            ERR_NICKNAMEINUSE,
            client.nick_str(),
            &[&new_nick, "Nickname is already in use"],
        ));
        return;
    }

    let old_mask;
    let my_channels;
    let just_registered;
    {
        let mut client = handle.write().await;
        old_mask = client.hostmask();
        client.nick = Some(folded.clone());
        my_channels = client.channels.clone();
        just_registered = client.complete_nick();
    }
    state.clients.set_nick(id, old_nick.as_ref(), folded);

    let line = from_prefix(&old_mask, "NICK", &[&new_nick]);
    for peer in co_channel_clients(state, id, &my_channels).await {
        peer.read().await.send_line(line.clone());
    }

    if just_registered {
        send_welcome(state, handle).await;
    }
}

async fn handle_user(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    if msg.args.len() < 4 {
        return;
    }
    let just_registered = {
        let mut client = handle.write().await;
        client.ident = Some(msg.args[0].as_str().to_string());
        client.realname = Some(msg.args[3].as_str().to_string());
        client.complete_user()
    };
    if just_registered {
        send_welcome(state, handle).await;
    }
}

async fn handle_ping(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    let client = handle.read().await;
    let target = msg
        .args
        .first()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| state.config.server.name.clone());
    client.send_line(from_prefix(&state.config.server.name, "PONG", &[&target]));
}

async fn send_names(state: &Arc<ServerState>, handle: &ClientHandle, channel_name: &ICaseStr) {
    let channel = state.channels.get(channel_name).expect("just created");
    let channel = channel.read().await;

    let mut names = Vec::new();
    for (member_id, flags) in &channel.members {
        if let Some(member) = state.clients.get(*member_id) {
            let member = member.read().await;
            let nick = member.nick_str().to_string();
            names.push(if flags.operator { format!("@{nick}") } else { nick });
        }
    }
    names.sort();

    let client = handle.read().await;
    let nick = client.nick_str();
    let name = &state.config.server.name;
    client.send_line(numeric(
        name,
        RPL_TOPIC,
        nick,
        &[channel_name.as_str(), channel.topic.as_deref().unwrap_or("")],
    ));
    client.send_line(numeric(
        name,
        RPL_TOPICWHOTIME,
        nick,
        &[
            channel_name.as_str(),
            channel.topic_set_by.as_deref().unwrap_or(name),
            &epoch_secs(channel.topic_set_at.unwrap_or(channel.created_at)).to_string(),
        ],
    ));

    let mut remaining = names;
    while !remaining.is_empty() {
        let (chunk, rest) = join_max_length(&remaining, " ", 400);
        remaining = rest;
        client.send_line(numeric(name, RPL_NAMREPLY, nick, &["=", channel_name.as_str(), &chunk]));
    }
    client.send_line(numeric(name, RPL_ENDOFNAMES, nick, &[channel_name.as_str(), "End of /NAMES list."]));
}

fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

async fn handle_join(state: &Arc<ServerState>, handle: &ClientHandle, subs: &mut Subscriptions, msg: &Message) {
    if !require_registered(state, handle).await {
        return;
    }
    let Some(target) = msg.args.first() else { return };
    let id = handle.read().await.id;

    for name in target.as_str().split(',').filter(|s| !s.is_empty()) {
        let channel_name = ICaseStr::from(name);
        let channel_handle = state.channels.get_or_create(&channel_name);

        let (mask, rx) = {
            let mut channel = channel_handle.write().await;
            channel.add_member(id);
            let rx = channel.subscribe();
            let mask = handle.read().await.hostmask();
            (mask, rx)
        };
        handle.write().await.channels.insert(channel_name.clone());

        let outbound = handle.read().await.outbound.clone();
        let mut rx = rx;
        let me = id;
        let forwarder = tokio::spawn(async move {
            while let Ok(bm) = rx.recv().await {
                if bm.except != Some(me) {
                    let _ = outbound.send(bm.line);
                }
            }
        });
        subs.insert(channel_name.clone(), forwarder);

        let line = from_prefix(&mask, "JOIN", &[channel_name.as_str()]);
        channel_handle.read().await.broadcast(line, None);

        send_names(state, handle, &channel_name).await;
    }
}

async fn handle_part(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    if !require_registered(state, handle).await {
        return;
    }
    notice_not_implemented(state, handle, "PART").await;
    let _ = msg;
}

async fn handle_privmsg(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    if !require_registered(state, handle).await {
        return;
    }
    if msg.args.len() < 2 {
        return;
    }
    let target = msg.args[0].as_str();
    let text = msg.args[1].as_str();
    let id = handle.read().await.id;

    if state.config.server.is_channel(target) {
        let channel_name = ICaseStr::from(target);
        if let Some(channel) = state.channels.get(&channel_name) {
            let mask = handle.read().await.hostmask();
            let line = from_prefix(&mask, "PRIVMSG", &[target, text]);
            channel.read().await.broadcast(line, Some(id));
        }
    } else {
        notice_not_implemented(state, handle, "PRIVMSG to a user").await;
    }
}

async fn handle_mode(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) {
    if !require_registered(state, handle).await {
        return;
    }
    let Some(target) = msg.args.first().map(|a| a.as_str().to_string()) else {
        return;
    };
    let Some(flags) = msg.args.get(1).map(|a| a.as_str()) else {
        return;
    };
    let params: Vec<&str> = msg.args[2..].iter().map(|a| a.as_str()).collect();

    if state.config.server.is_channel(&target) {
        // Parses, but (per §4.10) applies no channel-level state yet.
        if let Err(e) = parse_mode(flags, &params, &CHANNEL_MODES) {
            debug!("channel mode parse failed for {target}: {e}");
        }
        return;
    }

    let own_nick = handle.read().await.nick.clone();
    if own_nick.as_ref().map(ICaseStr::as_str) != Some(target.as_str()) {
        let client = handle.read().await;
        client.send_line(numeric(&state.config.server.name, ERR_USERSDONTMATCH, client.nick_str(), &["Cannot change mode for other users"]));
        return;
    }

    match parse_mode(flags, &params, &USER_MODES) {
        Ok((additions, removals)) => {
            let mut client = handle.write().await;
            for change in &additions {
                client.modes.insert(change.flag);
            }
            for change in &removals {
                client.modes.remove(&change.flag);
            }
            let mask = client.hostmask();
            let mut echoed = vec![target.as_str()];
            echoed.push(flags);
            echoed.extend(params.iter());
            client.send_line(from_prefix(&mask, "MODE", &echoed));
        }
        Err(_) => {
            let client = handle.read().await;
            client.send_line(numeric(&state.config.server.name, ERR_UMODEUNKNOWNFLAG, client.nick_str(), &["Unknown MODE flag"]));
        }
    }
}

async fn handle_quit(state: &Arc<ServerState>, handle: &ClientHandle, msg: &Message) -> Outcome {
    let registered = handle.read().await.registered;
    if registered {
        let (id, mask, my_channels) = {
            let client = handle.read().await;
            (client.id, client.hostmask(), client.channels.clone())
        };
        let text = msg.args.first().map(|a| a.as_str().to_string()).unwrap_or_default();
        let line = from_prefix(&mask, "QUIT", &[&text]);
        for peer in co_channel_clients(state, id, &my_channels).await {
            peer.read().await.send_line(line.clone());
        }
    }
    Outcome::Close
}

async fn notice_not_implemented(state: &Arc<ServerState>, handle: &ClientHandle, what: &str) {
    let client = handle.read().await;
    client.send_line(from_prefix(
        &state.config.server.name,
        "NOTICE",
        &[client.nick_str(), &format!("{what} is not implemented")],
    ));
}

/// Removes `id` from every channel it was a member of and aborts its
/// forwarder tasks, restoring the membership-symmetry invariant (§3) on
/// disconnect.
pub async fn cleanup(state: &Arc<ServerState>, handle: &ClientHandle, subs: &mut Subscriptions) {
    let (id, nick, my_channels) = {
        let client = handle.read().await;
        (client.id, client.nick.clone(), client.channels.clone())
    };
    for name in &my_channels {
        if let Some(channel) = state.channels.get(name) {
            channel.write().await.remove_member(id);
        }
    }
    for (_, forwarder) in subs.drain() {
        forwarder.abort();
    }
    state.clients.remove(id, nick.as_ref());
}

/// Dispatches one parsed inbound line by verb (§4.10's table), returning
/// whether the connection should stay open.
pub async fn dispatch(state: &Arc<ServerState>, handle: &ClientHandle, subs: &mut Subscriptions, msg: Message) -> Outcome {
    let Some(verb) = msg.verb.clone() else {
        return Outcome::Continue;
    };

    match verb.folded() {
        "nick" => handle_nick(state, handle, &msg).await,
        "user" => handle_user(state, handle, &msg).await,
        "ping" => handle_ping(state, handle, &msg).await,
        "join" => handle_join(state, handle, subs, &msg).await,
        "part" => handle_part(state, handle, &msg).await,
        "privmsg" => handle_privmsg(state, handle, &msg).await,
        "mode" => handle_mode(state, handle, &msg).await,
        "quit" => return handle_quit(state, handle, &msg).await,
        "get" => {
            handle.read().await.send_line(HTTP_PROBE_REPLY.to_string());
            return Outcome::Close;
        }
        _ => {
            if handle.read().await.registered {
                notice_not_implemented(state, handle, verb.as_str()).await;
            }
        }
    }
    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::sync::mpsc;

    fn new_state() -> Arc<ServerState> {
        ServerState::new(Config::default())
    }

    async fn new_client(state: &Arc<ServerState>) -> (ClientHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = state.clients.insert("host.example".to_string(), tx);
        (handle, rx)
    }

    async fn register(state: &Arc<ServerState>, handle: &ClientHandle, subs: &mut Subscriptions, nick: &str) {
        dispatch(state, handle, subs, Message::new("NICK", vec![nick.into()])).await;
        dispatch(
            state,
            handle,
            subs,
            Message::new("USER", vec!["u".into(), "0".into(), "*".into(), "Real Name".into()]),
        )
        .await;
    }

    /// Gives spawned per-channel forwarder tasks a chance to drain the
    /// broadcast channel into their owner's mailbox before a test inspects
    /// it with `try_recv`.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn invalid_nick_gets_erroneus_nickname() {
        let state = new_state();
        let (handle, mut rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();

        dispatch(&state, &handle, &mut subs, Message::new("NICK", vec!["1bad".into()])).await;

        let line = rx.recv().await.unwrap();
        assert!(line.contains(&ERR_ERRONEUSNICKNAME.to_string()), "{line}");
    }

    #[tokio::test]
    async fn colliding_nick_is_rejected_and_original_holder_keeps_it() {
        let state = new_state();
        let (alice, mut alice_rx) = new_client(&state).await;
        let (bob, mut bob_rx) = new_client(&state).await;
        let mut alice_subs = Subscriptions::new();
        let mut bob_subs = Subscriptions::new();

        dispatch(&state, &alice, &mut alice_subs, Message::new("NICK", vec!["alice".into()])).await;
        let _ = alice_rx.try_recv();

        dispatch(&state, &bob, &mut bob_subs, Message::new("NICK", vec!["Alice".into()])).await;
        let line = bob_rx.recv().await.unwrap();
        assert!(line.contains(&ERR_NICKNAMEINUSE.to_string()), "{line}");
        assert_eq!(alice.read().await.nick_str(), "alice");
        assert!(bob.read().await.nick.is_none());
    }

    #[tokio::test]
    async fn registration_completes_and_sends_the_welcome_burst() {
        let state = new_state();
        let (handle, mut rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();

        register(&state, &handle, &mut subs, "alice").await;

        assert!(handle.read().await.registered);
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert!(lines.iter().any(|l| l.contains(&format!(" {RPL_WELCOME:03} "))), "{lines:?}");
        assert!(lines.iter().any(|l| l.contains(&format!(" {RPL_ENDOFMOTD:03} "))), "{lines:?}");
    }

    #[tokio::test]
    async fn first_joiner_is_listed_as_operator_in_names() {
        let state = new_state();
        let (handle, mut rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();
        register(&state, &handle, &mut subs, "alice").await;
        while rx.try_recv().is_ok() {}

        dispatch(&state, &handle, &mut subs, Message::new("JOIN", vec!["#chan".into()])).await;
        settle().await;

        let mut names_line = None;
        while let Ok(line) = rx.try_recv() {
            if line.contains(&format!(" {RPL_NAMREPLY:03} ")) {
                names_line = Some(line);
            }
        }
        let names_line = names_line.expect("expected a NAMREPLY line");
        assert!(names_line.contains("@alice"), "{names_line}");
    }

    #[tokio::test]
    async fn privmsg_to_a_channel_reaches_other_members_but_not_the_sender() {
        let state = new_state();
        let (alice, mut alice_rx) = new_client(&state).await;
        let (bob, mut bob_rx) = new_client(&state).await;
        let mut alice_subs = Subscriptions::new();
        let mut bob_subs = Subscriptions::new();
        register(&state, &alice, &mut alice_subs, "alice").await;
        register(&state, &bob, &mut bob_subs, "bob").await;

        dispatch(&state, &alice, &mut alice_subs, Message::new("JOIN", vec!["#chan".into()])).await;
        dispatch(&state, &bob, &mut bob_subs, Message::new("JOIN", vec!["#chan".into()])).await;
        settle().await;
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        dispatch(
            &state,
            &alice,
            &mut alice_subs,
            Message::new("PRIVMSG", vec!["#chan".into(), "hello there".into()]),
        )
        .await;
        settle().await;

        let received = bob_rx.recv().await.unwrap();
        assert!(received.contains("PRIVMSG #chan :hello there"), "{received}");
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cleanup_restores_membership_symmetry() {
        let state = new_state();
        let (handle, mut rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();
        register(&state, &handle, &mut subs, "alice").await;
        while rx.try_recv().is_ok() {}

        dispatch(&state, &handle, &mut subs, Message::new("JOIN", vec!["#chan".into()])).await;
        settle().await;
        let id = handle.read().await.id;
        assert!(state.channels.get(&ICaseStr::from("#chan")).unwrap().read().await.members.contains_key(&id));

        cleanup(&state, &handle, &mut subs).await;

        assert!(!state.channels.get(&ICaseStr::from("#chan")).unwrap().read().await.members.contains_key(&id));
        assert!(state.clients.get(id).is_none());
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn quit_broadcasts_to_co_channel_members_and_closes() {
        let state = new_state();
        let (alice, mut alice_rx) = new_client(&state).await;
        let (bob, mut bob_rx) = new_client(&state).await;
        let mut alice_subs = Subscriptions::new();
        let mut bob_subs = Subscriptions::new();
        register(&state, &alice, &mut alice_subs, "alice").await;
        register(&state, &bob, &mut bob_subs, "bob").await;
        dispatch(&state, &alice, &mut alice_subs, Message::new("JOIN", vec!["#chan".into()])).await;
        dispatch(&state, &bob, &mut bob_subs, Message::new("JOIN", vec!["#chan".into()])).await;
        settle().await;
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        let outcome = dispatch(&state, &alice, &mut alice_subs, Message::new("QUIT", vec!["goodbye".into()])).await;

        assert!(matches!(outcome, Outcome::Close));
        let received = bob_rx.recv().await.unwrap();
        assert!(received.contains("QUIT :goodbye"), "{received}");
    }

    #[tokio::test]
    async fn own_nick_mode_change_is_applied_and_echoed() {
        let state = new_state();
        let (handle, mut rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();
        register(&state, &handle, &mut subs, "alice").await;
        while rx.try_recv().is_ok() {}

        dispatch(&state, &handle, &mut subs, Message::new("MODE", vec!["alice".into(), "+i".into()])).await;

        assert!(handle.read().await.modes.contains(&'i'));
        let echoed = rx.recv().await.unwrap();
        assert!(echoed.contains("MODE alice +i"), "{echoed}");
    }

    #[tokio::test]
    async fn mode_for_another_nick_is_rejected() {
        let state = new_state();
        let (alice, mut alice_rx) = new_client(&state).await;
        let mut subs = Subscriptions::new();
        register(&state, &alice, &mut subs, "alice").await;
        while alice_rx.try_recv().is_ok() {}

        dispatch(&state, &alice, &mut subs, Message::new("MODE", vec!["somebodyelse".into(), "+i".into()])).await;

        let line = alice_rx.recv().await.unwrap();
        assert!(line.contains(&ERR_USERSDONTMATCH.to_string()), "{line}");
    }
}
