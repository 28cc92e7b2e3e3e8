//! The IRCd core: command dispatch, channel/client state, and connection
//! handling for the subset of RFC 1459 listed in §6. Neither this crate
//! nor `irc_client` speaks the wire format directly; both go through
//! `irc_proto`.

pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod errors;
pub mod mode;
pub mod replies;
pub mod state;
