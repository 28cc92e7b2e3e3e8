//! Shared wire codec and message model for the IRC client and server
//! crates. Neither side talks to a socket without going through this
//! crate, so the two can never disagree about the grammar.

pub mod chunk;
pub mod codec;
pub mod framed;
pub mod icase;
pub mod message;

pub use chunk::join_max_length;
pub use codec::CodecError;
pub use framed::IrcLineCodec;
pub use icase::{ICaseMap, ICaseStr};
pub use message::{Message, Prefix, Tag};
