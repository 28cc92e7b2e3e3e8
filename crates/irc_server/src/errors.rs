//! Error kinds (§7): `InternalIrcError` wraps transport/config faults;
//! protocol-level faults (bad nick, unknown mode) are translated to a
//! numeric reply inline and never raised as an exception.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InternalIrcError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The peer sent a line the codec could not parse; the connection is
    /// closed with [`crate::constants::BAD_LINE_BANNER`].
    #[error("malformed line from peer")]
    ParseError,

    /// `--bind` wasn't a `host:port` pair.
    #[error("invalid --bind address: {0}")]
    InvalidBindAddress(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
