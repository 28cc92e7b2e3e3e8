use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] irc_proto::CodecError),

    #[error("failed to load system TLS certificates: {0}")]
    TlsRoots(String),

    #[error("invalid TLS server name: {0}")]
    TlsServerName(String),

    #[error("connection lost")]
    ConnectionLost,

    #[error("capability {0} rejected")]
    CapRejected(String),

    #[error("SASL authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limiter wait cancelled")]
    RateLimiterCancelled,

    #[error("failed to load client config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
