use std::sync::Arc;

use clap::Parser;
use flexi_logger::{Duplicate, Logger};
use log::{error, info};
use tokio::net::TcpListener;

use irc_server::config::Config;
use irc_server::connection;
use irc_server::errors::InternalIrcError;
use irc_server::state::ServerState;

/// A small RFC-1459-subset IRCd (§6).
#[derive(Parser, Debug)]
#[command(name = "irc_server", version)]
struct Args {
    /// TOML config file; falls back to built-in defaults when omitted.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the config's `host:port` bind address.
    #[arg(long)]
    bind: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), InternalIrcError> {
    let args = Args::parse();

    Logger::try_with_str(if args.verbose { "debug" } else { "info" })
        .and_then(|logger| {
            logger
                .log_to_stderr()
                .duplicate_to_stderr(Duplicate::All)
                .start()
        })
        .ok();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = &args.bind {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| InternalIrcError::InvalidBindAddress(bind.clone()))?;
        config.server.bind_host = host.to_string();
        config.server.bind_port = port
            .parse()
            .map_err(|_| InternalIrcError::InvalidBindAddress(bind.clone()))?;
    }

    let bind_addr = config.server.bind_addr();
    let state = ServerState::new(config);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on {bind_addr}");

    loop {
        let (socket, addr) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = socket.set_nodelay(true) {
                error!("failed to set TCP_NODELAY for {addr}: {e}");
            }
            connection::run(socket, addr.ip().to_string(), state).await;
        });
    }
}
