//! A small demo binary (§6): connects, registers, joins one channel, and
//! logs every `PRIVMSG` it sees there, mirroring the existing server
//! binary's `clap`+`flexi_logger` setup.

use clap::Parser;
use flexi_logger::{Duplicate, Logger};

use irc_client::Session;
use irc_client::event::ClientEvent;

#[derive(Parser, Debug)]
#[command(name = "irc_client_demo", version)]
struct Args {
    #[arg(long, default_value = "chat.freenode.net")]
    host: String,

    #[arg(long, default_value_t = 6697)]
    port: u16,

    #[arg(long, default_value = "irc_client_demo")]
    nick: String,

    #[arg(long)]
    channel: String,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    Logger::try_with_str(if args.verbose { "debug" } else { "info" })
        .and_then(|logger| logger.log_to_stderr().duplicate_to_stderr(Duplicate::All).start())
        .ok();

    let mut session = Session::new(args.host.clone(), args.port, true);
    session.client.events.subscribe("message", |event: &ClientEvent| {
        let event = event.clone();
        async move {
            let ClientEvent::Message { target, text, .. } = event;
            log::info!("{target} <- {text}");
        }
    });

    session.connect().await?;
    session.register(&args.nick, &args.nick, "irc_client_demo", None).await?;
    session.join(&[&args.channel]).await?;

    loop {
        if session.client.recv_dispatch().await?.is_none() {
            break;
        }
    }

    Ok(())
}
