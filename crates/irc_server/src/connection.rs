//! Per-connection task (§4.10/§5), grounded on the teacher's standalone
//! `bin/irc_server.rs` loop but rebuilt around `tokio_util`'s `Framed`
//! split into a decode half driven here and a writer half fed by an
//! `mpsc` channel, so channel broadcasts (delivered from other
//! connections' forwarder tasks) and direct replies share one outbound
//! queue without racing on the socket.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::codec::{Decoder, FramedRead};

use irc_proto::{CodecError, IrcLineCodec, Message};

use crate::constants::BAD_LINE_BANNER;
use crate::dispatch::{self, Outcome, Subscriptions};
use crate::errors::InternalIrcError;
use crate::state::ServerState;

/// Wraps [`IrcLineCodec`] with the §10 connection-size limit: a line (up to
/// and including its `\n`) longer than `max_len` is rejected the same way a
/// malformed one is, instead of being buffered without bound.
struct BoundedLineCodec {
    inner: IrcLineCodec,
    max_len: usize,
}

impl Decoder for BoundedLineCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        let too_long = match src.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1 > self.max_len,
            None => src.len() > self.max_len,
        };
        if too_long {
            return Err(CodecError::Malformed(format!(
                "line exceeds {} bytes",
                self.max_len
            )));
        }
        self.inner.decode(src)
    }
}

/// Floor-division token bucket identical in semantics to the client's
/// (§4.5/§9), applied here to incoming commands rather than outbound ones.
struct TokenBucket {
    capacity: u32,
    fill_interval: Duration,
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, fill_interval: Duration) -> Self {
        TokenBucket {
            capacity,
            fill_interval,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    async fn wait(&mut self) {
        loop {
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(self.last_refill);
            let accrued =
                (elapsed.as_secs_f64() / self.fill_interval.as_secs_f64()).floor() as u32;
            if accrued > 0 {
                let new_tokens = self.tokens.saturating_add(accrued).min(self.capacity);
                if new_tokens != self.tokens {
                    self.tokens = new_tokens;
                    self.last_refill = now;
                }
            }
            if self.tokens > 0 {
                self.tokens -= 1;
                return;
            }
            tokio::time::sleep_until(self.last_refill + self.fill_interval).await;
        }
    }
}

/// Drives one accepted TCP connection end to end: registers the client,
/// runs the read/dispatch loop, and cleans up on exit.
pub async fn run(stream: TcpStream, peer_host: String, state: Arc<ServerState>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FramedRead::new(
        read_half,
        BoundedLineCodec {
            inner: IrcLineCodec,
            max_len: state.config.limits.max_message_length,
        },
    );

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let handle = state.clients.insert(peer_host.clone(), outbound_tx);
    let mut subs: Subscriptions = Subscriptions::new();
    let mut limiter = TokenBucket::new(
        state.config.limits.rate_capacity,
        state.config.limits.rate_fill_interval(),
    );

    info!("accepted connection from {peer_host}");

    loop {
        limiter.wait().await;

        match reader.next().await {
            Some(Ok(msg)) => {
                debug!("<- {msg:?}");
                if matches!(
                    dispatch::dispatch(&state, &handle, &mut subs, msg).await,
                    Outcome::Close
                ) {
                    break;
                }
            }
            Some(Err(e)) => {
                let err = InternalIrcError::ParseError;
                warn!("closing malformed connection from {peer_host}: {err} ({e})");
                handle
                    .read()
                    .await
                    .send_line(format!("{BAD_LINE_BANNER}\r\n"));
                break;
            }
            None => break,
        }
    }

    dispatch::cleanup(&state, &handle, &mut subs).await;
    // Drop the last strong reference to `ClientData` so its outbound sender
    // closes and the writer task drains whatever's buffered (the bad-line
    // banner, a QUIT notice, ...) before exiting on its own rather than
    // being `abort()`-ed mid-write.
    drop(handle);
    let _ = writer_task.await;
    info!("closed connection from {peer_host}");
}
