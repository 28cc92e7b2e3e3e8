//! Ties the connection, subscription dispatcher, and higher-level event
//! bus together: the single point through which every inbound line flows
//! before the facade (`facade.rs`) or application code sees it.

use irc_proto::Message;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::dispatcher::Dispatcher;
use crate::errors::ClientError;
use crate::event::EventBus;
use crate::outbound::OutboundQueue;
use crate::ratelimit::{DEFAULT_CAPACITY, DEFAULT_FILL_INTERVAL, TokenBucket};

pub struct Client {
    pub conn: Connection,
    pub dispatcher: Dispatcher,
    pub events: EventBus,
    pub limiter: TokenBucket,
    /// Frames queued by dispatcher/event handlers, which only ever see
    /// `&Message` and so cannot write to `conn` directly.
    pub outbound: OutboundQueue,
}

impl Client {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Client {
            conn: Connection::new(host, port, tls),
            dispatcher: Dispatcher::new(),
            events: EventBus::new(),
            limiter: TokenBucket::new(DEFAULT_CAPACITY, DEFAULT_FILL_INTERVAL),
            outbound: OutboundQueue::new(),
        }
    }

    /// As [`Client::new`], but takes the rate-limiter capacity/interval
    /// from `config` instead of the hardcoded §4.5 defaults.
    pub fn from_config(config: &ClientConfig) -> Self {
        Client {
            conn: Connection::new(config.host.clone(), config.port, config.tls),
            dispatcher: Dispatcher::new(),
            events: EventBus::new(),
            limiter: TokenBucket::new(config.rate_capacity, config.rate_fill_interval()),
            outbound: OutboundQueue::new(),
        }
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Reads one inbound line, running every matching subscriber to
    /// completion (in registration order), flushing anything they queued
    /// onto `outbound`, before returning it.
    pub async fn recv_dispatch(&mut self) -> Result<Option<Message>, ClientError> {
        let msg = self.conn.next_message().await?;
        if let Some(m) = &msg {
            self.dispatcher.dispatch(m).await;
            self.events_fire_builtin(m).await;
            for frame in self.outbound.drain().await {
                self.conn.send(frame).await?;
            }
        }
        Ok(msg)
    }

    async fn events_fire_builtin(&mut self, msg: &Message) {
        crate::handlers::raise_message_event(self, msg).await;
    }

    /// Reads and dispatches lines until one matches any of `patterns`,
    /// then returns it. Every intermediate line is still delivered to the
    /// subscription dispatcher, and the caller observes a matching line
    /// only after its own subscribers have run (§5).
    pub async fn match_patterns(&mut self, patterns: &[Message]) -> Result<Message, ClientError> {
        loop {
            let msg = self
                .recv_dispatch()
                .await?
                .ok_or(ClientError::ConnectionLost)?;
            if patterns.iter().any(|p| p.matches(&msg)) {
                return Ok(msg);
            }
        }
    }

    /// Rate-limited send: acquires a token before writing the frame.
    pub async fn send_limited(
        &mut self,
        args: Vec<irc_proto::ICaseStr>,
    ) -> Result<(), ClientError> {
        self.limiter.wait().await;
        self.conn.send(args).await
    }
}
