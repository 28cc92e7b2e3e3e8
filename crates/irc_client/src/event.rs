//! Higher-level named-event dispatcher sitting above the raw subscription
//! dispatcher: built-in handlers (see `handlers.rs`) translate selected
//! inbound lines into named events such as `"message"`, and application
//! code subscribes to those names instead of raw wire patterns.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use irc_proto::{Message, Prefix};

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A higher-level event raised by a built-in handler.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Message {
        raw: Message,
        prefix: Option<Prefix>,
        target: String,
        text: String,
    },
}

pub trait EventHandler: Send + Sync {
    fn call<'a>(&'a self, event: &'a ClientEvent) -> BoxFuture<'a>;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(&ClientEvent) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call<'a>(&'a self, event: &'a ClientEvent) -> BoxFuture<'a> {
        Box::pin(self(event))
    }
}

#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<String, Vec<Box<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            handlers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, name: &str, handler: impl EventHandler + 'static) {
        self.handlers
            .entry(name.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    pub async fn fire(&self, name: &str, event: &ClientEvent) {
        if let Some(hs) = self.handlers.get(name) {
            for h in hs {
                h.call(event).await;
            }
        }
    }
}
