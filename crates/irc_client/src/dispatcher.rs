//! Subscription dispatcher (§4.3): handlers are awaited sequentially, in
//! registration order, for every inbound line that matches their pattern.

use std::future::Future;
use std::pin::Pin;

use irc_proto::Message;

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// An async handler invoked with the concrete inbound message.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, msg: &'a Message) -> BoxFuture<'a>;
}

impl<F, Fut> Handler for F
where
    F: Fn(&Message) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call<'a>(&'a self, msg: &'a Message) -> BoxFuture<'a> {
        Box::pin(self(msg))
    }
}

pub struct Dispatcher {
    subscriptions: Vec<(Message, Box<dyn Handler>)>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            subscriptions: Vec::new(),
        }
    }

    /// Registers `handler` to run whenever an inbound message matches
    /// `pattern`. Subscriptions are kept in insertion order.
    pub fn subscribe(&mut self, pattern: Message, handler: impl Handler + 'static) {
        self.subscriptions.push((pattern, Box::new(handler)));
    }

    /// Runs every matching handler to completion, in registration order,
    /// before returning.
    pub async fn dispatch(&self, msg: &Message) {
        for (pattern, handler) in &self.subscriptions {
            if pattern.matches(msg) {
                handler.call(msg).await;
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn handlers_run_in_registration_order_to_completion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        let log1 = log.clone();
        dispatcher.subscribe(Message::any(), move |_msg: &Message| {
            let log1 = log1.clone();
            async move {
                log1.lock().await.push("h1 start");
                log1.lock().await.push("h1 end");
            }
        });

        let log2 = log.clone();
        dispatcher.subscribe(Message::any(), move |_msg: &Message| {
            let log2 = log2.clone();
            async move {
                log2.lock().await.push("h2 start");
                log2.lock().await.push("h2 end");
            }
        });

        dispatcher.dispatch(&Message::new("PING", vec![])).await;

        let recorded = log.lock().await.clone();
        assert_eq!(recorded, vec!["h1 start", "h1 end", "h2 start", "h2 end"]);
    }

    #[tokio::test]
    async fn only_matching_handlers_run() {
        let seen = Arc::new(Mutex::new(false));
        let mut dispatcher = Dispatcher::new();
        let seen2 = seen.clone();
        dispatcher.subscribe(Message::for_verb("PRIVMSG"), move |_msg: &Message| {
            let seen2 = seen2.clone();
            async move {
                *seen2.lock().await = true;
            }
        });
        dispatcher.dispatch(&Message::new("PING", vec![])).await;
        assert!(!*seen.lock().await);
    }
}
