//! A queue that dispatcher/event handlers (which only ever see `&Message`,
//! never a `&mut Client`) can push frames onto; the owning `Client` drains
//! it after each dispatch round so ordering is still "submission order
//! from a single sender" even though the actual write happens one level up.

use std::sync::Arc;

use irc_proto::ICaseStr;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct OutboundQueue(Arc<Mutex<Vec<Vec<ICaseStr>>>>);

impl OutboundQueue {
    pub fn new() -> Self {
        OutboundQueue(Arc::new(Mutex::new(Vec::new())))
    }

    pub async fn push(&self, args: Vec<ICaseStr>) {
        self.0.lock().await.push(args);
    }

    pub async fn drain(&self) -> Vec<Vec<ICaseStr>> {
        std::mem::take(&mut *self.0.lock().await)
    }
}
