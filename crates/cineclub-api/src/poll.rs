//! Background chat polling.
//!
//! A chat view does not stream; it refetches the full message list on a
//! fixed interval and swaps it in wholesale. The poller owns that loop
//! on a background task and publishes each snapshot over a watch
//! channel, so any number of views can observe the latest list without
//! issuing requests themselves. Stopping the poller stops the requests
//! immediately.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::communities::ChatMessage;

pub struct ChatPoller {
    rx: watch::Receiver<Vec<ChatMessage>>,
    handle: JoinHandle<()>,
}

impl ChatPoller {
    /// Start polling one chat. The first fetch happens immediately, then
    /// every `interval` after that.
    pub fn spawn(
        client: ApiClient,
        community_id: i64,
        chat_id: i64,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    debug!("chat {chat_id}: no subscribers left, stopping poll");
                    break;
                }
                match client.messages(community_id, chat_id).await {
                    Ok(messages) => {
                        let _ = tx.send(messages);
                    }
                    // A failed poll is not fatal; the next tick retries.
                    Err(err) => warn!("chat {chat_id}: poll failed: {err}"),
                }
            }
        });
        Self { rx, handle }
    }

    /// A receiver that yields each new snapshot. `changed().await` then
    /// `borrow_and_update()` is the intended consumption pattern.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.rx.clone()
    }

    /// The most recent snapshot without waiting.
    pub fn latest(&self) -> Vec<ChatMessage> {
        self.rx.borrow().clone()
    }

    /// Stop polling. No further requests are issued after this returns.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ChatPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
