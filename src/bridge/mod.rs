//! Content bridge: one-way delivery of synthetic input into the player page.
//!
//! ```text
//! MappingEngine / UI ──► ContentBridge::dispatch ──► broadcast ──► /events (SSE) ──► page
//! ```
//!
//! The page turns each key message into a DOM `KeyboardEvent` on `document`.
//! Delivery is fire-and-forget; outcomes only show up in the logs.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::mapping::{KeyIntent, KeyPhase};

/// Buffered messages per subscriber before slow pages start lagging.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeMessage {
    Key(KeyIntent),
    Reload,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMessage<'a> {
    Keydown(WireKey<'a>),
    Keyup(WireKey<'a>),
    Reload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireKey<'a> {
    key: &'a str,
    key_code: u32,
    code: &'a str,
    which: u32,
}

impl BridgeMessage {
    /// JSON form read by `bridge.js`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let wire = match self {
            BridgeMessage::Key(intent) => {
                let key = WireKey {
                    key: &intent.key,
                    key_code: intent.key_code,
                    code: &intent.code,
                    which: intent.key_code,
                };
                match intent.phase {
                    KeyPhase::Down => WireMessage::Keydown(key),
                    KeyPhase::Up => WireMessage::Keyup(key),
                }
            }
            BridgeMessage::Reload => WireMessage::Reload,
        };
        serde_json::to_string(&wire)
    }
}

/// Sink for messages bound for the hosted content. Never blocks, never retries.
pub trait ContentBridge: Send + Sync {
    fn dispatch(&self, message: BridgeMessage);

    fn dispatch_key(&self, intent: KeyIntent) {
        self.dispatch(BridgeMessage::Key(intent));
    }

    /// Whether any page would receive a dispatch right now.
    fn is_attached(&self) -> bool {
        true
    }
}

/// Broadcast-backed bridge; every open `/events` stream is a subscriber.
#[derive(Clone, Debug)]
pub struct EventBridge {
    sender: broadcast::Sender<BridgeMessage>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeMessage> {
        self.sender.subscribe()
    }

    pub fn page_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentBridge for EventBridge {
    fn dispatch(&self, message: BridgeMessage) {
        let description = match &message {
            BridgeMessage::Key(intent) => format!("{} event for key: {}", intent.phase, intent.key),
            BridgeMessage::Reload => "reload".to_string(),
        };

        match self.sender.send(message) {
            Ok(pages) => debug!("Injected {} ({} page(s))", description, pages),
            Err(_) => error!("Failed to inject {}: no player page attached", description),
        }
    }

    fn is_attached(&self) -> bool {
        self.page_count() > 0
    }
}
