// src/events.rs
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Live notification published after a transaction settles. Consumers attach
/// over SSE; a send with no listeners is not an error.
#[derive(Debug, Clone, Serialize)]
pub struct PosEvent {
    pub event_type: String,
    pub payload: Value,
}

#[derive(Clone)]
pub struct PosEventHub {
    sender: broadcast::Sender<PosEvent>,
}

impl PosEventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn publish(&self, event_type: &str, payload: Value) {
        let event = PosEvent {
            event_type: event_type.to_string(),
            payload,
        };
        if self.sender.send(event).is_err() {
            tracing::debug!(event_type, "No event subscribers connected");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PosEvent> {
        self.sender.subscribe()
    }
}

impl Default for PosEventHub {
    fn default() -> Self {
        Self::new()
    }
}
