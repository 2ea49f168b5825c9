use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

/// State changes a renderer needs to mirror onto the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    LoadStarted { id: String },
    Loaded { id: String },
    LoadFailed { id: String, reason: String },
    VisibilityChanged { id: String, visible: bool },
}

impl LayerEvent {
    pub fn id(&self) -> &str {
        match self {
            LayerEvent::LoadStarted { id }
            | LayerEvent::Loaded { id }
            | LayerEvent::LoadFailed { id, .. }
            | LayerEvent::VisibilityChanged { id, .. } => id,
        }
    }
}

/// Fans events out to every live subscriber. Dropped receivers are pruned on
/// the next publish.
#[derive(Default)]
pub(crate) struct EventBus {
    senders: Mutex<Vec<Sender<LayerEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<LayerEvent> {
        let (tx, rx) = unbounded();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, event: LayerEvent) {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
