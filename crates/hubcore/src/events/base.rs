use crate::{Endpoint, HubId, HubRole, ModuleId, ParamValue, SpawnToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Changes to the live session graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    HubAttached {
        hub: HubId,
        role: HubRole,
        timestamp: DateTime<Utc>,
    },
    HubDetached {
        hub: HubId,
        timestamp: DateTime<Utc>,
    },
    ModuleSpawned {
        module: ModuleId,
        type_name: String,
        hub: HubId,
        token: SpawnToken,
        timestamp: DateTime<Utc>,
    },
    SpawnFailed {
        token: SpawnToken,
        type_name: String,
        hub: HubId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    ModuleKilled {
        module: ModuleId,
        timestamp: DateTime<Utc>,
    },
    Connected {
        from: Endpoint,
        to: Endpoint,
        timestamp: DateTime<Utc>,
    },
    Disconnected {
        from: Endpoint,
        to: Endpoint,
        timestamp: DateTime<Utc>,
    },
    ParameterChanged {
        module: ModuleId,
        name: String,
        value: ParamValue,
        timestamp: DateTime<Utc>,
    },
    ParametersApplied {
        module: ModuleId,
        timestamp: DateTime<Utc>,
    },
    Barrier {
        timestamp: DateTime<Utc>,
    },
}

/// Session-wide event bus
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(?event, "session event");
        let _ = self.sender.send(event);
    }
}
