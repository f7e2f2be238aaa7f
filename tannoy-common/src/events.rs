//! Event types and broadcast bus for the Tannoy daemon
//!
//! Subsystems emit [`TannoyEvent`]s through an [`EventBus`]
//! (`tokio::sync::broadcast`); the MQTT glue subscribes and relays them to
//! the chat side channel. Events carry their own timestamps so subscribers
//! see when something happened, not when they got around to reading it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Notifications emitted by the playback agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TannoyEvent {
    /// Daemon is connected to the bus and listening for commands
    Ready {
        /// When the daemon came up
        timestamp: DateTime<Utc>,
    },

    /// A kill command flushed the queue and stopped the current task
    KillReceived {
        /// When the kill arrived
        timestamp: DateTime<Utc>,
    },

    /// A time-out command opened (or extended) the suppression window
    TimeOutEntered {
        /// Whole seconds until playback resumes
        remaining_secs: u64,
        /// When the window was set
        timestamp: DateTime<Utc>,
    },

    /// The worker started playing a job
    NowPlaying {
        /// Rooms the job is routed to
        rooms: Vec<String>,
        /// Volume percentage applied before playback
        volume: u8,
        /// Human-readable task description
        description: String,
        /// When playback started
        timestamp: DateTime<Utc>,
    },
}

impl TannoyEvent {
    /// Render the human-readable chat line for this event.
    pub fn chat_line(&self) -> String {
        match self {
            TannoyEvent::Ready { .. } => "ready".to_string(),
            TannoyEvent::KillReceived { .. } => "kill command received".to_string(),
            TannoyEvent::TimeOutEntered { remaining_secs, .. } => {
                format!("in time-out for the next {} seconds", remaining_secs)
            }
            TannoyEvent::NowPlaying {
                rooms,
                volume,
                description,
                ..
            } => format!(
                "playing rooms={} volume={}% task={}",
                rooms.join("-"),
                volume,
                description
            ),
        }
    }

    /// JSON payload for the chat relay topic.
    pub fn chat_payload(&self, channel: &str, prefix: &str) -> String {
        serde_json::json!({
            "to": channel,
            "message": format!("{}{}", prefix, self.chat_line()),
        })
        .to_string()
    }
}

/// Broadcast bus distributing [`TannoyEvent`]s to any number of subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TannoyEvent>,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TannoyEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers. Having no subscribers is not an
    /// error; the event is simply dropped.
    pub fn emit(&self, event: TannoyEvent) {
        if self.tx.send(event).is_err() {
            debug!("event emitted with no subscribers");
        }
    }
}
