// events.rs — Estate lifecycle events and notification dispatch.
//
// The executor emits an event at each lifecycle milestone. Sinks (the JSONL
// log, or anything an operator plugs in) subscribe to them. Dispatch is
// synchronous and sink failures never fail the call that produced the event.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fie_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::EstateError;

/// Events emitted at estate lifecycle milestones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EstateEvent {
    TriggerConfigured {
        principal: String,
        mode: String,
        timestamp: DateTime<Utc>,
    },

    /// The estate became triggered. `timestamp` is the trigger timestamp.
    Triggered {
        principal: String,
        mode: String,
        timestamp: DateTime<Utc>,
    },

    ExecutionActivated {
        principal: String,
        timestamp: DateTime<Utc>,
    },

    ActionRecorded {
        principal: String,
        action_type: String,
        confidence: u8,
        authorized: bool,
        timestamp: DateTime<Utc>,
    },

    SunsetRequested {
        principal: String,
        timestamp: DateTime<Utc>,
    },

    /// The sunset sequence reached `stage`.
    SunsetStageReached {
        principal: String,
        stage: String,
        emergency: bool,
        timestamp: DateTime<Utc>,
    },
}

impl EstateEvent {
    pub fn event_type(&self) -> &str {
        match self {
            EstateEvent::TriggerConfigured { .. } => "trigger_configured",
            EstateEvent::Triggered { .. } => "triggered",
            EstateEvent::ExecutionActivated { .. } => "execution_activated",
            EstateEvent::ActionRecorded { .. } => "action_recorded",
            EstateEvent::SunsetRequested { .. } => "sunset_requested",
            EstateEvent::SunsetStageReached { .. } => "sunset_stage_reached",
        }
    }

    pub fn principal(&self) -> &str {
        match self {
            EstateEvent::TriggerConfigured { principal, .. }
            | EstateEvent::Triggered { principal, .. }
            | EstateEvent::ExecutionActivated { principal, .. }
            | EstateEvent::ActionRecorded { principal, .. }
            | EstateEvent::SunsetRequested { principal, .. }
            | EstateEvent::SunsetStageReached { principal, .. } => principal,
        }
    }

    pub fn triggered(principal: &Identity, mode: impl ToString, at: Timestamp) -> Self {
        EstateEvent::Triggered {
            principal: principal.to_string(),
            mode: mode.to_string(),
            timestamp: at.to_datetime(),
        }
    }

    pub fn sunset_stage(
        principal: &Identity,
        stage: impl ToString,
        emergency: bool,
        at: Timestamp,
    ) -> Self {
        EstateEvent::SunsetStageReached {
            principal: principal.to_string(),
            stage: stage.to_string(),
            emergency,
            timestamp: at.to_datetime(),
        }
    }
}

/// Receives estate events.
pub trait NotificationSink: Send {
    /// Handle an event. Errors are logged but don't stop the executor.
    fn send(&self, event: &EstateEvent) -> Result<(), EstateError>;
}

/// Appends events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &EstateEvent) -> Result<(), EstateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| EstateError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EstateError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| EstateError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Fans events out to every registered sink.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn dispatch(&self, event: &EstateEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    #[test]
    fn event_json_carries_type_tag() {
        let event = EstateEvent::triggered(&alice(), "deadman", Timestamp::from_secs(60));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"triggered\""));
        let restored: EstateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_type(), "triggered");
        assert_eq!(restored.principal(), "alice");
    }

    #[test]
    fn log_sink_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");
        let sink = LogSink::new(&path);

        sink.send(&EstateEvent::triggered(&alice(), "quorum", Timestamp::from_secs(1)))
            .unwrap();
        sink.send(&EstateEvent::sunset_stage(
            &alice(),
            "initiated",
            false,
            Timestamp::from_secs(2),
        ))
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    struct FailingSink;

    impl NotificationSink for FailingSink {
        fn send(&self, _event: &EstateEvent) -> Result<(), EstateError> {
            Err(EstateError::NotificationError("down".into()))
        }
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(FailingSink));
        dispatcher.add_sink(Box::new(LogSink::new(&path)));

        dispatcher.dispatch(&EstateEvent::triggered(&alice(), "oracle", Timestamp::from_secs(1)));
        assert!(fs::read_to_string(&path).unwrap().contains("triggered"));
    }
}
