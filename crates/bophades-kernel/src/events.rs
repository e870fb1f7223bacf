//! Structured event log for replay and audit

use bophades_types::Address;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelEvent {
    /// Block timestamp at emission
    pub timestamp: u64,
    /// Wall-clock time the event was recorded
    pub recorded_at: DateTime<Utc>,
    pub emitter: Address,
    pub name: String,
    pub data: serde_json::Value,
}

/// Append-only event list, optionally bounded
#[derive(Debug, Default)]
pub struct EventLog {
    events: RwLock<Vec<KernelEvent>>,
    max_entries: Option<usize>,
}

impl EventLog {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_entries,
        }
    }

    pub fn record(&self, timestamp: u64, emitter: Address, name: impl Into<String>, data: serde_json::Value) {
        let mut events = self.events.write();
        events.push(KernelEvent {
            timestamp,
            recorded_at: Utc::now(),
            emitter,
            name: name.into(),
            data,
        });
        if let Some(max) = self.max_entries {
            if events.len() > max {
                let overflow = events.len() - max;
                events.drain(0..overflow);
            }
        }
    }

    pub fn events(&self) -> Vec<KernelEvent> {
        self.events.read().clone()
    }

    /// Events with the given name, oldest first
    pub fn named(&self, name: &str) -> Vec<KernelEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.name == name)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<KernelEvent> {
        self.events.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
