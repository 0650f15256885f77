//! Event emission system.
//!
//! Committed ledger events are pushed to subscribers as JSON-RPC
//! notifications. Each subscriber has an independent buffer; a subscriber
//! that falls behind by more than the buffer loses the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use yieldgate_types::{ClaimId, LedgerEvent};

/// An event emitted by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "ClaimFinalized", "DaemonStarted").
    pub event_type: String,
    /// Sequence number of the command that produced it; 0 for system events.
    pub seq: u64,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Wrap a committed ledger event.
    pub fn from_ledger(seq: u64, timestamp: u64, event: &LedgerEvent) -> Self {
        Self {
            event_type: event.name().to_string(),
            seq,
            timestamp,
            payload: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        }
    }

    /// A daemon lifecycle event.
    pub fn system(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            seq: 0,
            timestamp: yieldgate_db::unix_now(),
            payload,
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "attestor", "claim", "vault", "system".
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Only events about these claims. Events without a claim pass.
    #[serde(default)]
    pub claim_ids: Option<Vec<ClaimId>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Emit the events of one committed command.
    pub fn emit_committed(&self, seq: u64, timestamp: u64, events: &[LedgerEvent]) {
        for event in events {
            self.emit(Event::from_ledger(seq, timestamp, event));
        }
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let event_category = categorize_event(&event.event_type);
            if !categories.iter().any(|c| c == event_category) {
                return false;
            }
        }

        if let Some(ref claim_ids) = self.claim_ids {
            if let Some(id) = event.payload.get("claim_id").and_then(|v| v.as_u64()) {
                if !claim_ids.contains(&id) {
                    return false;
                }
            }
        }

        true
    }
}

/// Categorize an event type into a category.
pub fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("Attestor") || s.starts_with("Stake") || s.starts_with("Rewards") => {
            "attestor"
        }
        s if s.starts_with("Claim") => "claim",
        "Deposited" | "Withdrawn" | "CapitalCommitted" | "CommitmentRefunded"
        | "YieldUnlocked" => "vault",
        _ => "system",
    }
}
