//! Audit logging — structured security event logging.
//!
//! Records security-relevant events: every tool execution with its duration,
//! and every denial from the sandbox or the command policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub agent: String,
    pub outcome: AuditOutcome,
    pub duration_ms: Option<u64>,
    pub details: Option<String>,
}

/// Types of auditable security events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A tool was dispatched
    ToolExecution { tool_name: String },
    /// A path argument was rejected by the workspace sandbox
    PathDenied { path: String },
    /// A command was rejected by the command policy
    CommandDenied { command: String },
    /// A URL was rejected by the fetch tool
    UrlDenied { url: String },
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Trait for audit log sinks (where events are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// In-memory audit logger with optional forwarding sinks.
pub struct AuditLogger {
    entries: std::sync::Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().unwrap().len();
        f.debug_struct("AuditLogger")
            .field("entry_count", &count)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
            sinks: Vec::new(),
        }
    }

    /// Create a new audit logger with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
            sinks,
        }
    }

    /// Record an audit event.
    pub fn log(
        &self,
        event: AuditEvent,
        agent: &str,
        outcome: AuditOutcome,
        duration_ms: Option<u64>,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            agent: agent.into(),
            outcome,
            duration_ms,
            details,
        };

        self.entries.lock().unwrap().push(entry.clone());
        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries filtered by outcome.
    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            event = ?entry.event,
            agent = %entry.agent,
            outcome = ?entry.outcome,
            duration_ms = ?entry.duration_ms,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_and_retrieve_entries() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::ToolExecution {
                tool_name: "read_file".into(),
            },
            "scribe",
            AuditOutcome::Success,
            Some(12),
            None,
        );
        logger.log(
            AuditEvent::PathDenied {
                path: "../../etc/passwd".into(),
            },
            "scribe",
            AuditOutcome::Denied,
            None,
            Some("outside workspace".into()),
        );

        assert_eq!(logger.count(), 2);
        let entries = logger.entries();
        assert_eq!(entries[0].duration_ms, Some(12));
        assert_eq!(entries[1].outcome, AuditOutcome::Denied);
    }

    #[test]
    fn filter_by_outcome() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::ToolExecution {
                tool_name: "run_command".into(),
            },
            "scribe",
            AuditOutcome::Success,
            Some(5),
            None,
        );
        logger.log(
            AuditEvent::CommandDenied {
                command: "rm -rf /".into(),
            },
            "scribe",
            AuditOutcome::Denied,
            None,
            None,
        );

        assert_eq!(logger.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
        assert_eq!(logger.entries_by_outcome(&AuditOutcome::Success).len(), 1);
    }

    #[test]
    fn event_variants_serialize() {
        let events = vec![
            AuditEvent::ToolExecution {
                tool_name: "fetch_url".into(),
            },
            AuditEvent::PathDenied {
                path: "/etc/shadow".into(),
            },
            AuditEvent::CommandDenied {
                command: "curl evil".into(),
            },
            AuditEvent::UrlDenied {
                url: "file:///etc/passwd".into(),
            },
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let round_tripped: AuditEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(round_tripped, event);
        }
    }

    #[test]
    fn custom_sink_receives_events() {
        use std::sync::{Arc, Mutex};

        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.agent.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = TestSink {
            received: received.clone(),
        };
        let logger = AuditLogger::with_sinks(vec![Box::new(sink)]);

        logger.log(
            AuditEvent::ToolExecution {
                tool_name: "save_memory".into(),
            },
            "scribe",
            AuditOutcome::Success,
            Some(3),
            None,
        );

        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
