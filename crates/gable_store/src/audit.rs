#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use gable_contracts::{MonotonicTimeNs, ReasonCodeId};

/// One controller state transition, recorded for diagnosis. The trail is the
/// controller's observability surface: every save outcome and navigation
/// decision lands here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub at: MonotonicTimeNs,
    pub scope: String,
    pub from: &'static str,
    pub to: &'static str,
    pub reason_code: ReasonCodeId,
    pub dedupe_key: Option<String>,
}

/// Append-only transition ledger with idempotent writes: an event carrying an
/// already-seen dedupe key is dropped, so retried chains do not double-log.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
    dedupe_keys: BTreeSet<String>,
}

impl AuditTrail {
    pub fn record(&mut self, event: AuditEvent) -> bool {
        if let Some(key) = &event.dedupe_key {
            if !self.dedupe_keys.insert(key.clone()) {
                return false;
            }
        }
        self.events.push(event);
        true
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
