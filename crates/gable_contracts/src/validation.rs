#![forbid(unsafe_code)]

use serde::Serialize;

use crate::ids::FieldId;

/// One outstanding required-field violation, carrying the human-readable
/// label shown in the inline error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub id: FieldId,
    pub label: String,
}

/// Ordered violations from one validation pass. Empty means valid. Order is
/// the required-field declaration order, never sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationOutcome {
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, id: FieldId, label: impl Into<String>) {
        self.violations.push(Violation {
            id,
            label: label.into(),
        });
    }
}
