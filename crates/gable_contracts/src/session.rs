#![forbid(unsafe_code)]

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeferredKind {
    /// Idle / reset value. No page acts on it.
    #[default]
    Stay,
    /// Run the active page's save routine, then navigate.
    Save,
    /// Discard unsaved edits and navigate immediately.
    Leave,
}

/// The one-slot deferred navigation command. Queued by the navigation chrome
/// when a departure is attempted with unsaved edits; consumed exactly once,
/// then reset to `Stay` so it cannot replay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeferredAction {
    pub kind: DeferredKind,
    pub route: Option<String>,
    pub event: Option<String>,
}

impl DeferredAction {
    pub fn save(route: impl Into<String>, event: Option<String>) -> Self {
        Self {
            kind: DeferredKind::Save,
            route: Some(route.into()),
            event,
        }
    }

    pub fn leave(route: impl Into<String>) -> Self {
        Self {
            kind: DeferredKind::Leave,
            route: Some(route.into()),
            event: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.kind == DeferredKind::Stay
    }
}

/// Read-model mirror of one section as the session sees it: the flags the
/// navigation chrome and later pages consult without re-fetching the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionStatus {
    pub is_form_complete: bool,
    pub first_save_complete: bool,
}

/// Ambient per-applicant context feeding required-field resolution. These
/// inputs live outside the drafts (license status from the profile record,
/// province from the selected address region).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionContext {
    pub licensed: bool,
    pub province: Option<String>,
}

impl SectionContext {
    pub fn province_is(&self, name: &str) -> bool {
        self.province.as_deref().map(str::trim) == Some(name)
    }
}
