#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use gable_contracts::ids::{FieldId, RecordId};
use gable_contracts::record::{OnboardingRecord, UserProfile};
use gable_contracts::section::{FieldValue, SectionDraft, SectionName, SignatureAsset};
use gable_contracts::session::{DeferredAction, SectionStatus};
use gable_contracts::{ContractViolation, MonotonicTimeNs, ReasonCodeId, Validate};

use crate::audit::{AuditEvent, AuditTrail};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    SaveInFlight,
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Stable short hex for audit dedupe keys built from long inputs.
pub fn dedupe_hex(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// The process-wide session: the single shared mutable resource of the
/// controller. Exactly one writer at a time (enforced by `&mut` receivers);
/// every page reads it for the dirty flag, lock state and completion mirror.
#[derive(Debug, Clone)]
pub struct SessionStore {
    profile: UserProfile,
    record_id: RecordId,
    forms: BTreeMap<SectionName, SectionDraft>,
    completion_percent: u8,
    is_submitted: bool,
    is_locked: bool,
    is_form_saved: bool,
    save_in_flight: bool,
    last_form_visited: Option<SectionName>,
    before_leave: DeferredAction,
    audit: AuditTrail,
}

impl SessionStore {
    pub fn new(profile: UserProfile, record_id: RecordId) -> Result<Self, StorageError> {
        profile.validate()?;
        record_id.validate()?;
        Ok(Self {
            profile,
            record_id,
            forms: BTreeMap::new(),
            completion_percent: 0,
            is_submitted: false,
            is_locked: false,
            is_form_saved: true,
            save_in_flight: false,
            last_form_visited: None,
            before_leave: DeferredAction::default(),
            audit: AuditTrail::default(),
        })
    }

    /// Seed the session mirror from a freshly fetched backend record.
    pub fn hydrate(&mut self, record: &OnboardingRecord) -> Result<(), StorageError> {
        record.validate()?;
        self.forms = record.sections.clone();
        self.completion_percent = record.completion_percent;
        self.is_submitted = record.is_submitted;
        self.is_locked = record.is_locked;
        self.last_form_visited = record.last_form_visited;
        self.is_form_saved = true;
        self.before_leave = DeferredAction::default();
        Ok(())
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn draft(&self, section: SectionName) -> SectionDraft {
        self.forms.get(&section).cloned().unwrap_or_default()
    }

    pub fn section_status(&self, section: SectionName) -> SectionStatus {
        match self.forms.get(&section) {
            Some(d) => SectionStatus {
                is_form_complete: d.is_form_complete,
                first_save_complete: d.first_save_complete,
            },
            None => SectionStatus::default(),
        }
    }

    pub fn statuses(&self) -> BTreeMap<SectionName, SectionStatus> {
        SectionName::ALL
            .into_iter()
            .map(|s| (s, self.section_status(s)))
            .collect()
    }

    /// Field mutation entry point. Dirty-tracking contract: any edit flips
    /// `is_form_saved` to false so the navigation guard knows a save is owed.
    pub fn set_field(
        &mut self,
        section: SectionName,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), StorageError> {
        field.validate()?;
        self.forms.entry(section).or_default().set(field, value);
        self.is_form_saved = false;
        Ok(())
    }

    pub fn is_form_saved(&self) -> bool {
        self.is_form_saved
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    pub fn completion_percent(&self) -> u8 {
        self.completion_percent
    }

    pub fn last_form_visited(&self) -> Option<SectionName> {
        self.last_form_visited
    }

    pub fn set_last_form_visited(&mut self, section: SectionName) {
        self.last_form_visited = Some(section);
    }

    /// Marks the start of a save chain and refuses re-entry while one is in
    /// flight. The matching `finish_save` must run on every exit path.
    pub fn begin_save(&mut self) -> Result<(), StorageError> {
        if self.save_in_flight {
            return Err(StorageError::SaveInFlight);
        }
        self.save_in_flight = true;
        Ok(())
    }

    pub fn finish_save(&mut self) {
        self.save_in_flight = false;
    }

    pub fn save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    /// The draft/session synchronizer's single write point: merge the saved
    /// draft and copy the record's aggregate flags into the mirror.
    pub fn apply_saved_section(
        &mut self,
        section: SectionName,
        draft: SectionDraft,
        record: &OnboardingRecord,
    ) -> Result<(), StorageError> {
        record.validate()?;
        self.forms.insert(section, draft);
        self.completion_percent = record.completion_percent;
        self.is_submitted = record.is_submitted;
        self.is_locked = record.is_locked;
        self.last_form_visited = Some(section);
        self.is_form_saved = true;
        Ok(())
    }

    /// Stored-asset writeback after a successful upload, so the next
    /// signature prompt can offer one-click reuse.
    pub fn attach_profile_signature(&mut self, asset: SignatureAsset) -> Result<(), StorageError> {
        asset.validate()?;
        self.profile.signature = Some(asset);
        Ok(())
    }

    pub fn attach_profile_initials(&mut self, asset: SignatureAsset) -> Result<(), StorageError> {
        asset.validate()?;
        self.profile.initials = Some(asset);
        Ok(())
    }

    /// Explicit discard: the user chose to leave without saving. Suppresses a
    /// duplicate prompt by marking the session clean.
    pub fn mark_clean(&mut self) {
        self.is_form_saved = true;
    }

    pub fn queue_before_leave(&mut self, action: DeferredAction) {
        self.before_leave = action;
    }

    pub fn before_leave(&self) -> &DeferredAction {
        &self.before_leave
    }

    /// Consumes the queued action, resetting the slot to `Stay` so a handled
    /// command can never replay.
    pub fn take_before_leave(&mut self) -> DeferredAction {
        std::mem::take(&mut self.before_leave)
    }

    pub fn record_audit(
        &mut self,
        at: MonotonicTimeNs,
        scope: impl Into<String>,
        from: &'static str,
        to: &'static str,
        reason_code: ReasonCodeId,
        dedupe_key: Option<String>,
    ) -> bool {
        self.audit.record(AuditEvent {
            at,
            scope: scope.into(),
            from,
            to,
            reason_code,
            dedupe_key,
        })
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
