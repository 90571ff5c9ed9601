#![forbid(unsafe_code)]

pub mod completion;
pub mod guard;
pub mod hydrate;
pub mod required;
pub mod save;
pub mod validate;

use gable_contracts::{ContractViolation, SchemaVersion};
use gable_store::StorageError;

pub const WIZARD_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub mod reason_codes {
    use gable_contracts::ReasonCodeId;

    // Wizard-controller reason-code namespace.
    pub const WIZ_OK_SECTION_SAVED: ReasonCodeId = ReasonCodeId(0x5A00_0001);
    pub const WIZ_OK_SECTION_SAVED_INCOMPLETE: ReasonCodeId = ReasonCodeId(0x5A00_0002);
    pub const WIZ_OK_LEAVE_DISCARDED: ReasonCodeId = ReasonCodeId(0x5A00_0003);
    pub const WIZ_OK_COMPLETION_REDIRECT: ReasonCodeId = ReasonCodeId(0x5A00_0004);
    pub const WIZ_OK_HYDRATED: ReasonCodeId = ReasonCodeId(0x5A00_0005);
    pub const WIZ_OK_NAVIGATION: ReasonCodeId = ReasonCodeId(0x5A00_0006);

    pub const WIZ_REFUSE_LOCKED: ReasonCodeId = ReasonCodeId(0x5A00_00F1);
    pub const WIZ_REFUSE_SUBMITTED: ReasonCodeId = ReasonCodeId(0x5A00_00F2);
    pub const WIZ_REFUSE_SAVE_IN_FLIGHT: ReasonCodeId = ReasonCodeId(0x5A00_00F3);
    pub const WIZ_REFUSE_AUTH_REQUIRED: ReasonCodeId = ReasonCodeId(0x5A00_00F4);
    pub const WIZ_REFUSE_SIGNATURE_CAPTURE: ReasonCodeId = ReasonCodeId(0x5A00_00F5);
    pub const WIZ_REFUSE_UPLOAD_FAILED: ReasonCodeId = ReasonCodeId(0x5A00_00F6);
    pub const WIZ_REFUSE_PROFILE_SYNC_PARTIAL: ReasonCodeId = ReasonCodeId(0x5A00_00F7);
    pub const WIZ_REFUSE_BACKEND: ReasonCodeId = ReasonCodeId(0x5A00_00F8);
}

/// Developer-facing failures: contract or storage violations that indicate a
/// misconfigured controller, never a user-fixable condition. User-refusable
/// conditions ride the `Refuse` response variants instead.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardError {
    ContractViolation(ContractViolation),
    Storage(StorageError),
}

impl From<ContractViolation> for WizardError {
    fn from(v: ContractViolation) -> Self {
        WizardError::ContractViolation(v)
    }
}

impl From<StorageError> for WizardError {
    fn from(e: StorageError) -> Self {
        WizardError::Storage(e)
    }
}
