#![forbid(unsafe_code)]

use serde_json::{Map, Value};

use gable_contracts::record::RecordUpdate;
use gable_contracts::section::{SectionDraft, SectionName, SignatureAsset};
use gable_contracts::session::SectionContext;
use gable_contracts::validation::ValidationOutcome;
use gable_contracts::{MonotonicTimeNs, ReasonCodeId};
use gable_engines::backend::{BackendError, OnboardingBackend, UploadRequest};
use gable_engines::signature::{capture, CaptureError, InkCanvas, SignatureKind};
use gable_store::session::{dedupe_hex, SessionStore};
use gable_store::StorageError;

use crate::completion::compute_completion;
use crate::reason_codes;
use crate::required::{resolve_required, signature_requirements};
use crate::validate::{validate, SignatureExpectation};
use crate::WizardError;

// Draft fields that double as profile data; mirrored to the user-profile
// record on a broker-info save.
const PROFILE_FIELDS: &[&str] = &[
    "firstname",
    "lastname",
    "workEmail",
    "workPhone",
    "homeAddress",
];

/// How the page supplies a signature for this save: fresh ink, or one-click
/// reuse of the asset already stored on the applicant's profile.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureInput {
    Ink(InkCanvas),
    ReuseStored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionSaveRequest {
    pub now: MonotonicTimeNs,
    pub section: SectionName,
    pub ctx: SectionContext,
    pub signature: Option<SignatureInput>,
    pub initials: Option<SignatureInput>,
}

impl SectionSaveRequest {
    pub fn plain(now: MonotonicTimeNs, section: SectionName, ctx: SectionContext) -> Self {
        Self {
            now,
            section,
            ctx,
            signature: None,
            initials: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOk {
    pub schema_version: gable_contracts::SchemaVersion,
    pub section: SectionName,
    pub reason_code: ReasonCodeId,
    pub outcome: ValidationOutcome,
    pub is_form_complete: bool,
    pub completion_percent: u8,
    /// True exactly once: the save that carried the record from below 100
    /// to 100 percent. Re-saving an already-complete record never re-emits.
    pub finished_redirect: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRefuse {
    pub reason_code: ReasonCodeId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveResponse {
    Ok(SaveOk),
    Refuse(SaveRefuse),
}

fn describe_backend_error(err: &BackendError) -> String {
    match err {
        BackendError::MissingToken => "no API credential is present".to_string(),
        BackendError::Unauthorized => "the API credential was rejected".to_string(),
        BackendError::InvalidBaseUrl { raw } => format!("bad endpoint: {raw}"),
        BackendError::Http { status } => format!("the backend answered HTTP {status}"),
        BackendError::Transport { detail } => format!("network failure: {detail}"),
        BackendError::MalformedResponse { detail } => format!("bad response: {detail}"),
    }
}

fn describe_capture_error(kind: SignatureKind, err: &CaptureError) -> String {
    let what = kind.display_name();
    match err {
        CaptureError::CanvasNotInitialized => {
            format!("{what} pad is not ready; reload the page and try again")
        }
        CaptureError::EmptyCanvas => format!("please add a {what} before saving"),
        CaptureError::InsufficientInk { .. } => {
            format!("please add a real {what}; the pad was cleared")
        }
        CaptureError::Encode { detail } => format!("{what} image could not be encoded: {detail}"),
    }
}

fn refuse(reason_code: ReasonCodeId, message: impl Into<String>) -> SaveResponse {
    SaveResponse::Refuse(SaveRefuse {
        reason_code,
        message: message.into(),
    })
}

/// The section save chain: validate, resolve signatures, upload, persist,
/// synchronize. Steps are strictly sequential; every network call is behind
/// the `save_in_flight` latch so a page cannot dispatch a re-entrant save.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSaveRuntime;

impl SectionSaveRuntime {
    pub fn run<B: OnboardingBackend>(
        &self,
        store: &mut SessionStore,
        backend: &B,
        req: &mut SectionSaveRequest,
    ) -> Result<SaveResponse, WizardError> {
        // Lock and terminal checks come before any network dispatch.
        if store.is_locked() {
            store.record_audit(
                req.now,
                format!("save:{}", req.section.as_str()),
                "EDITING",
                "REFUSED_LOCKED",
                reason_codes::WIZ_REFUSE_LOCKED,
                None,
            );
            return Ok(refuse(
                reason_codes::WIZ_REFUSE_LOCKED,
                "This onboarding record is locked. Request an unlock from your administrator to continue.",
            ));
        }
        if store.is_submitted() {
            store.record_audit(
                req.now,
                format!("save:{}", req.section.as_str()),
                "EDITING",
                "REFUSED_SUBMITTED",
                reason_codes::WIZ_REFUSE_SUBMITTED,
                None,
            );
            return Ok(refuse(
                reason_codes::WIZ_REFUSE_SUBMITTED,
                "This onboarding has already been submitted and can no longer be edited.",
            ));
        }

        match store.begin_save() {
            Ok(()) => {}
            Err(StorageError::SaveInFlight) => {
                return Ok(refuse(
                    reason_codes::WIZ_REFUSE_SAVE_IN_FLIGHT,
                    "A save is already in progress.",
                ));
            }
            Err(other) => return Err(other.into()),
        }
        let out = self.run_chain(store, backend, req);
        store.finish_save();
        out
    }

    fn run_chain<B: OnboardingBackend>(
        &self,
        store: &mut SessionStore,
        backend: &B,
        req: &mut SectionSaveRequest,
    ) -> Result<SaveResponse, WizardError> {
        let mut draft = store.draft(req.section);
        let (signature_required, initials_required) = signature_requirements(req.section);

        // Signature resolution happens on a working copy: a failed capture or
        // upload must not write a partial asset reference anywhere. A rejected
        // ink canvas is cleared by the capture step.
        if signature_required {
            match resolve_asset(
                store,
                backend,
                SignatureKind::Signature,
                req.signature.as_mut(),
                draft.signature.as_ref(),
            ) {
                Ok(Some(asset)) => {
                    store.attach_profile_signature(asset.clone())?;
                    draft.signature = Some(asset);
                }
                Ok(None) => {}
                Err(r) => return Ok(SaveResponse::Refuse(r)),
            }
        }
        if initials_required {
            match resolve_asset(
                store,
                backend,
                SignatureKind::Initials,
                req.initials.as_mut(),
                draft.initials.as_ref(),
            ) {
                Ok(Some(asset)) => {
                    store.attach_profile_initials(asset.clone())?;
                    draft.initials = Some(asset);
                }
                Ok(None) => {}
                Err(r) => return Ok(SaveResponse::Refuse(r)),
            }
        }

        let required = resolve_required(req.section, &draft, &req.ctx)?;
        let outcome = validate(
            &draft,
            &required,
            SignatureExpectation {
                required: signature_required,
                present: draft.signature.is_some(),
            },
            SignatureExpectation {
                required: initials_required,
                present: draft.initials.is_some(),
            },
        )?;

        // The completion invariant: is_form_complete reflects this pass's
        // outcome, never an optimistic value.
        draft.is_form_complete = outcome.is_valid();
        draft.first_save_complete = true;

        let completion =
            compute_completion(&store.statuses(), req.section, !outcome.is_valid());
        let prior_percent = store.completion_percent();

        // Broker-info data doubles as profile data; mirror it first. The two
        // PUTs are sequential and non-transactional: a record failure after a
        // profile success refuses with a distinct code and leaves the session
        // unmerged so the next save reconverges both records.
        let mut profile_mirrored = false;
        if req.section == SectionName::BrokerInfo {
            let fields = profile_subset(&draft)?;
            if !fields.is_empty() {
                if let Err(err) = backend.put_profile(&store.profile().user_id, &fields) {
                    let code = if err.is_auth() {
                        reason_codes::WIZ_REFUSE_AUTH_REQUIRED
                    } else {
                        reason_codes::WIZ_REFUSE_BACKEND
                    };
                    return Ok(refuse(
                        code,
                        format!("profile update failed: {}", describe_backend_error(&err)),
                    ));
                }
                profile_mirrored = true;
            }
        }

        let update = RecordUpdate {
            completion_percent: completion,
            is_submitted: store.is_submitted(),
            last_form_visited: Some(req.section),
            section: req.section,
            draft: draft.clone(),
        };
        let record = match backend.put_record(store.record_id(), &update) {
            Ok(record) => record,
            Err(err) => {
                let code = if err.is_auth() {
                    reason_codes::WIZ_REFUSE_AUTH_REQUIRED
                } else if profile_mirrored {
                    reason_codes::WIZ_REFUSE_PROFILE_SYNC_PARTIAL
                } else {
                    reason_codes::WIZ_REFUSE_BACKEND
                };
                if profile_mirrored {
                    store.record_audit(
                        req.now,
                        format!("save:{}", req.section.as_str()),
                        "PROFILE_SAVED",
                        "RECORD_SAVE_FAILED",
                        reason_codes::WIZ_REFUSE_PROFILE_SYNC_PARTIAL,
                        None,
                    );
                }
                return Ok(refuse(
                    code,
                    format!("save failed: {}", describe_backend_error(&err)),
                ));
            }
        };

        store.apply_saved_section(req.section, draft, &record)?;

        let finished_redirect = prior_percent < 100 && record.completion_percent == 100;
        let reason_code = if finished_redirect {
            reason_codes::WIZ_OK_COMPLETION_REDIRECT
        } else if outcome.is_valid() {
            reason_codes::WIZ_OK_SECTION_SAVED
        } else {
            reason_codes::WIZ_OK_SECTION_SAVED_INCOMPLETE
        };

        let to = if finished_redirect {
            "COMPLETED"
        } else if outcome.is_valid() {
            "SAVED"
        } else {
            "SAVED_INCOMPLETE"
        };
        let dedupe = dedupe_hex(&format!(
            "save:{}:{}:{}",
            store.record_id().as_str(),
            req.section.as_str(),
            req.now.0
        ));
        store.record_audit(
            req.now,
            format!("save:{}", req.section.as_str()),
            "EDITING",
            to,
            reason_code,
            Some(dedupe),
        );

        Ok(SaveResponse::Ok(SaveOk {
            schema_version: crate::WIZARD_CONTRACT_VERSION,
            section: req.section,
            reason_code,
            outcome,
            is_form_complete: record
                .section(req.section)
                .map(|d| d.is_form_complete)
                .unwrap_or(false),
            completion_percent: record.completion_percent,
            finished_redirect,
        }))
    }
}

/// Resolves a signature input to an asset reference. Returns `Ok(None)` when
/// the draft already carries an asset or no input was supplied; the one-click
/// reuse path never uploads, so re-invoking it cannot create duplicates.
fn resolve_asset<B: OnboardingBackend>(
    store: &SessionStore,
    backend: &B,
    kind: SignatureKind,
    input: Option<&mut SignatureInput>,
    existing: Option<&SignatureAsset>,
) -> Result<Option<SignatureAsset>, SaveRefuse> {
    if existing.is_some() {
        return Ok(None);
    }
    let Some(input) = input else {
        return Ok(None);
    };
    match input {
        SignatureInput::ReuseStored => {
            let stored = match kind {
                SignatureKind::Signature => store.profile().signature.as_ref(),
                SignatureKind::Initials => store.profile().initials.as_ref(),
            };
            match stored {
                Some(asset) => Ok(Some(asset.clone())),
                None => Err(SaveRefuse {
                    reason_code: reason_codes::WIZ_REFUSE_SIGNATURE_CAPTURE,
                    message: format!(
                        "no stored {} is available to reuse",
                        kind.display_name()
                    ),
                }),
            }
        }
        SignatureInput::Ink(canvas) => {
            let captured = capture(canvas).map_err(|err| SaveRefuse {
                reason_code: reason_codes::WIZ_REFUSE_SIGNATURE_CAPTURE,
                message: describe_capture_error(kind, &err),
            })?;
            let upload = UploadRequest::for_applicant(
                kind,
                &store.profile().full_name(),
                captured.png,
            );
            backend.upload(&upload).map(Some).map_err(|err| SaveRefuse {
                reason_code: if err.is_auth() {
                    reason_codes::WIZ_REFUSE_AUTH_REQUIRED
                } else {
                    reason_codes::WIZ_REFUSE_UPLOAD_FAILED
                },
                message: format!("upload failed: {}", describe_backend_error(&err)),
            })
        }
    }
}

fn profile_subset(draft: &SectionDraft) -> Result<Map<String, Value>, WizardError> {
    let mut fields = Map::new();
    for name in PROFILE_FIELDS {
        let id = gable_contracts::ids::FieldId::new(*name)?;
        if let Some(value) = draft.get(&id) {
            let json = serde_json::to_value(value).map_err(|_| {
                WizardError::ContractViolation(
                    gable_contracts::ContractViolation::InvalidValue {
                        field: "profile_subset",
                        reason: "field value is not serializable",
                    },
                )
            })?;
            fields.insert((*name).to_string(), json);
        }
    }
    Ok(fields)
}
