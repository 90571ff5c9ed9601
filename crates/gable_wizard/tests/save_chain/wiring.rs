#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};

use gable_contracts::ids::{FieldId, RecordId, UserId};
use gable_contracts::record::{OnboardingRecord, RecordUpdate, UserProfile};
use gable_contracts::section::{FieldValue, SectionDraft, SectionName, SignatureAsset};
use gable_contracts::session::SectionContext;
use gable_contracts::MonotonicTimeNs;
use gable_engines::backend::{BackendError, OnboardingBackend, UploadRequest};
use gable_engines::signature::{InkCanvas, MIN_INK_SAMPLES};
use gable_store::session::SessionStore;
use gable_wizard::reason_codes;
use gable_wizard::save::{
    SaveResponse, SectionSaveRequest, SectionSaveRuntime, SignatureInput,
};

struct FakeBackend {
    record: RefCell<OnboardingRecord>,
    upload_calls: Cell<u32>,
    profile_puts: Cell<u32>,
    record_puts: Cell<u32>,
    fail_upload: Cell<bool>,
    fail_profile_put: Cell<bool>,
    fail_record_put: Cell<bool>,
}

impl FakeBackend {
    fn new(record: OnboardingRecord) -> Self {
        Self {
            record: RefCell::new(record),
            upload_calls: Cell::new(0),
            profile_puts: Cell::new(0),
            record_puts: Cell::new(0),
            fail_upload: Cell::new(false),
            fail_profile_put: Cell::new(false),
            fail_record_put: Cell::new(false),
        }
    }
}

impl OnboardingBackend for FakeBackend {
    fn fetch_record(&self, _id: &RecordId) -> Result<OnboardingRecord, BackendError> {
        Ok(self.record.borrow().clone())
    }

    fn put_record(
        &self,
        _id: &RecordId,
        update: &RecordUpdate,
    ) -> Result<OnboardingRecord, BackendError> {
        self.record_puts.set(self.record_puts.get() + 1);
        if self.fail_record_put.get() {
            return Err(BackendError::Http { status: 500 });
        }
        let mut record = self.record.borrow_mut();
        record.sections.insert(update.section, update.draft.clone());
        record.completion_percent = update.completion_percent;
        record.is_submitted = update.is_submitted;
        record.last_form_visited = update.last_form_visited;
        Ok(record.clone())
    }

    fn put_profile(
        &self,
        _user: &UserId,
        _fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), BackendError> {
        if self.fail_profile_put.get() {
            return Err(BackendError::Http { status: 502 });
        }
        self.profile_puts.set(self.profile_puts.get() + 1);
        Ok(())
    }

    fn upload(&self, request: &UploadRequest) -> Result<SignatureAsset, BackendError> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        if self.fail_upload.get() {
            return Err(BackendError::Http { status: 500 });
        }
        Ok(SignatureAsset {
            url: format!("https://files.test/upload_{}.png", self.upload_calls.get()),
            name: request.file_name.clone(),
            created_at: "2024-05-01T00:00:00Z".to_string(),
        })
    }
}

fn profile() -> UserProfile {
    UserProfile {
        user_id: UserId::new("user_broker_1").unwrap(),
        first_name: "Ada".to_string(),
        last_name: "Marsh".to_string(),
        work_email: "ada.marsh@example.test".to_string(),
        signature: None,
        initials: None,
    }
}

fn field(s: &str) -> FieldId {
    FieldId::new(s).unwrap()
}

fn seeded(
    record: OnboardingRecord,
) -> (SessionStore, FakeBackend, SectionSaveRuntime) {
    let mut store =
        SessionStore::new(profile(), record.id.clone()).unwrap();
    store.hydrate(&record).unwrap();
    (store, FakeBackend::new(record), SectionSaveRuntime)
}

fn base_record() -> OnboardingRecord {
    OnboardingRecord::v1(RecordId::new("rec_1").unwrap())
}

fn req(section: SectionName) -> SectionSaveRequest {
    SectionSaveRequest::plain(MonotonicTimeNs(10), section, SectionContext::default())
}

fn inked_canvas(samples: usize) -> InkCanvas {
    let mut canvas = InkCanvas::new(400, 150).unwrap();
    for i in 0..samples {
        canvas.add_sample(30.0 + i as f32, 60.0 + (i % 9) as f32);
    }
    canvas
}

#[test]
fn missing_required_field_is_reported_but_the_draft_still_persists() {
    let (mut store, backend, runtime) = seeded(base_record());
    store
        .set_field(
            SectionName::WebsiteInfo,
            field("websiteDisplayName"),
            FieldValue::Text("Ada Marsh Mortgages".to_string()),
        )
        .unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    let ok = match resp {
        SaveResponse::Ok(ok) => ok,
        other => panic!("expected Ok, got {other:?}"),
    };

    assert_eq!(ok.reason_code, reason_codes::WIZ_OK_SECTION_SAVED_INCOMPLETE);
    assert!(!ok.is_form_complete);
    assert_eq!(ok.outcome.violations.len(), 1);
    assert_eq!(ok.outcome.violations[0].label, "Biography");
    // The partial draft still reached the backend.
    assert_eq!(backend.record_puts.get(), 1);
    assert!(store.is_form_saved());
    assert!(store.section_status(SectionName::WebsiteInfo).first_save_complete);
}

#[test]
fn complete_section_saves_clean() {
    let (mut store, backend, runtime) = seeded(base_record());
    store
        .set_field(
            SectionName::WebsiteInfo,
            field("websiteDisplayName"),
            FieldValue::Text("Ada Marsh Mortgages".to_string()),
        )
        .unwrap();
    store
        .set_field(
            SectionName::WebsiteInfo,
            field("bio"),
            FieldValue::Text("Twenty years in lending.".to_string()),
        )
        .unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    let ok = match resp {
        SaveResponse::Ok(ok) => ok,
        other => panic!("expected Ok, got {other:?}"),
    };
    assert_eq!(ok.reason_code, reason_codes::WIZ_OK_SECTION_SAVED);
    assert!(ok.is_form_complete);
    assert!(ok.outcome.is_valid());
    assert_eq!(ok.completion_percent, 14); // 1 of 7
}

#[test]
fn locked_record_refuses_before_any_network_call() {
    let mut record = base_record();
    record.is_locked = true;
    let (mut store, backend, runtime) = seeded(record);

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_LOCKED);
            assert!(r.message.contains("unlock"));
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 0);
    assert_eq!(backend.profile_puts.get(), 0);
    assert_eq!(backend.upload_calls.get(), 0);
}

#[test]
fn submitted_record_refuses_edits() {
    let mut record = base_record();
    record.is_submitted = true;
    let (mut store, backend, runtime) = seeded(record);

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::Policies))
        .unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_SUBMITTED)
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 0);
    // The refusal lands in the ledger like every other save outcome.
    assert!(store
        .audit()
        .events()
        .iter()
        .any(|e| e.to == "REFUSED_SUBMITTED"
            && e.reason_code == reason_codes::WIZ_REFUSE_SUBMITTED));
}

#[test]
fn reentrant_save_is_refused_while_one_is_in_flight() {
    let (mut store, backend, runtime) = seeded(base_record());
    store.begin_save().unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_SAVE_IN_FLIGHT)
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 0);
}

#[test]
fn yes_declaration_with_empty_details_is_a_violation() {
    let (mut store, backend, runtime) = seeded(base_record());
    store
        .set_field(
            SectionName::Policies,
            field("declarationRegulatoryReview"),
            FieldValue::Flag(true),
        )
        .unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::Policies))
        .unwrap();
    let ok = match resp {
        SaveResponse::Ok(ok) => ok,
        other => panic!("expected Ok, got {other:?}"),
    };
    let labels: Vec<&str> = ok
        .outcome
        .violations
        .iter()
        .map(|v| v.label.as_str())
        .collect();
    assert!(labels.contains(&"Regulatory Review Details"));
    assert_eq!(backend.record_puts.get(), 1);
}

#[test]
fn insufficient_ink_refuses_without_uploading() {
    let (mut store, backend, runtime) = seeded(base_record());
    let mut request = req(SectionName::PaymentAuthorization);
    request.signature = Some(SignatureInput::Ink(inked_canvas(MIN_INK_SAMPLES - 1)));

    let resp = runtime.run(&mut store, &backend, &mut request).unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_SIGNATURE_CAPTURE);
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.upload_calls.get(), 0);
    assert_eq!(backend.record_puts.get(), 0);
    // The store draft was never touched, and the rejected pad was cleared
    // so the next attempt starts from a fresh stroke.
    assert!(store.draft(SectionName::PaymentAuthorization).signature.is_none());
    match request.signature {
        Some(SignatureInput::Ink(ref canvas)) => assert_eq!(canvas.sample_count(), 0),
        ref other => panic!("expected an ink input, got {other:?}"),
    }
}

#[test]
fn upload_failure_aborts_the_save_and_leaves_the_draft_unchanged() {
    let (mut store, backend, runtime) = seeded(base_record());
    backend.fail_upload.set(true);
    let mut request = req(SectionName::PaymentAuthorization);
    request.signature = Some(SignatureInput::Ink(inked_canvas(60)));

    let resp = runtime.run(&mut store, &backend, &mut request).unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_UPLOAD_FAILED);
            assert!(r.message.contains("500"));
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.upload_calls.get(), 1);
    assert_eq!(backend.record_puts.get(), 0);
    assert!(store.draft(SectionName::PaymentAuthorization).signature.is_none());
    assert!(store.profile().signature.is_none());
}

#[test]
fn one_click_reuse_never_uploads_and_is_idempotent() {
    let mut record = base_record();
    record.sections.insert(
        SectionName::PaymentAuthorization,
        SectionDraft::default(),
    );
    let (mut store, backend, runtime) = seeded(record);
    let stored = SignatureAsset {
        url: "https://files.test/sig_stored.png".to_string(),
        name: "Signature - Ada Marsh".to_string(),
        created_at: "2024-04-01T00:00:00Z".to_string(),
    };
    store.attach_profile_signature(stored.clone()).unwrap();

    let mut request = req(SectionName::PaymentAuthorization);
    request.signature = Some(SignatureInput::ReuseStored);

    runtime.run(&mut store, &backend, &mut request).unwrap();
    runtime.run(&mut store, &backend, &mut request).unwrap();

    assert_eq!(backend.upload_calls.get(), 0);
    let draft = store.draft(SectionName::PaymentAuthorization);
    assert_eq!(draft.signature.as_ref().map(|a| a.url.as_str()), Some(stored.url.as_str()));
}

#[test]
fn reuse_without_a_stored_asset_is_a_capture_refusal() {
    let (mut store, backend, runtime) = seeded(base_record());
    let mut request = req(SectionName::PaymentAuthorization);
    request.signature = Some(SignatureInput::ReuseStored);

    let resp = runtime.run(&mut store, &backend, &mut request).unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_SIGNATURE_CAPTURE)
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.upload_calls.get(), 0);
}

#[test]
fn inked_signature_uploads_once_and_seeds_the_profile_for_reuse() {
    let (mut store, backend, runtime) = seeded(base_record());
    let mut request = req(SectionName::PaymentAuthorization);
    request.signature = Some(SignatureInput::Ink(inked_canvas(80)));

    runtime.run(&mut store, &backend, &mut request).unwrap();

    assert_eq!(backend.upload_calls.get(), 1);
    let draft = store.draft(SectionName::PaymentAuthorization);
    let asset = draft.signature.expect("signature persisted");
    assert!(asset.name.starts_with("Signature - Ada Marsh"));
    // The profile now holds the asset, so the next section can one-click it.
    assert!(store.profile().signature.is_some());

    // Saving again with the same draft does not re-upload.
    let mut plain = req(SectionName::PaymentAuthorization);
    runtime.run(&mut store, &backend, &mut plain).unwrap();
    assert_eq!(backend.upload_calls.get(), 1);
}

#[test]
fn profile_put_failure_aborts_before_the_record_put() {
    let (mut store, backend, runtime) = seeded(base_record());
    backend.fail_profile_put.set(true);
    store
        .set_field(
            SectionName::BrokerInfo,
            field("firstname"),
            FieldValue::Text("Ada".to_string()),
        )
        .unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::BrokerInfo))
        .unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(r.reason_code, reason_codes::WIZ_REFUSE_BACKEND);
            assert!(r.message.contains("profile"));
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 0);
    assert!(!store.is_form_saved());
}

#[test]
fn record_put_failure_after_profile_put_is_a_partial_sync_refusal() {
    let (mut store, backend, runtime) = seeded(base_record());
    backend.fail_record_put.set(true);
    store
        .set_field(
            SectionName::BrokerInfo,
            field("firstname"),
            FieldValue::Text("Ada".to_string()),
        )
        .unwrap();

    let resp = runtime
        .run(&mut store, &backend, &mut req(SectionName::BrokerInfo))
        .unwrap();
    match resp {
        SaveResponse::Refuse(r) => {
            assert_eq!(
                r.reason_code,
                reason_codes::WIZ_REFUSE_PROFILE_SYNC_PARTIAL
            )
        }
        other => panic!("expected Refuse, got {other:?}"),
    }
    assert_eq!(backend.profile_puts.get(), 1);
    // The session mirror was not merged; the next save reconverges.
    assert!(!store.is_form_saved());
}

#[test]
fn finishing_the_last_section_redirects_exactly_once() {
    let mut record = base_record();
    for section in SectionName::ALL {
        if section == SectionName::WebsiteInfo {
            continue;
        }
        let mut draft = SectionDraft::default();
        draft.is_form_complete = true;
        draft.first_save_complete = true;
        record.sections.insert(section, draft);
    }
    record.completion_percent = 86;
    let (mut store, backend, runtime) = seeded(record);

    store
        .set_field(
            SectionName::WebsiteInfo,
            field("websiteDisplayName"),
            FieldValue::Text("Ada Marsh Mortgages".to_string()),
        )
        .unwrap();
    store
        .set_field(
            SectionName::WebsiteInfo,
            field("bio"),
            FieldValue::Text("Twenty years in lending.".to_string()),
        )
        .unwrap();

    let first = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    let ok = match first {
        SaveResponse::Ok(ok) => ok,
        other => panic!("expected Ok, got {other:?}"),
    };
    assert_eq!(ok.completion_percent, 100);
    assert!(ok.finished_redirect);
    assert_eq!(ok.reason_code, reason_codes::WIZ_OK_COMPLETION_REDIRECT);

    // Re-saving the already-complete record is a no-op, not a second
    // redirect.
    let second = runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    let ok = match second {
        SaveResponse::Ok(ok) => ok,
        other => panic!("expected Ok, got {other:?}"),
    };
    assert_eq!(ok.completion_percent, 100);
    assert!(!ok.finished_redirect);
}

#[test]
fn save_audits_the_transition() {
    let (mut store, backend, runtime) = seeded(base_record());
    runtime
        .run(&mut store, &backend, &mut req(SectionName::WebsiteInfo))
        .unwrap();
    let events = store.audit().events();
    assert!(events
        .iter()
        .any(|e| e.scope == "save:websiteInfo" && e.to == "SAVED_INCOMPLETE"));
}
