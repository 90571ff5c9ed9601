#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};

use gable_contracts::ids::{FieldId, RecordId, UserId};
use gable_contracts::record::{OnboardingRecord, RecordUpdate, UserProfile};
use gable_contracts::section::{FieldValue, SectionName, SignatureAsset};
use gable_contracts::session::{DeferredKind, SectionContext};
use gable_contracts::MonotonicTimeNs;
use gable_engines::backend::{BackendError, OnboardingBackend, UploadRequest};
use gable_store::session::SessionStore;
use gable_wizard::guard::{NavDecision, NavigationGuard};
use gable_wizard::reason_codes;
use gable_wizard::save::{SectionSaveRequest, SectionSaveRuntime};

struct FakeBackend {
    record: RefCell<OnboardingRecord>,
    record_puts: Cell<u32>,
    fail_record_put: Cell<bool>,
}

impl FakeBackend {
    fn new(record: OnboardingRecord) -> Self {
        Self {
            record: RefCell::new(record),
            record_puts: Cell::new(0),
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
            return Err(BackendError::Http { status: 503 });
        }
        let mut record = self.record.borrow_mut();
        record.sections.insert(update.section, update.draft.clone());
        record.completion_percent = update.completion_percent;
        record.last_form_visited = update.last_form_visited;
        Ok(record.clone())
    }

    fn put_profile(
        &self,
        _user: &UserId,
        _fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn upload(&self, _request: &UploadRequest) -> Result<SignatureAsset, BackendError> {
        Err(BackendError::Http { status: 500 })
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

fn seeded() -> (SessionStore, FakeBackend) {
    let record = OnboardingRecord::v1(RecordId::new("rec_1").unwrap());
    let mut store = SessionStore::new(profile(), record.id.clone()).unwrap();
    store.hydrate(&record).unwrap();
    (store, FakeBackend::new(record))
}

fn dirty(store: &mut SessionStore) {
    store
        .set_field(
            SectionName::WebsiteInfo,
            FieldId::new("websiteDisplayName").unwrap(),
            FieldValue::Text("Ada Marsh Mortgages".to_string()),
        )
        .unwrap();
    store
        .set_field(
            SectionName::WebsiteInfo,
            FieldId::new("bio").unwrap(),
            FieldValue::Text("Twenty years in lending.".to_string()),
        )
        .unwrap();
}

fn save_req() -> SectionSaveRequest {
    SectionSaveRequest::plain(
        MonotonicTimeNs(20),
        SectionName::WebsiteInfo,
        SectionContext::default(),
    )
}

#[test]
fn a_clean_session_proceeds_immediately() {
    let (mut store, _backend) = seeded();
    let guard = NavigationGuard::default();

    let decision = guard.request_leave(
        &mut store,
        MonotonicTimeNs(1),
        DeferredKind::Save,
        "/contract",
        None,
    );
    assert_eq!(
        decision,
        NavDecision::Proceed {
            route: "/contract".to_string()
        }
    );
    assert!(store.before_leave().is_idle());
}

#[test]
fn a_stay_intent_never_navigates_even_when_clean() {
    let (mut store, _backend) = seeded();
    let guard = NavigationGuard::default();
    assert!(store.is_form_saved());

    let decision = guard.request_leave(
        &mut store,
        MonotonicTimeNs(1),
        DeferredKind::Stay,
        "/contract",
        None,
    );
    assert_eq!(decision, NavDecision::Idle);
    assert!(store.audit().is_empty());
}

#[test]
fn leave_discards_edits_and_proceeds() {
    let (mut store, _backend) = seeded();
    let guard = NavigationGuard::default();
    dirty(&mut store);

    let decision = guard.request_leave(
        &mut store,
        MonotonicTimeNs(2),
        DeferredKind::Leave,
        "/policies",
        None,
    );
    assert_eq!(
        decision,
        NavDecision::Proceed {
            route: "/policies".to_string()
        }
    );
    // Discarding cleans the session so the prompt cannot re-fire.
    assert!(store.is_form_saved());
    assert!(store.before_leave().is_idle());
    assert!(store
        .audit()
        .events()
        .iter()
        .any(|e| e.reason_code == reason_codes::WIZ_OK_LEAVE_DISCARDED));
}

#[test]
fn stay_holds_the_page() {
    let (mut store, _backend) = seeded();
    let guard = NavigationGuard::default();
    dirty(&mut store);

    let decision = guard.request_leave(
        &mut store,
        MonotonicTimeNs(3),
        DeferredKind::Stay,
        "/policies",
        None,
    );
    assert_eq!(decision, NavDecision::Idle);
    assert!(!store.is_form_saved());
    assert!(store.before_leave().is_idle());
}

#[test]
fn save_and_leave_runs_the_owed_save_then_proceeds() {
    let (mut store, backend) = seeded();
    let guard = NavigationGuard::default();
    let runtime = SectionSaveRuntime::default();
    dirty(&mut store);

    let queued = guard.request_leave(
        &mut store,
        MonotonicTimeNs(4),
        DeferredKind::Save,
        "/contract",
        Some("next-step".to_string()),
    );
    assert_eq!(queued, NavDecision::Idle);
    assert!(!store.before_leave().is_idle());

    let decision = guard
        .pump(&mut store, &backend, &runtime, &mut save_req())
        .unwrap();
    match decision {
        NavDecision::SavedAndProceed { route, save } => {
            assert_eq!(route, "/contract");
            assert!(save.is_form_complete);
        }
        other => panic!("expected SavedAndProceed, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 1);
    assert!(store.is_form_saved());
    assert!(store.before_leave().is_idle());
}

#[test]
fn a_refused_save_blocks_the_navigation_without_replay() {
    let (mut store, backend) = seeded();
    let guard = NavigationGuard::default();
    let runtime = SectionSaveRuntime::default();
    dirty(&mut store);
    backend.fail_record_put.set(true);

    guard.request_leave(
        &mut store,
        MonotonicTimeNs(5),
        DeferredKind::Save,
        "/contract",
        None,
    );
    let decision = guard
        .pump(&mut store, &backend, &runtime, &mut save_req())
        .unwrap();
    match decision {
        NavDecision::Blocked { reason_code, .. } => {
            assert_eq!(reason_code, reason_codes::WIZ_REFUSE_BACKEND)
        }
        other => panic!("expected Blocked, got {other:?}"),
    }
    // The session stays dirty and the consumed command cannot replay.
    assert!(!store.is_form_saved());
    assert_eq!(
        guard
            .pump(&mut store, &backend, &runtime, &mut save_req())
            .unwrap(),
        NavDecision::Idle
    );
    assert_eq!(backend.record_puts.get(), 1);
}

#[test]
fn pumping_an_empty_queue_is_idle() {
    let (mut store, backend) = seeded();
    let guard = NavigationGuard::default();
    let runtime = SectionSaveRuntime::default();

    let decision = guard
        .pump(&mut store, &backend, &runtime, &mut save_req())
        .unwrap();
    assert_eq!(decision, NavDecision::Idle);
    assert_eq!(backend.record_puts.get(), 0);
}

#[test]
fn a_locked_record_blocks_the_deferred_save() {
    let mut record = OnboardingRecord::v1(RecordId::new("rec_1").unwrap());
    record.is_locked = true;
    let mut store = SessionStore::new(profile(), record.id.clone()).unwrap();
    store.hydrate(&record).unwrap();
    let backend = FakeBackend::new(record);
    let guard = NavigationGuard::default();
    let runtime = SectionSaveRuntime::default();
    dirty(&mut store);

    guard.request_leave(
        &mut store,
        MonotonicTimeNs(6),
        DeferredKind::Save,
        "/contract",
        None,
    );
    let decision = guard
        .pump(&mut store, &backend, &runtime, &mut save_req())
        .unwrap();
    match decision {
        NavDecision::Blocked { reason_code, .. } => {
            assert_eq!(reason_code, reason_codes::WIZ_REFUSE_LOCKED)
        }
        other => panic!("expected Blocked, got {other:?}"),
    }
    assert_eq!(backend.record_puts.get(), 0);
}
