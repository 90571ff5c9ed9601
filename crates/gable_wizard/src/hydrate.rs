#![forbid(unsafe_code)]

use gable_contracts::section::SectionName;
use gable_contracts::{MonotonicTimeNs, ReasonCodeId};
use gable_engines::backend::OnboardingBackend;
use gable_store::session::SessionStore;

use crate::reason_codes;
use crate::WizardError;

#[derive(Debug, Clone, PartialEq)]
pub enum HydrateResponse {
    Ok {
        /// Where the wizard resumes: the last form visited, persisted
        /// server-side, falling back to the first step.
        resume: SectionName,
        completion_percent: u8,
        is_locked: bool,
    },
    /// Auth refusals map to a hard redirect to the unauthenticated landing
    /// route; backend failures surface as a transient status.
    Refuse {
        reason_code: ReasonCodeId,
        message: String,
    },
}

/// Pulls the onboarding record and seeds the session mirror every page reads.
pub fn hydrate<B: OnboardingBackend>(
    store: &mut SessionStore,
    backend: &B,
    now: MonotonicTimeNs,
) -> Result<HydrateResponse, WizardError> {
    let record = match backend.fetch_record(store.record_id()) {
        Ok(record) => record,
        Err(err) if err.is_auth() => {
            return Ok(HydrateResponse::Refuse {
                reason_code: reason_codes::WIZ_REFUSE_AUTH_REQUIRED,
                message: "sign in to continue onboarding".to_string(),
            });
        }
        Err(err) => {
            return Ok(HydrateResponse::Refuse {
                reason_code: reason_codes::WIZ_REFUSE_BACKEND,
                message: format!("could not load the onboarding record: {err:?}"),
            });
        }
    };

    store.hydrate(&record)?;
    let resume = record.last_form_visited.unwrap_or(SectionName::BrokerInfo);
    store.record_audit(
        now,
        "hydrate",
        "NONE",
        "HYDRATED",
        reason_codes::WIZ_OK_HYDRATED,
        None,
    );
    Ok(HydrateResponse::Ok {
        resume,
        completion_percent: record.completion_percent,
        is_locked: record.is_locked,
    })
}
