#![forbid(unsafe_code)]

use gable_contracts::session::{DeferredAction, DeferredKind};
use gable_contracts::{MonotonicTimeNs, ReasonCodeId};
use gable_engines::backend::OnboardingBackend;
use gable_store::session::SessionStore;

use crate::reason_codes;
use crate::save::{SaveOk, SaveResponse, SectionSaveRequest, SectionSaveRuntime};
use crate::WizardError;

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NavDecision {
    /// Nothing to do: no route change pending.
    Idle,
    /// The route change may commit now.
    Proceed { route: String },
    /// The owed save ran to completion; the route change may commit.
    SavedAndProceed { route: String, save: SaveOk },
    /// The owed save was refused; the navigation does not commit.
    Blocked {
        reason_code: ReasonCodeId,
        message: String,
    },
}

/// Intercepts attempted page transitions. With unsaved edits the departure is
/// queued as a one-slot deferred command; the active page pumps the queue,
/// runs its own save routine for `Save`, and only then lets the route change
/// commit. A consumed command always resets, so it can never replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationGuard;

impl NavigationGuard {
    /// Called by the navigation chrome when the user tries to leave the
    /// current page. Clean sessions proceed immediately; `Leave` discards;
    /// `Save` is queued for the active page to execute.
    pub fn request_leave(
        &self,
        store: &mut SessionStore,
        now: MonotonicTimeNs,
        kind: DeferredKind,
        route: &str,
        event: Option<String>,
    ) -> NavDecision {
        // A stay intent never commits a navigation, clean session or not.
        if kind == DeferredKind::Stay {
            return NavDecision::Idle;
        }
        if store.is_form_saved() {
            store.record_audit(
                now,
                format!("nav:{route}"),
                "CLEAN",
                "PROCEED",
                reason_codes::WIZ_OK_NAVIGATION,
                None,
            );
            return NavDecision::Proceed {
                route: route.to_string(),
            };
        }
        match kind {
            DeferredKind::Stay => NavDecision::Idle,
            DeferredKind::Leave => {
                // Explicit discard: navigate now, and mark the session clean
                // so the prompt does not fire again for the same edits.
                store.mark_clean();
                store.queue_before_leave(DeferredAction::default());
                store.record_audit(
                    now,
                    format!("nav:{route}"),
                    "DIRTY",
                    "DISCARDED",
                    reason_codes::WIZ_OK_LEAVE_DISCARDED,
                    None,
                );
                NavDecision::Proceed {
                    route: route.to_string(),
                }
            }
            DeferredKind::Save => {
                store.queue_before_leave(DeferredAction::save(route, event));
                NavDecision::Idle
            }
        }
    }

    /// Consumes the queued deferred action. A `Save` command runs the page's
    /// save routine to completion (including the network round-trip) before
    /// the route change is allowed; there is no abort path once dispatched.
    pub fn pump<B: OnboardingBackend>(
        &self,
        store: &mut SessionStore,
        backend: &B,
        runtime: &SectionSaveRuntime,
        req: &mut SectionSaveRequest,
    ) -> Result<NavDecision, WizardError> {
        let action = store.take_before_leave();
        match action.kind {
            DeferredKind::Stay => Ok(NavDecision::Idle),
            DeferredKind::Leave => {
                store.mark_clean();
                Ok(match action.route {
                    Some(route) => NavDecision::Proceed { route },
                    None => NavDecision::Idle,
                })
            }
            DeferredKind::Save => {
                let route = action.route.unwrap_or_default();
                match runtime.run(store, backend, req)? {
                    SaveResponse::Ok(save) => {
                        store.record_audit(
                            req.now,
                            format!("nav:{route}"),
                            "SAVE_PENDING",
                            "PROCEED",
                            reason_codes::WIZ_OK_NAVIGATION,
                            None,
                        );
                        Ok(NavDecision::SavedAndProceed { route, save })
                    }
                    SaveResponse::Refuse(r) => Ok(NavDecision::Blocked {
                        reason_code: r.reason_code,
                        message: r.message,
                    }),
                }
            }
        }
    }
}
