#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use gable_contracts::section::SectionName;
use gable_contracts::session::SectionStatus;

/// Aggregates overall completion across all wizard sections. Each section
/// carries equal weight. The target section contributes from the validation
/// outcome just computed; every other section contributes its last-persisted
/// `is_form_complete`, so saving one section can never change another's
/// contribution.
pub fn compute_completion(
    statuses: &BTreeMap<SectionName, SectionStatus>,
    target: SectionName,
    has_violations_now: bool,
) -> u8 {
    let total = SectionName::ALL.len() as u32;
    let mut complete = 0u32;
    for section in SectionName::ALL {
        let done = if section == target {
            !has_violations_now
        } else {
            statuses
                .get(&section)
                .map(|s| s.is_form_complete)
                .unwrap_or(false)
        };
        if done {
            complete += 1;
        }
    }
    // Integer rounding to the nearest percent.
    ((complete * 100 + total / 2) / total) as u8
}
