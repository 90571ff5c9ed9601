#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{RecordId, UserId};
use crate::section::{SectionDraft, SectionName, SignatureAsset};
use crate::{ContractViolation, Validate};

/// The server-owned onboarding aggregate: one per applicant, one draft per
/// wizard section. Created at onboarding start, mutated by every section
/// save, never deleted by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub sections: BTreeMap<SectionName, SectionDraft>,
    #[serde(default)]
    pub completion_percent: u8,
    #[serde(default)]
    pub is_submitted: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_form_visited: Option<SectionName>,
}

impl OnboardingRecord {
    pub fn v1(id: RecordId) -> Self {
        Self {
            id,
            sections: BTreeMap::new(),
            completion_percent: 0,
            is_submitted: false,
            is_locked: false,
            last_form_visited: None,
        }
    }

    pub fn section(&self, name: SectionName) -> Option<&SectionDraft> {
        self.sections.get(&name)
    }
}

impl Validate for OnboardingRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        if self.completion_percent > 100 {
            return Err(ContractViolation::InvalidRange {
                field: "onboarding_record.completion_percent",
                min: 0.0,
                max: 100.0,
                got: self.completion_percent as f64,
            });
        }
        Ok(())
    }
}

/// Body of a record PUT: the updated aggregate flags plus exactly one
/// section's draft. The backend merges it into the stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub completion_percent: u8,
    pub is_submitted: bool,
    pub last_form_visited: Option<SectionName>,
    pub section: SectionName,
    pub draft: SectionDraft,
}

impl Validate for RecordUpdate {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.completion_percent > 100 {
            return Err(ContractViolation::InvalidRange {
                field: "record_update.completion_percent",
                min: 0.0,
                max: 100.0,
                got: self.completion_percent as f64,
            });
        }
        Ok(())
    }
}

/// The authenticated applicant's profile. Doubles as the one-click signing
/// source: a stored `signature`/`initials` asset can be reused without a
/// fresh ink capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub work_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<SignatureAsset>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

impl Validate for UserProfile {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.user_id.validate()?;
        if let Some(s) = &self.signature {
            s.validate()?;
        }
        if let Some(i) = &self.initials {
            i.validate()?;
        }
        Ok(())
    }
}
