#![forbid(unsafe_code)]

use gable_contracts::ids::FieldId;
use gable_contracts::section::SectionDraft;
use gable_contracts::validation::ValidationOutcome;
use gable_contracts::ContractViolation;

// Static label table keyed by field identifier. Every field a rule table can
// require must have an entry; a missing entry is a fatal configuration error,
// never a silently dropped violation.
const LABELS: &[(&str, &str)] = &[
    ("bankAccountNumber", "Bank Account Number"),
    ("bankInstitutionNumber", "Bank Institution Number"),
    ("bankTransitNumber", "Bank Transit Number"),
    ("bio", "Biography"),
    ("birthDate", "Date of Birth"),
    ("companyAccount", "Paid Through a Company"),
    ("companyBusinessNumber", "Company Business Number"),
    ("companyHstNumber", "Company HST Number"),
    ("companyName", "Company Name"),
    ("contractAcknowledged", "Contract Acknowledgement"),
    ("declarationBankruptcy", "Bankruptcy Declaration"),
    ("declarationBankruptcyDetails", "Bankruptcy Declaration Details"),
    ("declarationRegulatoryReview", "Regulatory Review Declaration"),
    (
        "declarationRegulatoryReviewDetails",
        "Regulatory Review Details",
    ),
    ("firstname", "First Name"),
    ("headshotPhoto", "Headshot Photo"),
    ("homeAddress", "Home Address"),
    ("initials", "Initials"),
    ("lastname", "Last Name"),
    ("licenseNumber", "License Number"),
    ("mpcDeclarationConsent", "MPC Declaration Consent"),
    ("mpcMemberType", "MPC Membership Type"),
    ("payFrequency", "Pay Frequency"),
    ("payorName", "Payor Name"),
    ("payrollRequired", "Payroll Required"),
    ("policiesAcknowledged", "Policies Acknowledgement"),
    ("priorMpcMember", "Previous MPC Membership"),
    ("priorMpcMemberNumber", "Previous MPC Member Number"),
    ("saskatchewanQuestionnaire", "Saskatchewan Questionnaire"),
    ("signature", "Signature"),
    ("startDate", "Start Date"),
    ("voidCheque", "Void Cheque"),
    ("websiteDisplayName", "Website Display Name"),
    ("workEmail", "Work Email"),
    ("workPhone", "Work Phone"),
];

pub fn label_for(field: &FieldId) -> Result<&'static str, ContractViolation> {
    LABELS
        .binary_search_by_key(&field.as_str(), |(id, _)| id)
        .map(|i| LABELS[i].1)
        .map_err(|_| ContractViolation::MissingLabel {
            field_id: field.as_str().to_string(),
        })
}

/// Whether the section demands a signature (or initials) and whether one is
/// present on the draft being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignatureExpectation {
    pub required: bool,
    pub present: bool,
}

impl SignatureExpectation {
    pub fn missing(self) -> bool {
        self.required && !self.present
    }
}

/// Compares the required fields against the draft and produces the ordered
/// violation list. Deterministic and side-effect-free: identical inputs give
/// identical output, in required-field declaration order. Synthetic
/// signature/initials violations are appended last.
pub fn validate(
    draft: &SectionDraft,
    required: &[FieldId],
    signature: SignatureExpectation,
    initials: SignatureExpectation,
) -> Result<ValidationOutcome, ContractViolation> {
    let mut outcome = ValidationOutcome::default();
    for field in required {
        if draft.is_field_empty(field) {
            outcome.push(field.clone(), label_for(field)?);
        }
    }
    if signature.missing() {
        let id = FieldId::new("signature")?;
        outcome.push(id.clone(), label_for(&id)?);
    }
    if initials.missing() {
        let id = FieldId::new("initials")?;
        outcome.push(id.clone(), label_for(&id)?);
    }
    Ok(outcome)
}
