#![forbid(unsafe_code)]

use gable_contracts::ids::FieldId;
use gable_contracts::section::{Answer, SectionDraft, SectionName};
use gable_contracts::session::SectionContext;
use gable_contracts::ContractViolation;

/// Trigger for a conditional required-field rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The named declaration field is answered Yes.
    AnswerYes(&'static str),
    /// The applicant holds a license (ambient context, not a draft field).
    Licensed,
    /// The applicant's selected province matches.
    ProvinceIs(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct ConditionalRule {
    condition: Condition,
    then: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
struct SectionRules {
    base: &'static [&'static str],
    conditional: &'static [ConditionalRule],
}

// New conditional requirements are additions to these tables, not new
// control-flow branches at call sites.
const BROKER_INFO: SectionRules = SectionRules {
    base: &[
        "firstname",
        "lastname",
        "workEmail",
        "workPhone",
        "homeAddress",
        "birthDate",
        "startDate",
    ],
    conditional: &[
        ConditionalRule {
            condition: Condition::Licensed,
            then: &["licenseNumber"],
        },
        ConditionalRule {
            condition: Condition::ProvinceIs("Saskatchewan"),
            then: &["saskatchewanQuestionnaire"],
        },
    ],
};

const CONTRACT_AND_SCHEDULE: SectionRules = SectionRules {
    base: &["contractAcknowledged"],
    conditional: &[],
};

const PAYMENT_AUTHORIZATION: SectionRules = SectionRules {
    base: &["payorName", "payFrequency"],
    conditional: &[
        ConditionalRule {
            condition: Condition::AnswerYes("payrollRequired"),
            then: &[
                "bankTransitNumber",
                "bankInstitutionNumber",
                "bankAccountNumber",
                "voidCheque",
            ],
        },
        ConditionalRule {
            condition: Condition::AnswerYes("companyAccount"),
            then: &["companyName", "companyBusinessNumber", "companyHstNumber"],
        },
    ],
};

const MPC_APPLICATION: SectionRules = SectionRules {
    base: &["mpcMemberType", "mpcDeclarationConsent"],
    conditional: &[ConditionalRule {
        condition: Condition::AnswerYes("priorMpcMember"),
        then: &["priorMpcMemberNumber"],
    }],
};

const PHOTOS: SectionRules = SectionRules {
    base: &["headshotPhoto"],
    conditional: &[],
};

const POLICIES: SectionRules = SectionRules {
    base: &[
        "policiesAcknowledged",
        "declarationRegulatoryReview",
        "declarationBankruptcy",
    ],
    conditional: &[
        ConditionalRule {
            condition: Condition::AnswerYes("declarationRegulatoryReview"),
            then: &["declarationRegulatoryReviewDetails"],
        },
        ConditionalRule {
            condition: Condition::AnswerYes("declarationBankruptcy"),
            then: &["declarationBankruptcyDetails"],
        },
    ],
};

const WEBSITE_INFO: SectionRules = SectionRules {
    base: &["websiteDisplayName", "bio"],
    conditional: &[],
};

fn rules_for(section: SectionName) -> &'static SectionRules {
    match section {
        SectionName::BrokerInfo => &BROKER_INFO,
        SectionName::ContractAndSchedule => &CONTRACT_AND_SCHEDULE,
        SectionName::PaymentAuthorization => &PAYMENT_AUTHORIZATION,
        SectionName::MpcApplication => &MPC_APPLICATION,
        SectionName::Photos => &PHOTOS,
        SectionName::Policies => &POLICIES,
        SectionName::WebsiteInfo => &WEBSITE_INFO,
    }
}

/// Which sections capture wet-ink signature / initials.
pub fn signature_requirements(section: SectionName) -> (bool, bool) {
    match section {
        SectionName::ContractAndSchedule => (true, true),
        SectionName::PaymentAuthorization | SectionName::MpcApplication => (true, false),
        _ => (false, false),
    }
}

fn condition_holds(condition: Condition, draft: &SectionDraft, ctx: &SectionContext) -> bool {
    match condition {
        // Edge policy: an unanswered trigger never pulls its dependents into
        // the required set.
        Condition::AnswerYes(field) => match FieldId::new(field) {
            Ok(id) => draft.answer(&id) == Answer::Yes,
            Err(_) => false,
        },
        Condition::Licensed => ctx.licensed,
        Condition::ProvinceIs(name) => ctx.province_is(name),
    }
}

/// Computes the fields that must be non-empty for the section to be complete
/// right now. Pure function of the draft and context; recomputed on every
/// validation pass because answering a trigger unlocks follow-up fields.
/// Declaration order is preserved; duplicates are dropped.
pub fn resolve_required(
    section: SectionName,
    draft: &SectionDraft,
    ctx: &SectionContext,
) -> Result<Vec<FieldId>, ContractViolation> {
    fn push(name: &'static str, out: &mut Vec<FieldId>) -> Result<(), ContractViolation> {
        let id = FieldId::new(name)?;
        if !out.contains(&id) {
            out.push(id);
        }
        Ok(())
    }

    let rules = rules_for(section);
    let mut out: Vec<FieldId> = Vec::new();

    for name in rules.base {
        push(name, &mut out)?;
    }
    for rule in rules.conditional {
        if condition_holds(rule.condition, draft, ctx) {
            for name in rule.then {
                push(name, &mut out)?;
            }
        }
    }
    Ok(out)
}
