#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::FieldId;
use crate::{ContractViolation, Validate};

/// The wizard's sections. One backend record holds one draft per section.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SectionName {
    BrokerInfo,
    ContractAndSchedule,
    PaymentAuthorization,
    MpcApplication,
    Photos,
    Policies,
    WebsiteInfo,
}

impl SectionName {
    pub const ALL: [SectionName; 7] = [
        SectionName::BrokerInfo,
        SectionName::ContractAndSchedule,
        SectionName::PaymentAuthorization,
        SectionName::MpcApplication,
        SectionName::Photos,
        SectionName::Policies,
        SectionName::WebsiteInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::BrokerInfo => "brokerInfo",
            SectionName::ContractAndSchedule => "contractAndSchedule",
            SectionName::PaymentAuthorization => "paymentAuthorization",
            SectionName::MpcApplication => "mpcApplication",
            SectionName::Photos => "photos",
            SectionName::Policies => "policies",
            SectionName::WebsiteInfo => "websiteInfo",
        }
    }

    pub fn from_wire(s: &str) -> Option<SectionName> {
        SectionName::ALL.into_iter().find(|n| n.as_str() == s)
    }
}

/// Tri-state declaration answer. The upstream wire stored these sometimes as
/// booleans and sometimes as "Yes"/"No" strings; both normalize to this enum
/// at the draft boundary (`SectionDraft::answer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    Unanswered,
    Yes,
    No,
}

impl Answer {
    pub fn from_bool(b: bool) -> Answer {
        if b {
            Answer::Yes
        } else {
            Answer::No
        }
    }

    pub fn is_answered(self) -> bool {
        self != Answer::Unanswered
    }

    pub fn is_yes(self) -> bool {
        self == Answer::Yes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneValue {
    pub masked: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValue {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

impl AddressValue {
    pub fn is_empty(&self) -> bool {
        self.line1.trim().is_empty()
            && self.city.trim().is_empty()
            && self.postal_code.trim().is_empty()
    }
}

/// Reference to an uploaded file asset. Owned by the backend file store;
/// drafts hold the reference, never the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureAsset {
    pub url: String,
    pub name: String,
    pub created_at: String,
}

impl Validate for SignatureAsset {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.url.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "signature_asset.url",
                reason: "must not be empty",
            });
        }
        if self.name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "signature_asset.name",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// One form field's value. Untagged on the wire: the backend stores plain
/// JSON strings, booleans and shaped objects side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Phone(PhoneValue),
    Asset(SignatureAsset),
    Address(AddressValue),
    Text(String),
}

impl FieldValue {
    /// Emptiness per the validation contract: empty string, phone with an
    /// empty raw number, blank address, or blank asset url. A `Flag` is an
    /// answered declaration and is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Flag(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Phone(p) => p.raw.trim().is_empty(),
            FieldValue::Address(a) => a.is_empty(),
            FieldValue::Asset(a) => a.url.trim().is_empty(),
        }
    }
}

/// The in-memory draft for one wizard section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    #[serde(flatten)]
    pub fields: BTreeMap<FieldId, FieldValue>,
    #[serde(default)]
    pub is_form_complete: bool,
    #[serde(default)]
    pub first_save_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<SignatureAsset>,
}

impl SectionDraft {
    pub fn get(&self, field: &FieldId) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: FieldId, value: FieldValue) {
        self.fields.insert(field, value);
    }

    /// True when the field is absent or holds an empty value.
    pub fn is_field_empty(&self, field: &FieldId) -> bool {
        match self.fields.get(field) {
            None => true,
            Some(v) => v.is_empty(),
        }
    }

    /// Normalized tri-state read of a declaration field. Legacy drafts stored
    /// declarations as `"Yes"`/`"No"` strings; current ones store booleans.
    pub fn answer(&self, field: &FieldId) -> Answer {
        match self.fields.get(field) {
            None => Answer::Unanswered,
            Some(FieldValue::Flag(b)) => Answer::from_bool(*b),
            Some(FieldValue::Text(s)) => match s.trim() {
                "Yes" | "yes" | "true" => Answer::Yes,
                "No" | "no" | "false" => Answer::No,
                _ => Answer::Unanswered,
            },
            Some(_) => Answer::Unanswered,
        }
    }

    /// Plain text read, empty string when absent or non-text.
    pub fn text(&self, field: &FieldId) -> &str {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) => s.as_str(),
            _ => "",
        }
    }
}
