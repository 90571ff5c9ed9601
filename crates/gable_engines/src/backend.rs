#![forbid(unsafe_code)]

use std::env;
use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use serde_json::{json, Map, Value};
use url::Url;

use gable_contracts::ids::{RecordId, UserId};
use gable_contracts::record::{OnboardingRecord, RecordUpdate};
use gable_contracts::section::SignatureAsset;
use gable_contracts::Validate;

use crate::signature::SignatureKind;

const ENV_BASE_URL: &str = "GABLE_API_BASE_URL";
const ENV_TOKEN: &str = "GABLE_API_TOKEN";

// A hung backend call must not pin the busy indicator forever; every request
// carries a hard timeout.
const REQUEST_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    MissingToken,
    InvalidBaseUrl { raw: String },
    Unauthorized,
    Http { status: u16 },
    Transport { detail: String },
    MalformedResponse { detail: &'static str },
}

impl BackendError {
    /// True when the failure means the session has no usable credential and
    /// the caller must redirect to the unauthenticated landing route.
    pub fn is_auth(&self) -> bool {
        matches!(self, BackendError::MissingToken | BackendError::Unauthorized)
    }
}

/// File payload for the upload endpoint. The filename carries the
/// applicant-identifying metadata ("Signature - {fullName}"); `field` is the
/// signature-vs-initials discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file_name: String,
    pub field: SignatureKind,
    pub ref_collection: Option<String>,
    pub ref_id: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn for_applicant(kind: SignatureKind, full_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{} - {}", kind.display_name(), full_name),
            field: kind,
            ref_collection: None,
            ref_id: None,
            bytes,
        }
    }
}

/// The backend REST surface the controller consumes. Implemented over HTTP
/// in production and by an in-memory fake in controller tests.
pub trait OnboardingBackend {
    fn fetch_record(&self, id: &RecordId) -> Result<OnboardingRecord, BackendError>;

    fn put_record(
        &self,
        id: &RecordId,
        update: &RecordUpdate,
    ) -> Result<OnboardingRecord, BackendError>;

    fn put_profile(
        &self,
        user: &UserId,
        fields: &Map<String, Value>,
    ) -> Result<(), BackendError>;

    fn upload(&self, request: &UploadRequest) -> Result<SignatureAsset, BackendError>;
}

/// Bearer-authenticated `ureq` client for the onboarding backend.
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: Url,
    token: String,
}

// The bearer token must never leak through Debug output.
impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpBackend {
    pub fn new(base_url: &str, token: &str) -> Result<Self, BackendError> {
        if token.trim().is_empty() {
            return Err(BackendError::MissingToken);
        }
        let base_url = Url::parse(base_url).map_err(|_| BackendError::InvalidBaseUrl {
            raw: base_url.to_string(),
        })?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .build();
        Ok(Self {
            agent,
            base_url,
            token: token.trim().to_string(),
        })
    }

    pub fn from_env() -> Result<Self, BackendError> {
        let base_url = env::var(ENV_BASE_URL).unwrap_or_default();
        let token = env::var(ENV_TOKEN).unwrap_or_default();
        Self::new(&base_url, &token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|_| BackendError::InvalidBaseUrl {
                raw: path.to_string(),
            })
    }

    fn authorized(&self, req: ureq::Request) -> ureq::Request {
        req.set("Authorization", &format!("Bearer {}", self.token))
    }

    fn map_ureq(err: ureq::Error) -> BackendError {
        match err {
            ureq::Error::Status(401, _) | ureq::Error::Status(403, _) => {
                BackendError::Unauthorized
            }
            ureq::Error::Status(status, _) => BackendError::Http { status },
            ureq::Error::Transport(transport) => BackendError::Transport {
                detail: transport.to_string(),
            },
        }
    }

    fn record_update_body(update: &RecordUpdate) -> Result<Value, BackendError> {
        update
            .validate()
            .map_err(|_| BackendError::MalformedResponse {
                detail: "record update failed contract validation",
            })?;
        let mut body = Map::new();
        body.insert(
            "completionPercent".to_string(),
            json!(update.completion_percent),
        );
        body.insert("isSubmitted".to_string(), json!(update.is_submitted));
        if let Some(last) = update.last_form_visited {
            body.insert("lastFormVisited".to_string(), json!(last.as_str()));
        }
        let draft = serde_json::to_value(&update.draft).map_err(|_| {
            BackendError::MalformedResponse {
                detail: "section draft is not serializable",
            }
        })?;
        body.insert(update.section.as_str().to_string(), draft);
        Ok(Value::Object(body))
    }
}

impl OnboardingBackend for HttpBackend {
    fn fetch_record(&self, id: &RecordId) -> Result<OnboardingRecord, BackendError> {
        let url = self.endpoint(&format!("onboarding-record/{}", id.as_str()))?;
        let resp = self
            .authorized(self.agent.get(url.as_str()))
            .call()
            .map_err(Self::map_ureq)?;
        resp.into_json::<OnboardingRecord>()
            .map_err(|_| BackendError::MalformedResponse {
                detail: "onboarding record body did not parse",
            })
    }

    fn put_record(
        &self,
        id: &RecordId,
        update: &RecordUpdate,
    ) -> Result<OnboardingRecord, BackendError> {
        let url = self.endpoint(&format!("onboarding-record/{}", id.as_str()))?;
        let body = Self::record_update_body(update)?;
        let resp = self
            .authorized(self.agent.request("PUT", url.as_str()))
            .send_json(body)
            .map_err(Self::map_ureq)?;
        resp.into_json::<OnboardingRecord>()
            .map_err(|_| BackendError::MalformedResponse {
                detail: "updated onboarding record body did not parse",
            })
    }

    fn put_profile(
        &self,
        user: &UserId,
        fields: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("user-profile/{}", user.as_str()))?;
        self.authorized(self.agent.request("PUT", url.as_str()))
            .send_json(Value::Object(fields.clone()))
            .map_err(Self::map_ureq)?;
        Ok(())
    }

    fn upload(&self, request: &UploadRequest) -> Result<SignatureAsset, BackendError> {
        let url = self.endpoint("upload")?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&request.bytes);
        let mut body = Map::new();
        body.insert(
            "files".to_string(),
            json!([{ "name": request.file_name, "data": encoded }]),
        );
        body.insert("field".to_string(), json!(request.field.as_field()));
        if let Some(r) = &request.ref_collection {
            body.insert("ref".to_string(), json!(r));
        }
        if let Some(r) = &request.ref_id {
            body.insert("refId".to_string(), json!(r));
        }
        let resp = self
            .authorized(self.agent.post(url.as_str()))
            .send_json(Value::Object(body))
            .map_err(Self::map_ureq)?;
        let assets: Vec<SignatureAsset> =
            resp.into_json()
                .map_err(|_| BackendError::MalformedResponse {
                    detail: "upload response body did not parse",
                })?;
        // The endpoint answers with an array; index 0 is the created asset.
        assets
            .into_iter()
            .next()
            .ok_or(BackendError::MalformedResponse {
                detail: "upload response array was empty",
            })
    }
}
