#![forbid(unsafe_code)]

pub mod backend;
pub mod signature;

pub use backend::{BackendError, HttpBackend, OnboardingBackend, UploadRequest};
pub use signature::{CaptureError, CapturedImage, InkCanvas, SignatureKind, MIN_INK_SAMPLES};
