//! Narrow interfaces for the external collaborators the pipeline awaits, and
//! the shipped HTTP-backed implementations.
//!
//! Every capability is an opaque, possibly slow, possibly nondeterministic
//! service. Faults stay behind these traits as [`CapabilityError`]s; the
//! invoking stage converts them into its own failure kind, so no raw fault
//! ever crosses a stage boundary.

mod ollama;
mod remote_ocr;

pub use ollama::{OllamaClassifier, OllamaClient, OllamaExtractor};
pub use remote_ocr::HttpTextRecognizer;

use async_trait::async_trait;
use serde_json::Value;

use super::classify::ClassifierCatalog;

/// Fault raised by an external capability invocation.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("capability returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed capability payload: {0}")]
    MalformedPayload(String),
}

/// OCR ingestion: turns one image locator into raw text. May legitimately
/// return empty text for a blank scan.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract_text(&self, image_reference: &str) -> Result<String, CapabilityError>;
}

/// Structured extraction for one document type.
///
/// The contract is deliberately loose: the payload may arrive as a list of
/// candidate records or nested under a `properties` key; the dispatcher
/// normalizes both shapes.
#[async_trait]
pub trait ExtractionCapability: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Value, CapabilityError>;
}

/// Single-token document classifier, the fallback/alternate strategy.
///
/// Implementations return one token naming a candidate type; membership
/// checking happens at the call site, not here.
#[async_trait]
pub trait ClassifierCapability: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        catalog: &ClassifierCatalog,
    ) -> Result<String, CapabilityError>;
}
