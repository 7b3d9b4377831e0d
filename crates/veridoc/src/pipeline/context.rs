use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::registry::DocumentKind;

/// Stage that recorded a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Ingestion,
    Classification,
    Extraction,
    Validation,
}

impl FailureStage {
    pub fn label(&self) -> &'static str {
        match self {
            FailureStage::Ingestion => "ingestion",
            FailureStage::Classification => "classification",
            FailureStage::Extraction => "extraction",
            FailureStage::Validation => "validation",
        }
    }
}

/// Terminal failure descriptor carried by the pipeline context.
///
/// Enrichment problems never appear here; they are logged and swallowed
/// inside the validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub stage: FailureStage,
    pub reason: String,
}

impl PipelineFailure {
    pub fn ingestion(reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Ingestion,
            reason: reason.into(),
        }
    }

    pub fn classification(reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Classification,
            reason: reason.into(),
        }
    }

    pub fn extraction(reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Extraction,
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Validation,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage.label(), self.reason)
    }
}

/// Unit of work threaded through the pipeline stages.
///
/// Each run owns exactly one context; stages take it by value and hand it
/// back, so no aliasing exists between concurrent runs. Once `failure` is
/// set, every later stage passes the context through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineContext {
    pub image_references: Vec<String>,
    pub extracted_text: String,
    pub document_type: Option<DocumentKind>,
    pub extracted_data: Option<Map<String, Value>>,
    pub validated_data: Option<Map<String, Value>>,
    pub failure: Option<PipelineFailure>,
}

impl PipelineContext {
    pub fn new(image_references: Vec<String>) -> Self {
        Self {
            image_references,
            ..Self::default()
        }
    }

    /// Whether a terminal failure has been recorded.
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub(crate) fn fail(mut self, failure: PipelineFailure) -> Self {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
        self
    }

    /// Caller-facing result: `error` and `validated_data` are mutually
    /// exclusive.
    pub fn report(&self) -> DocumentReport {
        match &self.failure {
            Some(failure) => DocumentReport {
                document_type: self.document_type,
                validated_data: None,
                error: Some(failure.to_string()),
            },
            None => DocumentReport {
                document_type: self.document_type,
                validated_data: self.validated_data.clone(),
                error: None,
            },
        }
    }
}

/// Structured response returned to the surrounding service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_type: Option<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_keeps_the_first_failure() {
        let ctx = PipelineContext::new(vec!["front.png".to_string()])
            .fail(PipelineFailure::ingestion("OCR detected no text."))
            .fail(PipelineFailure::validation("late failure"));

        let failure = ctx.failure.expect("failure recorded");
        assert_eq!(failure.stage, FailureStage::Ingestion);
        assert_eq!(failure.reason, "OCR detected no text.");
    }

    #[test]
    fn report_is_mutually_exclusive() {
        let mut ctx = PipelineContext::new(Vec::new());
        ctx.validated_data = Some(Map::new());
        let report = ctx.report();
        assert!(report.error.is_none());
        assert!(report.validated_data.is_some());

        let ctx = ctx.fail(PipelineFailure::classification("could not detect document type"));
        let report = ctx.report();
        assert!(report.validated_data.is_none());
        assert_eq!(
            report.error.as_deref(),
            Some("classification failed: could not detect document type")
        );
    }
}
