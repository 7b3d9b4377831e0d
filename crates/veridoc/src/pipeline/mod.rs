//! Document classification-and-extraction pipeline.
//!
//! The orchestrator sequences OCR ingestion, type resolution, extraction,
//! and validation/enrichment over a single owned [`PipelineContext`]. Stages
//! run strictly in order; every stage checks for a recorded failure first
//! and passes the context through untouched once one exists, so a failed run
//! can never pick up partial data from a later stage.

pub mod capabilities;
pub mod classify;
pub mod context;
mod dates;
mod extract;
pub mod geo;
pub mod registry;
pub mod router;
pub mod schema;
mod validate;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};

pub use capabilities::{
    CapabilityError, ClassifierCapability, ExtractionCapability, HttpTextRecognizer,
    OllamaClassifier, OllamaClient, OllamaExtractor, TextRecognizer,
};
pub use classify::{ClassificationMode, ClassifierCatalog};
pub use context::{DocumentReport, FailureStage, PipelineContext, PipelineFailure};
pub use geo::{CsvGeoDirectory, GeoDirectory, GeoDirectoryError, GeoRecord};
pub use registry::{
    DocumentKind, DocumentTypeRegistry, RegistryBuilder, RegistryError, TypeDescriptor,
};
pub use router::document_router;
pub use schema::{FieldKind, FieldSpec, TypeSchema, LICENSE_CLASSES};

use classify::{classify_by_model, detect_by_patterns};
use context::PipelineFailure as Failure;

/// Upper bounds for the awaited external calls. A stage that exceeds its
/// budget fails with its own error kind; the timeout never escapes as a
/// fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub ingestion: Duration,
    pub classification: Duration,
    pub extraction: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self::from_budget(Duration::from_secs(60))
    }
}

impl StageTimeouts {
    /// Fan a single budget out per stage; the model-bound stages get the
    /// full budget, classification half of it.
    pub fn from_budget(budget: Duration) -> Self {
        Self {
            ingestion: budget,
            classification: budget / 2,
            extraction: budget,
        }
    }
}

/// Stage sequencer for one kind of work: raw scans in, validated record or
/// terminal failure out.
///
/// The registry and geographic directory are shared read-only across
/// concurrent runs; everything else is owned per run.
pub struct DocumentPipeline {
    registry: Arc<DocumentTypeRegistry>,
    recognizer: Arc<dyn TextRecognizer>,
    geo: Arc<dyn GeoDirectory>,
    classifier: Option<Arc<dyn ClassifierCapability>>,
    mode: ClassificationMode,
    timeouts: StageTimeouts,
}

impl DocumentPipeline {
    pub fn new(
        registry: Arc<DocumentTypeRegistry>,
        recognizer: Arc<dyn TextRecognizer>,
        geo: Arc<dyn GeoDirectory>,
    ) -> Self {
        Self {
            registry,
            recognizer,
            geo,
            classifier: None,
            mode: ClassificationMode::default(),
            timeouts: StageTimeouts::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ClassifierCapability>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_mode(mut self, mode: ClassificationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn registry(&self) -> &DocumentTypeRegistry {
        &self.registry
    }

    /// Auto-detect mode: classification resolves the type from the text.
    pub async fn process(&self, image_references: Vec<String>) -> PipelineContext {
        self.run(PipelineContext::new(image_references), None).await
    }

    /// Known-type mode: the caller names the type; resolution is a registry
    /// membership check and an unknown token is an immediate terminal
    /// failure, skipping extraction and validation entirely.
    pub async fn process_known(
        &self,
        image_references: Vec<String>,
        type_token: &str,
    ) -> PipelineContext {
        self.run(PipelineContext::new(image_references), Some(type_token))
            .await
    }

    async fn run(&self, ctx: PipelineContext, known_type: Option<&str>) -> PipelineContext {
        info!(
            images = ctx.image_references.len(),
            ?known_type,
            "document pipeline run started"
        );

        let ctx = self.ingest(ctx).await;
        let ctx = match known_type {
            Some(token) => self.resolve_known(ctx, token),
            None => self.resolve_auto(ctx).await,
        };
        let ctx = self.run_extraction(ctx).await;
        let ctx = self.run_validation(ctx);

        match &ctx.failure {
            Some(failure) => info!(%failure, "document pipeline run failed"),
            None => info!(document_type = ?ctx.document_type, "document pipeline run completed"),
        }
        ctx
    }

    async fn ingest(&self, mut ctx: PipelineContext) -> PipelineContext {
        if ctx.failed() {
            return ctx;
        }

        for reference in ctx.image_references.clone() {
            let call = self.recognizer.extract_text(&reference);
            let text = match timeout(self.timeouts.ingestion, call).await {
                Err(_) => {
                    return ctx.fail(Failure::ingestion(format!(
                        "OCR timed out after {:?} for '{reference}'",
                        self.timeouts.ingestion
                    )))
                }
                Ok(Err(err)) => return ctx.fail(Failure::ingestion(format!("OCR failed: {err}"))),
                Ok(Ok(text)) => text,
            };

            let flattened = flatten_whitespace(&text);
            if !ctx.extracted_text.is_empty() && !flattened.is_empty() {
                ctx.extracted_text.push(' ');
            }
            ctx.extracted_text.push_str(&flattened);
        }

        if ctx.extracted_text.trim().is_empty() {
            return ctx.fail(Failure::ingestion("OCR detected no text."));
        }

        debug!(chars = ctx.extracted_text.len(), "ingestion complete");
        ctx
    }

    fn resolve_known(&self, mut ctx: PipelineContext, token: &str) -> PipelineContext {
        if ctx.failed() {
            return ctx;
        }

        match DocumentKind::parse(token) {
            Some(kind) if self.registry.contains(kind) => {
                ctx.document_type = Some(kind);
                ctx
            }
            _ => ctx.fail(Failure::classification(format!(
                "unknown document type '{token}'"
            ))),
        }
    }

    async fn resolve_auto(&self, mut ctx: PipelineContext) -> PipelineContext {
        if ctx.failed() {
            return ctx;
        }

        let pattern_match = match self.mode {
            ClassificationMode::Model => None,
            ClassificationMode::Pattern | ClassificationMode::PatternThenModel => {
                detect_by_patterns(&self.registry, &ctx.extracted_text)
            }
        };

        if let Some(kind) = pattern_match {
            debug!(%kind, "pattern strategy resolved document type");
            ctx.document_type = Some(kind);
            return ctx;
        }

        if self.mode == ClassificationMode::Pattern {
            return ctx.fail(Failure::classification(
                "no detection pattern matched the extracted text",
            ));
        }

        let Some(classifier) = &self.classifier else {
            // Hybrid deployments without a classifier degrade to pattern-only.
            let reason = match self.mode {
                ClassificationMode::Model => "no classifier capability configured",
                _ => "no detection pattern matched the extracted text",
            };
            return ctx.fail(Failure::classification(reason));
        };

        let call = classify_by_model(classifier.as_ref(), &self.registry, &ctx.extracted_text);
        let outcome = timeout(self.timeouts.classification, call).await;
        match outcome {
            Err(_) => ctx.fail(Failure::classification(format!(
                "classifier timed out after {:?}",
                self.timeouts.classification
            ))),
            Ok(Err(failure)) => ctx.fail(failure),
            Ok(Ok(kind)) => {
                debug!(%kind, "model strategy resolved document type");
                ctx.document_type = Some(kind);
                ctx
            }
        }
    }

    async fn run_extraction(&self, mut ctx: PipelineContext) -> PipelineContext {
        if ctx.failed() {
            return ctx;
        }

        let Some(kind) = ctx.document_type else {
            return ctx.fail(Failure::extraction("no document type resolved"));
        };
        let Some(descriptor) = self.registry.descriptor(kind) else {
            return ctx.fail(Failure::extraction(format!(
                "document type '{kind}' is not registered"
            )));
        };

        let call = extract::dispatch(descriptor, &ctx.extracted_text);
        let outcome = timeout(self.timeouts.extraction, call).await;
        match outcome {
            Err(_) => ctx.fail(Failure::extraction(format!(
                "extraction capability timed out after {:?}",
                self.timeouts.extraction
            ))),
            Ok(Err(failure)) => ctx.fail(failure),
            Ok(Ok(record)) => {
                debug!(fields = record.len(), "extraction complete");
                ctx.extracted_data = Some(record);
                ctx
            }
        }
    }

    fn run_validation(&self, mut ctx: PipelineContext) -> PipelineContext {
        if ctx.failed() {
            return ctx;
        }

        let Some(kind) = ctx.document_type else {
            return ctx.fail(Failure::validation("no document type resolved"));
        };
        let Some(record) = ctx.extracted_data.clone() else {
            return ctx.fail(Failure::validation("no extracted data to validate"));
        };

        match validate::run(record, kind.schema(), self.geo.as_ref()) {
            Ok(validated) => {
                ctx.validated_data = Some(validated);
                ctx
            }
            Err(failure) => ctx.fail(failure),
        }
    }
}

/// OCR output arrives with hard line breaks mid-field; flatten them so the
/// detection patterns and prompts see one line of text.
fn flatten_whitespace(text: &str) -> String {
    text.replace("\\n", " ").replace('\n', " ")
}
