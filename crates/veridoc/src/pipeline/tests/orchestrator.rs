use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::common::{
    EmptyDirectory, FailingRecognizer, FixedDirectory, ScriptedClassifier, ScriptedExtractor,
    SlowExtractor, StaticRecognizer,
};
use crate::pipeline::capabilities::ExtractionCapability;
use crate::pipeline::registry::{DocumentTypeRegistry, TypeDescriptor};
use crate::pipeline::schema::{FieldKind, FieldSpec, TypeSchema};
use crate::pipeline::{
    ClassificationMode, DocumentKind, DocumentPipeline, FailureStage, StageTimeouts,
};

const PAN_TEXT: &str = "INCOME TAX DEPARTMENT GOVT. OF INDIA PERMANENT ACCOUNT NUMBER ABCDE1234F";

fn registry_with_pan_extractor(
    payload: serde_json::Value,
) -> (Arc<DocumentTypeRegistry>, Arc<AtomicUsize>) {
    let extractor = ScriptedExtractor::new(payload);
    let calls = extractor.calls.clone();
    let extractor: Arc<dyn ExtractionCapability> = Arc::new(extractor);
    let registry = DocumentTypeRegistry::standard_with(|kind| {
        (kind == DocumentKind::Pan).then(|| extractor.clone())
    })
    .expect("standard registry");
    (Arc::new(registry), calls)
}

#[tokio::test]
async fn pan_happy_path_validates_and_enriches() {
    let payload = json!({
        "permanent_account_number": "ABCDE1234F",
        "name": "A B",
        "fathers_name": "C D",
        "date_of_birth": "01/02/1990",
        "pin_code": "799004"
    });
    let (registry, calls) = registry_with_pan_extractor(payload);
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new(PAN_TEXT)),
        Arc::new(FixedDirectory),
    );

    let ctx = pipeline.process(vec!["pan-front.png".to_string()]).await;

    assert!(ctx.failure.is_none(), "failure: {:?}", ctx.failure);
    assert_eq!(ctx.document_type, Some(DocumentKind::Pan));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let validated = ctx.validated_data.expect("validated record");
    assert_eq!(validated.get("date_of_birth"), Some(&json!("1990-02-01")));
    assert_eq!(validated.get("state"), Some(&json!("TRIPURA")));
    assert_eq!(validated.get("city"), Some(&json!("West Tripura")));
}

static SLIM_PAN: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::required("date_of_birth", FieldKind::Date),
        FieldSpec::nullable("fathers_name", FieldKind::Text),
        FieldSpec::nullable("permanent_account_number", FieldKind::Text),
    ],
};

#[tokio::test]
async fn minimal_pan_record_resolves_day_first_and_drops_nullable_fields() {
    let extractor = ScriptedExtractor::new(json!({
        "name": "A B",
        "date_of_birth": "01/02/1990"
    }));
    let registry = DocumentTypeRegistry::builder()
        .register(
            TypeDescriptor::new(DocumentKind::Pan)
                .with_patterns([r"PERMANENT\s*ACCOUNT\s*NUMBER"])
                .expect("valid pattern")
                .with_schema(&SLIM_PAN)
                .with_extractor(Arc::new(extractor)),
        )
        .build()
        .expect("registry");
    let pipeline = DocumentPipeline::new(
        Arc::new(registry),
        Arc::new(StaticRecognizer::new("PERMANENT ACCOUNT NUMBER")),
        Arc::new(EmptyDirectory),
    );

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let validated = ctx.validated_data.expect("validated record");
    assert_eq!(validated.get("name"), Some(&json!("A B")));
    assert_eq!(validated.get("date_of_birth"), Some(&json!("1990-02-01")));
    assert!(!validated.contains_key("fathers_name"));
    assert!(!validated.contains_key("permanent_account_number"));
}

#[tokio::test]
async fn unknown_known_type_fails_before_extraction() {
    let (registry, calls) = registry_with_pan_extractor(json!({}));
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new(PAN_TEXT)),
        Arc::new(EmptyDirectory),
    );

    let ctx = pipeline
        .process_known(vec!["scan.png".to_string()], "ration_card")
        .await;

    let failure = ctx.failure.expect("classification failure");
    assert_eq!(failure.stage, FailureStage::Classification);
    assert!(failure.reason.contains("ration_card"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(ctx.extracted_data.is_none());
    assert!(ctx.validated_data.is_none());
}

#[tokio::test]
async fn known_type_skips_pattern_matching() {
    // The text matches the pan patterns, but the caller says otherwise and
    // wins; driving_license has no extractor here, which is its own failure.
    let (registry, calls) = registry_with_pan_extractor(json!({}));
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new(PAN_TEXT)),
        Arc::new(EmptyDirectory),
    );

    let ctx = pipeline
        .process_known(vec!["scan.png".to_string()], "driving_license")
        .await;

    assert_eq!(ctx.document_type, Some(DocumentKind::DrivingLicense));
    let failure = ctx.failure.expect("extraction failure");
    assert_eq!(failure.stage, FailureStage::Extraction);
    assert!(failure.reason.contains("no extraction capability"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ingestion_failure_short_circuits_every_later_stage() {
    let (registry, extractor_calls) = registry_with_pan_extractor(json!({}));
    let classifier = ScriptedClassifier::new("pan");
    let classifier_calls = classifier.calls.clone();
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(FailingRecognizer),
        Arc::new(EmptyDirectory),
    )
    .with_classifier(Arc::new(classifier));

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let failure = ctx.failure.expect("ingestion failure");
    assert_eq!(failure.stage, FailureStage::Ingestion);
    assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);
    assert_eq!(extractor_calls.load(Ordering::SeqCst), 0);
    assert!(ctx.extracted_data.is_none());
    assert!(ctx.validated_data.is_none());
}

#[tokio::test]
async fn empty_ocr_text_is_an_ingestion_failure() {
    let (registry, _) = registry_with_pan_extractor(json!({}));
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new("  ")),
        Arc::new(EmptyDirectory),
    );

    let ctx = pipeline.process(vec!["blank.png".to_string()]).await;

    let failure = ctx.failure.expect("ingestion failure");
    assert_eq!(failure.stage, FailureStage::Ingestion);
    assert_eq!(failure.reason, "OCR detected no text.");
}

#[tokio::test]
async fn ingestion_concatenates_every_image() {
    let recognizer = StaticRecognizer::new(PAN_TEXT);
    let calls = recognizer.calls.clone();
    let (registry, _) = registry_with_pan_extractor(json!({
        "permanent_account_number": "ABCDE1234F",
        "name": "A B",
        "fathers_name": "C D",
        "date_of_birth": "1990-02-01"
    }));
    let pipeline = DocumentPipeline::new(registry, Arc::new(recognizer), Arc::new(EmptyDirectory));

    let ctx = pipeline
        .process(vec!["front.png".to_string(), "back.png".to_string()])
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(ctx.failure.is_none());
    assert!(ctx.extracted_text.len() > PAN_TEXT.len());
}

#[tokio::test]
async fn model_fallback_resolves_when_no_pattern_matches() {
    let (registry, calls) = registry_with_pan_extractor(json!({
        "permanent_account_number": "ABCDE1234F",
        "name": "A B",
        "fathers_name": "C D",
        "date_of_birth": "1990-02-01"
    }));
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new("garbled scan with no keywords")),
        Arc::new(EmptyDirectory),
    )
    .with_classifier(Arc::new(ScriptedClassifier::new("PAN")));

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    assert!(ctx.failure.is_none(), "failure: {:?}", ctx.failure);
    assert_eq!(ctx.document_type, Some(DocumentKind::Pan));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn classifier_token_outside_registry_is_a_classification_failure() {
    let (registry, calls) = registry_with_pan_extractor(json!({}));
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new("garbled scan with no keywords")),
        Arc::new(EmptyDirectory),
    )
    .with_classifier(Arc::new(ScriptedClassifier::new("unknown_xyz")));

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let failure = ctx.failure.expect("classification failure");
    assert_eq!(failure.stage, FailureStage::Classification);
    assert_eq!(failure.reason, "could not detect document type");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pattern_only_mode_fails_without_a_match() {
    let (registry, _) = registry_with_pan_extractor(json!({}));
    let classifier = ScriptedClassifier::new("pan");
    let classifier_calls = classifier.calls.clone();
    let pipeline = DocumentPipeline::new(
        registry,
        Arc::new(StaticRecognizer::new("garbled scan with no keywords")),
        Arc::new(EmptyDirectory),
    )
    .with_classifier(Arc::new(classifier))
    .with_mode(ClassificationMode::Pattern);

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let failure = ctx.failure.expect("classification failure");
    assert_eq!(failure.stage, FailureStage::Classification);
    assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_extraction_times_out_into_an_extraction_failure() {
    let extractor: Arc<dyn ExtractionCapability> = Arc::new(SlowExtractor {
        delay: Duration::from_millis(200),
    });
    let registry = DocumentTypeRegistry::standard_with(|kind| {
        (kind == DocumentKind::Pan).then(|| extractor.clone())
    })
    .expect("standard registry");
    let pipeline = DocumentPipeline::new(
        Arc::new(registry),
        Arc::new(StaticRecognizer::new(PAN_TEXT)),
        Arc::new(EmptyDirectory),
    )
    .with_timeouts(StageTimeouts::from_budget(Duration::from_millis(20)));

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let failure = ctx.failure.expect("extraction failure");
    assert_eq!(failure.stage, FailureStage::Extraction);
    assert!(failure.reason.contains("timed out"));
    assert!(ctx.validated_data.is_none());
}

#[tokio::test]
async fn validation_failure_never_populates_validated_data() {
    let extractor: Arc<dyn ExtractionCapability> = Arc::new(ScriptedExtractor::new(json!({
        "passport_number": "Z1234567"
    })));
    let registry = DocumentTypeRegistry::standard_with(|kind| {
        (kind == DocumentKind::Passport).then(|| extractor.clone())
    })
    .expect("standard registry");
    let pipeline = DocumentPipeline::new(
        Arc::new(registry),
        Arc::new(StaticRecognizer::new("REPUBLIC OF INDIA PASSPORT")),
        Arc::new(EmptyDirectory),
    );

    let ctx = pipeline.process(vec!["scan.png".to_string()]).await;

    let failure = ctx.failure.expect("validation failure");
    assert_eq!(failure.stage, FailureStage::Validation);
    assert!(ctx.validated_data.is_none());
    // The raw extraction output is still visible for diagnostics.
    assert!(ctx.extracted_data.is_some());
}
