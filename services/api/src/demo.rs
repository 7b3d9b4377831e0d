use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;
use serde_json::{json, Value};
use veridoc::error::AppError;
use veridoc::pipeline::{
    CapabilityError, DocumentKind, DocumentPipeline, DocumentTypeRegistry, ExtractionCapability,
    GeoDirectory, GeoRecord, TextRecognizer,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Emit compact JSON instead of pretty-printed reports
    #[arg(long)]
    pub(crate) compact: bool,
}

const PAN_SCAN_TEXT: &str = "INCOME TAX DEPARTMENT  GOVT. OF INDIA \
Permanent Account Number Card ABCDE1234F \
Name A B  Father's Name C D  Date of Birth 01/02/1990";

struct ScriptedRecognizer;

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn extract_text(&self, _image_reference: &str) -> Result<String, CapabilityError> {
        Ok(PAN_SCAN_TEXT.to_string())
    }
}

struct ScriptedExtractor(Value);

#[async_trait]
impl ExtractionCapability for ScriptedExtractor {
    async fn extract(&self, _text: &str) -> Result<Value, CapabilityError> {
        Ok(self.0.clone())
    }
}

struct ScriptedDirectory;

impl GeoDirectory for ScriptedDirectory {
    fn lookup(&self, postal_code: u32) -> Option<GeoRecord> {
        (postal_code == 110001).then(|| GeoRecord {
            postal_code,
            circle: "Delhi".to_string(),
            region: "Delhi City".to_string(),
            division: "New Delhi Central".to_string(),
            state: "DELHI".to_string(),
            district: "Central Delhi".to_string(),
        })
    }
}

/// Offline end-to-end demo: a scripted OCR result and extraction payload run
/// through the real orchestrator, once in auto-detect mode and once with an
/// unknown caller-supplied type to show the failure contract.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let extractor: Arc<dyn ExtractionCapability> = Arc::new(ScriptedExtractor(json!({
        "permanent_account_number": "ABCDE1234F",
        "name": "A B",
        "fathers_name": "C D",
        "date_of_birth": "01/02/1990",
        "pin_code": "110001"
    })));
    let registry = DocumentTypeRegistry::standard_with(|kind| {
        (kind == DocumentKind::Pan).then(|| extractor.clone())
    })
    .expect("standard registry patterns are valid");

    let pipeline = DocumentPipeline::new(
        Arc::new(registry),
        Arc::new(ScriptedRecognizer),
        Arc::new(ScriptedDirectory),
    );

    println!("== auto-detect run over a scripted PAN scan ==");
    let ctx = pipeline.process(vec!["demo/pan-front.png".to_string()]).await;
    print_report(&ctx.report(), args.compact);

    println!("\n== known-type run with an unregistered type ==");
    let ctx = pipeline
        .process_known(vec!["demo/pan-front.png".to_string()], "ration_card")
        .await;
    print_report(&ctx.report(), args.compact);

    Ok(())
}

fn print_report(report: &veridoc::pipeline::DocumentReport, compact: bool) {
    let rendered = if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    };
    println!("{}", rendered.expect("report serializes"));
}
