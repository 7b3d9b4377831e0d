use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use veridoc::config::AppConfig;
use veridoc::error::AppError;
use veridoc::pipeline::{
    CsvGeoDirectory, DocumentPipeline, DocumentTypeRegistry, ExtractionCapability, GeoDirectory,
    HttpTextRecognizer, OllamaClassifier, OllamaClient, OllamaExtractor,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the pipeline against the configured collaborators: the OCR sidecar,
/// the Ollama models, and the postal directory when a CSV is configured.
pub(crate) fn build_pipeline(config: &AppConfig) -> Result<Arc<DocumentPipeline>, AppError> {
    let settings = &config.pipeline;

    let mut client = OllamaClient::new(&settings.ollama_endpoint, settings.ollama_model.clone());
    if let Some(fallback) = &settings.ollama_fallback_model {
        client = client.with_fallback_model(fallback.clone());
    }
    let client = Arc::new(client);

    let registry = DocumentTypeRegistry::standard_with(|kind| {
        Some(Arc::new(OllamaExtractor::new(client.clone(), kind)) as Arc<dyn ExtractionCapability>)
    })
    .expect("standard registry patterns are valid");

    let geo: Arc<dyn GeoDirectory> = match &settings.geo_csv_path {
        Some(path) => Arc::new(CsvGeoDirectory::from_path(path)?),
        None => Arc::new(CsvGeoDirectory::default()),
    };

    let pipeline = DocumentPipeline::new(
        Arc::new(registry),
        Arc::new(HttpTextRecognizer::new(settings.ocr_endpoint.clone())),
        geo,
    )
    .with_classifier(Arc::new(OllamaClassifier::new(client)))
    .with_mode(settings.classification)
    .with_timeouts(settings.stage_timeouts);

    Ok(Arc::new(pipeline))
}
