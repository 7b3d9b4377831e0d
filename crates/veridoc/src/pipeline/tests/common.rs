//! Counting test doubles for the pipeline's external collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::capabilities::{
    CapabilityError, ClassifierCapability, ExtractionCapability, TextRecognizer,
};
use crate::pipeline::classify::ClassifierCatalog;
use crate::pipeline::geo::{GeoDirectory, GeoRecord};

pub(super) struct StaticRecognizer {
    text: String,
    pub(super) calls: Arc<AtomicUsize>,
}

impl StaticRecognizer {
    pub(super) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TextRecognizer for StaticRecognizer {
    async fn extract_text(&self, _image_reference: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

pub(super) struct FailingRecognizer;

#[async_trait]
impl TextRecognizer for FailingRecognizer {
    async fn extract_text(&self, _image_reference: &str) -> Result<String, CapabilityError> {
        Err(CapabilityError::Transport("connection refused".to_string()))
    }
}

pub(super) struct ScriptedExtractor {
    payload: Value,
    pub(super) calls: Arc<AtomicUsize>,
}

impl ScriptedExtractor {
    pub(super) fn new(payload: Value) -> Self {
        Self {
            payload,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ExtractionCapability for ScriptedExtractor {
    async fn extract(&self, _text: &str) -> Result<Value, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

pub(super) struct SlowExtractor {
    pub(super) delay: std::time::Duration,
}

#[async_trait]
impl ExtractionCapability for SlowExtractor {
    async fn extract(&self, _text: &str) -> Result<Value, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(Value::Object(serde_json::Map::new()))
    }
}

pub(super) struct ScriptedClassifier {
    token: String,
    pub(super) calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    pub(super) fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ClassifierCapability for ScriptedClassifier {
    async fn classify(
        &self,
        _text: &str,
        _catalog: &ClassifierCatalog,
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}

pub(super) struct EmptyDirectory;

impl GeoDirectory for EmptyDirectory {
    fn lookup(&self, _postal_code: u32) -> Option<GeoRecord> {
        None
    }
}

pub(super) struct FixedDirectory;

impl GeoDirectory for FixedDirectory {
    fn lookup(&self, postal_code: u32) -> Option<GeoRecord> {
        (postal_code == 799004).then(|| GeoRecord {
            postal_code,
            circle: "Tripura".to_string(),
            region: "Agartala HQ".to_string(),
            division: "Agartala".to_string(),
            state: "TRIPURA".to_string(),
            district: "West Tripura".to_string(),
        })
    }
}
