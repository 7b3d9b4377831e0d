use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::DocumentPipeline;

/// Router builder exposing the document processing endpoints.
pub fn document_router(pipeline: Arc<DocumentPipeline>) -> Router {
    Router::new()
        .route("/api/v1/documents/process", post(process_handler))
        .route("/api/v1/documents/types", get(types_handler))
        .with_state(pipeline)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessDocumentRequest {
    pub(crate) image_references: Vec<String>,
    #[serde(default)]
    pub(crate) document_type: Option<String>,
}

pub(crate) async fn process_handler(
    State(pipeline): State<Arc<DocumentPipeline>>,
    Json(request): Json<ProcessDocumentRequest>,
) -> Response {
    if request.image_references.is_empty() {
        let payload = json!({ "error": "image_references must not be empty" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }

    let ctx = match &request.document_type {
        Some(token) => {
            pipeline
                .process_known(request.image_references, token)
                .await
        }
        None => pipeline.process(request.image_references).await,
    };

    let report = ctx.report();
    let status = if report.error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}

pub(crate) async fn types_handler(State(pipeline): State<Arc<DocumentPipeline>>) -> Response {
    let types: Vec<&'static str> = pipeline
        .registry()
        .kinds()
        .map(|kind| kind.as_str())
        .collect();
    (StatusCode::OK, Json(json!({ "document_types": types }))).into_response()
}
