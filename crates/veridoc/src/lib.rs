//! Document intelligence pipeline for identity and travel credentials.
//!
//! The [`pipeline`] module is the heart of the crate: a stage sequencer that
//! turns raw OCR text into a classified, schema-validated, geographically
//! enriched record. [`config`], [`telemetry`], and [`error`] carry the
//! service plumbing used by the API binary.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;
