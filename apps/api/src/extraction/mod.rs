//! Extraction Gateway — pluggable, trait-based document understanding.
//!
//! Default: `LlmExtractionGateway` (Claude via `LlmClient`).
//! Carried in `AppState` as `Arc<dyn ExtractionGateway>` so handlers and tests
//! never depend on the concrete backend.
//!
//! The contract helpers in this module (`sanitize_*`, `complete_mapping`) hold
//! every backend to the same output guarantees: optional default fields, a clean
//! ordered schema, and a mapping with exactly the requested keys.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::documents::DocumentData;
use crate::forms::{DefaultFields, FieldKind, SchemaField};
use crate::llm_client::LlmError;

pub mod handlers;
pub mod llm_gateway;
pub mod prompts;

pub use llm_gateway::LlmExtractionGateway;

/// The one failure condition callers see. The message is safe to show a user;
/// the remedy is always to retry, typically by re-uploading.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Failed(String),
}

impl From<LlmError> for ExtractionError {
    fn from(e: LlmError) -> Self {
        warn!("Extraction backend error: {e}");
        ExtractionError::Failed(
            "Failed to extract data from the document. Please try again.".to_string(),
        )
    }
}

/// The extraction gateway trait. Implement this to swap backends without touching
/// the handlers.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    /// Identity fields from an ID document. Absent fields are `None`, never an error.
    async fn extract_default_fields(
        &self,
        document: &DocumentData,
    ) -> Result<DefaultFields, ExtractionError>;

    /// Identity fields from text already pulled out of a document.
    async fn prefill_from_text(&self, text: &str) -> Result<DefaultFields, ExtractionError>;

    /// The ordered field list of a blank form.
    async fn extract_schema(
        &self,
        form_document: &DocumentData,
    ) -> Result<Vec<SchemaField>, ExtractionError>;

    /// Values for `field_names` found in `document`. Every requested name is a key
    /// of the result; `""` when nothing was found.
    async fn map_document_to_schema(
        &self,
        document: &DocumentData,
        field_names: &[String],
    ) -> Result<BTreeMap<String, String>, ExtractionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Contract helpers
// ────────────────────────────────────────────────────────────────────────────

/// Trims values, drops blanks, and drops a date of birth that is not `YYYY-MM-DD`.
pub fn sanitize_default_fields(fields: DefaultFields) -> DefaultFields {
    let mut fields = fields.normalized();
    if let Some(dob) = fields.dob.as_deref() {
        if NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
            warn!(dob, "Dropping date of birth that is not YYYY-MM-DD");
            fields.dob = None;
        }
    }
    fields
}

/// A schema field as the model reports it; unknown kinds fall back to text.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSchemaField {
    pub name: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: String,
}

pub fn parse_field_kind(raw: &str) -> FieldKind {
    match raw.trim().to_ascii_lowercase().as_str() {
        "date" | "datetime" | "dob" => FieldKind::Date,
        "checkbox" | "boolean" | "bool" | "tick" => FieldKind::Checkbox,
        "photo" | "image" | "picture" | "photograph" => FieldKind::Photo,
        _ => FieldKind::Text,
    }
}

/// Trims names, drops blank and repeated names, keeps first-seen order.
pub fn sanitize_schema(raw: Vec<RawSchemaField>) -> Vec<SchemaField> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|f| {
            let name = f.name.trim().to_string();
            if name.is_empty() || !seen.insert(name.clone()) {
                return None;
            }
            Some(SchemaField {
                name,
                kind: parse_field_kind(&f.kind),
            })
        })
        .collect()
}

/// One `{fieldName, extractedValue}` pair from the mapping response.
#[derive(Debug, Clone, Deserialize)]
pub struct MappedEntry {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "extractedValue", default)]
    pub extracted_value: String,
}

/// Builds the mapping result: exactly the requested names, `""` for anything the
/// backend did not find. Entries for names that were not requested are dropped;
/// when a name repeats, the first non-empty value wins.
pub fn complete_mapping(
    entries: Vec<MappedEntry>,
    field_names: &[String],
) -> BTreeMap<String, String> {
    let mut mapped: BTreeMap<String, String> = field_names
        .iter()
        .map(|name| (name.clone(), String::new()))
        .collect();

    for entry in entries {
        let value = entry.extracted_value.trim();
        if let Some(slot) = mapped.get_mut(entry.field_name.trim()) {
            if slot.is_empty() && !value.is_empty() {
                *slot = value.to_string();
            }
        }
    }

    mapped
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
