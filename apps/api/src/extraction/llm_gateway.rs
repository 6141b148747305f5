//! Claude-backed `ExtractionGateway`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::documents::DocumentData;
use crate::extraction::prompts::{
    EXTRACT_DEFAULT_PROMPT, EXTRACT_DEFAULT_SYSTEM, EXTRACT_SCHEMA_PROMPT, EXTRACT_SCHEMA_SYSTEM,
    MAP_DOCUMENT_PROMPT, MAP_DOCUMENT_SYSTEM, PREFILL_TEXT_PROMPT,
};
use crate::extraction::{
    complete_mapping, sanitize_default_fields, sanitize_schema, ExtractionError,
    ExtractionGateway, MappedEntry, RawSchemaField,
};
use crate::forms::{DefaultFields, SchemaField};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::LlmClient;

/// Upper bound on document text sent with a prefill prompt.
const MAX_DOCUMENT_TEXT_CHARS: usize = 20_000;

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    fields: Vec<RawSchemaField>,
}

#[derive(Debug, Deserialize)]
struct MappingResponse {
    #[serde(default)]
    entries: Vec<MappedEntry>,
}

#[derive(Clone)]
pub struct LlmExtractionGateway {
    llm: LlmClient,
}

impl LlmExtractionGateway {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ExtractionGateway for LlmExtractionGateway {
    async fn extract_default_fields(
        &self,
        document: &DocumentData,
    ) -> Result<DefaultFields, ExtractionError> {
        let prompt = build_default_prompt();
        let fields: DefaultFields = self
            .llm
            .call_json(&prompt, EXTRACT_DEFAULT_SYSTEM, Some(document))
            .await?;
        Ok(sanitize_default_fields(fields))
    }

    async fn prefill_from_text(&self, text: &str) -> Result<DefaultFields, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::Failed(
                "No readable text was found in the document.".to_string(),
            ));
        }
        let prompt = build_prefill_prompt(text);
        let fields: DefaultFields = self.llm.call_json(&prompt, JSON_ONLY_SYSTEM, None).await?;
        Ok(sanitize_default_fields(fields))
    }

    async fn extract_schema(
        &self,
        form_document: &DocumentData,
    ) -> Result<Vec<SchemaField>, ExtractionError> {
        let response: SchemaResponse = self
            .llm
            .call_json(EXTRACT_SCHEMA_PROMPT, EXTRACT_SCHEMA_SYSTEM, Some(form_document))
            .await?;
        let schema = sanitize_schema(response.fields);
        if schema.is_empty() {
            return Err(ExtractionError::Failed(
                "No fillable fields were found in the form.".to_string(),
            ));
        }
        info!(fields = schema.len(), "Form schema extracted");
        Ok(schema)
    }

    async fn map_document_to_schema(
        &self,
        document: &DocumentData,
        field_names: &[String],
    ) -> Result<BTreeMap<String, String>, ExtractionError> {
        if field_names.is_empty() {
            return Ok(BTreeMap::new());
        }
        let prompt = build_map_prompt(field_names);
        let response: MappingResponse = self
            .llm
            .call_json(&prompt, MAP_DOCUMENT_SYSTEM, Some(document))
            .await?;
        Ok(complete_mapping(response.entries, field_names))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt builders
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn build_default_prompt() -> String {
    EXTRACT_DEFAULT_PROMPT.replace("{no_invention}", NO_INVENTION_INSTRUCTION)
}

pub(crate) fn build_prefill_prompt(text: &str) -> String {
    let text: String = text.trim().chars().take(MAX_DOCUMENT_TEXT_CHARS).collect();
    PREFILL_TEXT_PROMPT
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
        .replace("{document_text}", &text)
}

pub(crate) fn build_map_prompt(field_names: &[String]) -> String {
    let field_list = field_names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");
    MAP_DOCUMENT_PROMPT
        .replace("{field_list}", &field_list)
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::forms::FieldKind;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// Serves `reply` as the text of every Messages API response and records
    /// each request body.
    async fn gateway_replying(reply: &'static str) -> (LlmExtractionGateway, Arc<Mutex<Vec<Value>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let app = Router::new().route(
            "/v1/messages",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Json(json!({
                        "content": [{"type": "text", "text": reply}],
                        "stop_reason": "end_turn",
                        "usage": {"input_tokens": 12, "output_tokens": 34}
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = LlmClient::new("test-key".into(), format!("http://{addr}/v1/messages")).unwrap();
        (LlmExtractionGateway::new(client), requests)
    }

    #[tokio::test]
    async fn test_default_fields_from_fenced_reply_are_sanitized() {
        let (gateway, requests) = gateway_replying(
            "```json\n{\"name\": \" Asha Rao \", \"dob\": \"12/03/1990\", \"gender\": \"Female\", \"pan\": \"\"}\n```",
        )
        .await;
        let document = DocumentData::parse(PNG_URI).unwrap();

        let fields = gateway.extract_default_fields(&document).await.unwrap();
        assert_eq!(fields.name.as_deref(), Some("Asha Rao"));
        assert_eq!(fields.gender.as_deref(), Some("Female"));
        assert_eq!(fields.dob, None);
        assert_eq!(fields.national_id_2, None);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let content = &requests[0]["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[1]["type"], "text");
    }

    #[tokio::test]
    async fn test_schema_reply_with_prose_is_deduplicated() {
        let (gateway, _) = gateway_replying(
            "Here are the fields:\n{\"fields\": [{\"name\": \"Full Name\", \"type\": \"text\"}, \
             {\"name\": \"Full Name\", \"type\": \"text\"}, {\"name\": \" \", \"type\": \"text\"}, \
             {\"name\": \"Agree\", \"type\": \"boolean\"}]}",
        )
        .await;
        let form = DocumentData::parse(PNG_URI).unwrap();

        let schema = gateway.extract_schema(&form).await.unwrap();
        assert_eq!(
            schema,
            vec![
                SchemaField { name: "Full Name".into(), kind: FieldKind::Text },
                SchemaField { name: "Agree".into(), kind: FieldKind::Checkbox },
            ]
        );
    }

    #[tokio::test]
    async fn test_mapping_reply_is_completed_to_requested_names() {
        let (gateway, requests) = gateway_replying(
            r#"{"entries": [{"fieldName": "Full Name", "extractedValue": " Jane Doe "}, {"fieldName": "Unknown", "extractedValue": "x"}]}"#,
        )
        .await;
        let document = DocumentData::parse(PNG_URI).unwrap();
        let names = vec!["Full Name".to_string(), "Passport No".to_string()];

        let mapped = gateway.map_document_to_schema(&document, &names).await.unwrap();
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped["Full Name"], "Jane Doe");
        assert_eq!(mapped["Passport No"], "");

        let requests = requests.lock().unwrap();
        let prompt = requests[0]["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(prompt.contains("- Passport No"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_becomes_extraction_failure() {
        let (gateway, _) = gateway_replying("I could not read this document.").await;
        let err = gateway.prefill_from_text("Name: Asha").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to extract data from the document. Please try again."
        );
    }

    #[test]
    fn test_build_map_prompt_lists_every_field() {
        let prompt = build_map_prompt(&["Full Name".to_string(), "Passport No".to_string()]);
        assert!(prompt.contains("- Full Name\n- Passport No"));
        assert!(prompt.contains("Do not omit any field"));
        assert!(!prompt.contains("{field_list}"));
        assert!(!prompt.contains("{no_invention}"));
    }

    #[test]
    fn test_build_prefill_prompt_truncates_long_text() {
        let text = "a".repeat(MAX_DOCUMENT_TEXT_CHARS + 500);
        let prompt = build_prefill_prompt(&text);
        assert!(prompt.contains(&"a".repeat(MAX_DOCUMENT_TEXT_CHARS)));
        assert!(!prompt.contains(&"a".repeat(MAX_DOCUMENT_TEXT_CHARS + 1)));
    }

    #[test]
    fn test_build_default_prompt_names_all_keys() {
        let prompt = build_default_prompt();
        for key in ["name", "dob", "gender", "address", "aadhaar", "pan"] {
            assert!(prompt.contains(&format!("- {key}:")), "missing {key}");
        }
    }

    #[test]
    fn test_mapping_response_tolerates_missing_values() {
        let response: MappingResponse =
            serde_json::from_str(r#"{"entries": [{"fieldName": "X"}]}"#).unwrap();
        assert_eq!(response.entries[0].extracted_value, "");
    }
}
