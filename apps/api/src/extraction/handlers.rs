use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::documents::DocumentData;
use crate::errors::AppError;
use crate::forms::{DefaultFields, FieldKind, FormModel, SchemaField};
use crate::session::SessionUser;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const UPLOAD_FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub document_data_uri: String,
    /// Form to fill; the default identity form when absent.
    #[serde(default)]
    pub form: Option<FormModel>,
}

#[derive(Debug, Serialize)]
pub struct DefaultFillResponse {
    pub extracted: DefaultFields,
    pub form: FormModel,
    pub updated: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaRequest {
    pub form_data_uri: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub fields: Vec<SchemaField>,
    pub form: FormModel,
}

#[derive(Debug, Deserialize)]
pub struct MapRequest {
    pub document_data_uri: String,
    pub form: FormModel,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub mapped: BTreeMap<String, String>,
    pub form: FormModel,
    pub updated: Vec<String>,
}

fn fill_default_form(form: Option<FormModel>, extracted: DefaultFields) -> Result<DefaultFillResponse, AppError> {
    let mut form = match form {
        Some(form) => form.validated()?,
        None => FormModel::default_identity(),
    };
    let outcome = form.apply_default_fields(&extracted);
    Ok(DefaultFillResponse {
        extracted,
        form,
        updated: outcome.updated,
    })
}

/// POST /api/v1/extract/document
pub async fn handle_extract_document(
    State(state): State<AppState>,
    user: SessionUser,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<DefaultFillResponse>, AppError> {
    let document = DocumentData::parse(&req.document_data_uri)?;
    info!(user_id = %user.id, media_type = document.media_type(), "Extracting default fields");

    let extracted = state.gateway.extract_default_fields(&document).await?;
    Ok(Json(fill_default_form(req.form, extracted)?))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub media_type: String,
    pub data_uri: String,
}

/// Reads the `file` part of a multipart upload. A missing or generic content
/// type is taken as PDF when the bytes carry the PDF magic.
async fn read_upload(multipart: &mut Multipart) -> Result<(DocumentData, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FILE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        let media_type = match content_type.as_deref() {
            None | Some("application/octet-stream") if bytes.starts_with(b"%PDF") => "application/pdf",
            other => other.unwrap_or_default(),
        };
        let document = DocumentData::from_bytes(media_type, &bytes)?;
        return Ok((document, bytes));
    }
    Err(AppError::Validation(format!("Missing '{UPLOAD_FILE_FIELD}' field")))
}

/// POST /api/v1/documents
///
/// Turns an uploaded file into the data URI the JSON extraction routes take.
pub async fn handle_upload_document(
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (document, bytes) = read_upload(&mut multipart).await?;
    info!(user_id = %user.id, media_type = document.media_type(), bytes = bytes.len(), "Document uploaded");
    Ok(Json(UploadResponse {
        media_type: document.media_type().to_string(),
        data_uri: document.to_data_uri(),
    }))
}

/// POST /api/v1/extract/prefill
///
/// Text-based path for PDFs with a text layer: text is pulled out locally and
/// only the text goes to the gateway. A PDF without a text layer is sent as a
/// document instead.
pub async fn handle_prefill(
    State(state): State<AppState>,
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<Json<DefaultFillResponse>, AppError> {
    let (document, bytes) = read_upload(&mut multipart).await?;
    if !document.is_pdf() || !bytes.starts_with(b"%PDF") {
        return Err(AppError::Validation("Uploaded file is not a PDF".to_string()));
    }
    info!(user_id = %user.id, bytes = bytes.len(), "Prefilling from PDF text");

    // pdf-extract is synchronous and CPU-bound.
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF text extraction: {e}")))?
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read text from the PDF: {e}")))?;

    let extracted = if text.trim().is_empty() {
        info!(user_id = %user.id, "PDF has no text layer, extracting from the document");
        state.gateway.extract_default_fields(&document).await?
    } else {
        state.gateway.prefill_from_text(&text).await?
    };
    Ok(Json(fill_default_form(None, extracted)?))
}

/// POST /api/v1/extract/schema
pub async fn handle_extract_schema(
    State(state): State<AppState>,
    user: SessionUser,
    Json(req): Json<SchemaRequest>,
) -> Result<Json<SchemaResponse>, AppError> {
    let form_document = DocumentData::parse(&req.form_data_uri)?;
    info!(user_id = %user.id, media_type = form_document.media_type(), "Extracting form schema");

    let fields = state.gateway.extract_schema(&form_document).await?;
    let form = FormModel::from_schema(&fields);
    Ok(Json(SchemaResponse { fields, form }))
}

/// POST /api/v1/extract/map
pub async fn handle_map_document(
    State(state): State<AppState>,
    user: SessionUser,
    Json(req): Json<MapRequest>,
) -> Result<Json<MapResponse>, AppError> {
    let document = DocumentData::parse(&req.document_data_uri)?;
    let mut form = req.form.validated()?;

    // Photos are never filled from a document.
    let field_names: Vec<String> = form
        .fields()
        .iter()
        .filter(|d| d.kind != FieldKind::Photo)
        .map(|d| d.name.clone())
        .collect();
    info!(user_id = %user.id, fields = field_names.len(), "Mapping document to form");

    let mapped = state
        .gateway
        .map_document_to_schema(&document, &field_names)
        .await?;
    let outcome = form.merge_extracted(&mapped);

    Ok(Json(MapResponse {
        mapped,
        form,
        updated: outcome.updated,
    }))
}
