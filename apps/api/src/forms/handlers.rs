use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::forms::FormModel;
use crate::layout::{layout_form, LayoutPage};
use crate::render::{render_form, Rgb};
use crate::session::SessionUser;
use crate::state::AppState;

pub const DEFAULT_TITLE: &str = "Extracted Form Data";
pub const DEFAULT_FILENAME: &str = "form-data.pdf";

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    pub form: FormModel,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LayoutResponse {
    pub pages: Vec<LayoutPage>,
}

#[derive(Debug, Deserialize)]
pub struct PdfRequest {
    pub form: FormModel,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// `#RRGGBB`; overrides the configured title color.
    #[serde(default)]
    pub title_color: Option<String>,
}

fn resolve_title(title: Option<String>) -> String {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Keeps `[A-Za-z0-9._-]`, replaces everything else with `_`, and makes sure
/// the name ends in `.pdf`.
pub fn sanitize_filename(filename: Option<&str>) -> String {
    let cleaned: String = filename
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if cleaned.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{cleaned}.pdf")
    }
}

/// GET /api/v1/forms/default
pub async fn handle_default_form(_user: SessionUser) -> Json<FormModel> {
    Json(FormModel::default_identity())
}

/// POST /api/v1/forms/layout
pub async fn handle_layout(
    State(state): State<AppState>,
    _user: SessionUser,
    Json(req): Json<LayoutRequest>,
) -> Result<Json<LayoutResponse>, AppError> {
    let form = req.form.validated()?;
    let title = resolve_title(req.title);

    // Layout is CPU-bound; keep it off the async executor.
    let pages = tokio::task::spawn_blocking(move || {
        layout_form(&form, &title, &state.geometry, &state.layout, state.measurer.as_ref())
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in layout: {e}")))?;

    Ok(Json(LayoutResponse { pages }))
}

/// POST /api/v1/forms/pdf
pub async fn handle_render_pdf(
    State(state): State<AppState>,
    user: SessionUser,
    Json(req): Json<PdfRequest>,
) -> Result<(HeaderMap, Vec<u8>), AppError> {
    let form = req.form.validated()?;
    let title = resolve_title(req.title);
    let filename = sanitize_filename(req.filename.as_deref());

    let mut options = state.render_options.clone();
    if let Some(color) = req.title_color.as_deref() {
        options.title_color = Rgb::from_hex(color)?;
    }

    let field_count = form.len();
    let bytes = tokio::task::spawn_blocking(move || {
        render_form(
            &form,
            &title,
            &state.geometry,
            &state.layout,
            state.measurer.as_ref(),
            &options,
        )
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF render: {e}")))??;

    info!(user_id = %user.id, fields = field_count, bytes = bytes.len(), "PDF generated");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid Content-Disposition: {e}")))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((headers, bytes))
}
