pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::extraction::handlers as extraction;
use crate::forms::handlers as forms;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth API
        .route("/api/v1/auth/register", post(session::handle_register))
        .route("/api/v1/auth/login", post(session::handle_login))
        .route("/api/v1/auth/logout", post(session::handle_logout))
        .route("/api/v1/auth/session", get(session::handle_session))
        // Extraction API
        .route("/api/v1/documents", post(extraction::handle_upload_document))
        .route(
            "/api/v1/extract/document",
            post(extraction::handle_extract_document),
        )
        .route("/api/v1/extract/prefill", post(extraction::handle_prefill))
        .route(
            "/api/v1/extract/schema",
            post(extraction::handle_extract_schema),
        )
        .route("/api/v1/extract/map", post(extraction::handle_map_document))
        // Forms API
        .route("/api/v1/forms/default", get(forms::handle_default_form))
        .route("/api/v1/forms/layout", post(forms::handle_layout))
        .route("/api/v1/forms/pdf", post(forms::handle_render_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::documents::DocumentData;
    use crate::extraction::{ExtractionError, ExtractionGateway};
    use crate::forms::{DefaultFields, FieldKind, SchemaField};
    use crate::layout::{HelveticaMeasurer, LayoutConfig, PageGeometry};
    use crate::render::{RenderOptions, DEFAULT_TITLE_COLOR};
    use crate::session::{UserRecord, UserStore};

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    struct StubGateway;

    #[async_trait]
    impl ExtractionGateway for StubGateway {
        async fn extract_default_fields(
            &self,
            _document: &DocumentData,
        ) -> Result<DefaultFields, ExtractionError> {
            Ok(DefaultFields {
                name: Some("Asha Rao".into()),
                dob: Some("1990-03-12".into()),
                ..Default::default()
            })
        }

        async fn prefill_from_text(&self, text: &str) -> Result<DefaultFields, ExtractionError> {
            Ok(DefaultFields {
                name: Some(text.trim().to_string()),
                ..Default::default()
            })
        }

        async fn extract_schema(
            &self,
            _form_document: &DocumentData,
        ) -> Result<Vec<SchemaField>, ExtractionError> {
            Ok(vec![
                SchemaField {
                    name: "Full Name".into(),
                    kind: FieldKind::Text,
                },
                SchemaField {
                    name: "Subscribe".into(),
                    kind: FieldKind::Checkbox,
                },
            ])
        }

        async fn map_document_to_schema(
            &self,
            _document: &DocumentData,
            field_names: &[String],
        ) -> Result<BTreeMap<String, String>, ExtractionError> {
            Ok(field_names
                .iter()
                .map(|name| {
                    let value = if name == "Full Name" { "Jane Doe" } else { "" };
                    (name.clone(), value.to_string())
                })
                .collect())
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl ExtractionGateway for FailingGateway {
        async fn extract_default_fields(
            &self,
            _document: &DocumentData,
        ) -> Result<DefaultFields, ExtractionError> {
            Err(ExtractionError::Failed("Failed to extract data from the document. Please try again.".into()))
        }

        async fn prefill_from_text(&self, _text: &str) -> Result<DefaultFields, ExtractionError> {
            Err(ExtractionError::Failed("down".into()))
        }

        async fn extract_schema(
            &self,
            _form_document: &DocumentData,
        ) -> Result<Vec<SchemaField>, ExtractionError> {
            Err(ExtractionError::Failed("down".into()))
        }

        async fn map_document_to_schema(
            &self,
            _document: &DocumentData,
            _field_names: &[String],
        ) -> Result<BTreeMap<String, String>, ExtractionError> {
            Err(ExtractionError::Failed("down".into()))
        }
    }

    struct TestApp {
        _dir: tempfile::TempDir,
        router: Router,
        users: Arc<UserStore>,
    }

    impl TestApp {
        async fn new(gateway: Arc<dyn ExtractionGateway>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let users_db_path = dir.path().join("users.json");
            let users = Arc::new(UserStore::open(&users_db_path).await.unwrap());
            let config = Config {
                anthropic_api_key: "test-key".into(),
                anthropic_api_url: "http://127.0.0.1:9/v1/messages".into(),
                port: 0,
                rust_log: "info".into(),
                users_db_path,
                title_color: DEFAULT_TITLE_COLOR.into(),
                max_upload_bytes: 1024 * 1024,
            };
            let state = AppState {
                config,
                gateway,
                users: users.clone(),
                geometry: PageGeometry::a4(),
                layout: LayoutConfig::default(),
                measurer: Arc::new(HelveticaMeasurer::new(12.0)),
                render_options: RenderOptions::default(),
            };
            Self {
                _dir: dir,
                router: build_router(state),
                users,
            }
        }

        /// Registers a user directly in the store and returns its session cookie.
        async fn signed_in(&self) -> String {
            let record = UserRecord::new("Asha Rao", "asha@example.com", "secret1");
            let id = record.id.clone();
            self.users.add(record).await.unwrap();
            format!("session_user_id={id}")
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn post_json(&self, uri: &str, cookie: Option<&str>, body: Value) -> Response {
            let mut builder = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap())
                .await
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let response = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "formfill-api");
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let response = app
            .send(Request::get("/api/v1/forms/default").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .post_json(
                "/api/v1/extract/document",
                Some("session_user_id=nobody"),
                json!({ "document_data_uri": PNG_URI }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_login_session_logout() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let credentials = json!({ "name": "Asha Rao", "email": "asha@example.com", "password": "secret1" });

        let response = app.post_json("/api/v1/auth/register", None, credentials.clone()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let user = json_body(response).await;
        assert_eq!(user["email"], "asha@example.com");
        assert!(user.get("password_hash").is_none());

        let response = app.post_json("/api/v1/auth/register", None, credentials).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .post_json(
                "/api/v1/auth/login",
                None,
                json!({ "email": "asha@example.com", "password": "secret1" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("Max-Age=604800")));
        let id_cookie = cookies[0].split(';').next().unwrap().to_string();

        let response = app
            .send(
                Request::get("/api/v1/auth/session")
                    .header(header::COOKIE, &id_cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["name"], "Asha Rao");

        let response = app
            .send(Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .all(|v| v.to_str().unwrap().contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_register_validation_and_bad_login() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let response = app
            .post_json(
                "/api/v1/auth/register",
                None,
                json!({ "name": "A", "email": "not-an-email", "password": "123" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_body(response).await["error"]["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.contains("Name must be at least 2 characters"));
        assert!(message.contains("Invalid email address"));

        app.signed_in().await;
        let response = app
            .post_json(
                "/api/v1/auth/login",
                None,
                json!({ "email": "asha@example.com", "password": "wrong-password" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extract_document_fills_default_form() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .post_json(
                "/api/v1/extract/document",
                Some(&cookie),
                json!({ "document_data_uri": PNG_URI }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["extracted"]["name"], "Asha Rao");
        assert_eq!(body["updated"], json!(["name", "dob"]));
        assert_eq!(body["form"]["values"]["name"]["value"], "Asha Rao");
    }

    #[tokio::test]
    async fn test_extract_document_rejects_bad_data_uri() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .post_json(
                "/api/v1/extract/document",
                Some(&cookie),
                json!({ "document_data_uri": "data:text/plain;base64,aGk=" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_bad_gateway() {
        let app = TestApp::new(Arc::new(FailingGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .post_json(
                "/api/v1/extract/document",
                Some(&cookie),
                json!({ "document_data_uri": PNG_URI }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Please try again"));
    }

    #[tokio::test]
    async fn test_schema_then_map_flow() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;

        let response = app
            .post_json(
                "/api/v1/extract/schema",
                Some(&cookie),
                json!({ "form_data_uri": PNG_URI }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
        let form = body["form"].clone();

        let response = app
            .post_json(
                "/api/v1/extract/map",
                Some(&cookie),
                json!({ "document_data_uri": PNG_URI, "form": form }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["mapped"]["Full Name"], "Jane Doe");
        assert_eq!(body["mapped"]["Subscribe"], "");
        assert_eq!(body["updated"], json!(["Full Name"]));
        assert_eq!(body["form"]["values"]["Full Name"]["value"], "Jane Doe");
        assert_eq!(body["form"]["values"]["Subscribe"]["value"], false);
    }

    #[tokio::test]
    async fn test_map_rejects_invalid_form() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let form = json!({
            "fields": [
                { "name": "A", "kind": "text" },
                { "name": "A", "kind": "date" }
            ]
        });
        let response = app
            .post_json(
                "/api/v1/extract/map",
                Some(&cookie),
                json!({ "document_data_uri": PNG_URI, "form": form }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn multipart_upload(uri: &str, cookie: &str, content_type: Option<&str>, payload: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\n"
        )
        .into_bytes();
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_prefill_rejects_non_pdf_upload() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .send(multipart_upload("/api/v1/extract/prefill", &cookie, Some("text/plain"), b"hello"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(multipart_upload("/api/v1/extract/prefill", &cookie, Some("image/png"), b"\x89PNG"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_returns_data_uri() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;

        let response = app
            .send(multipart_upload("/api/v1/documents", &cookie, Some("image/jpg"), b"abc"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["media_type"], "image/jpeg");
        assert_eq!(body["data_uri"], "data:image/jpeg;base64,YWJj");

        // No content type, PDF magic.
        let response = app
            .send(multipart_upload("/api/v1/documents", &cookie, None, b"%PDF-1.4"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["data_uri"],
            "data:application/pdf;base64,JVBERi0xLjQ="
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type_and_missing_session() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .send(multipart_upload("/api/v1/documents", &cookie, Some("text/plain"), b"hello"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(multipart_upload("/api/v1/documents", "session_user_id=nobody", Some("image/png"), b"x"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_default_form_and_layout() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;

        let response = app
            .send(
                Request::get("/api/v1/forms/default")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let form = json_body(response).await;
        assert_eq!(form["fields"].as_array().unwrap().len(), 7);

        let response = app
            .post_json("/api/v1/forms/layout", Some(&cookie), json!({ "form": form }))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let pages = body["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0]["placements"][0]["text"], "Extracted Form Data");
    }

    #[tokio::test]
    async fn test_render_pdf_attachment() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let form = json!({
            "fields": [{ "name": "Full Name", "kind": "text" }],
            "values": { "Full Name": { "type": "text", "value": "Jane Doe" } }
        });
        let response = app
            .post_json(
                "/api/v1/forms/pdf",
                Some(&cookie),
                json!({ "form": form, "filename": "visa form", "title_color": "#336699" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"visa_form.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_render_pdf_rejects_bad_title_color() {
        let app = TestApp::new(Arc::new(StubGateway)).await;
        let cookie = app.signed_in().await;
        let response = app
            .post_json(
                "/api/v1/forms/pdf",
                Some(&cookie),
                json!({ "form": { "fields": [] }, "title_color": "blue" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
